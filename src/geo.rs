//! Nationality → country → ISO 3166 alpha-3 resolution.
//!
//! Nationalities are mapped through the configured demonym table; the
//! resulting country names are resolved against the keshvar ISO 3166-1
//! registry, which also carries a centroid for labels and markers.

use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::reshape::NullPolicy;
use crate::table::Table;
use keshvar::Country;

/// Case-insensitive lookup by English, translated or unofficial name, or by
/// alpha-2/alpha-3 code
///
/// # Arguments
/// * `name` - Country name or code as written in the demonym table
///
/// # Returns
/// The registry entry, or `None` when nothing matches
///
/// # Examples
/// ```
/// use visa_dashboard::geo::lookup_country;
///
/// assert_eq!(lookup_country("China").unwrap().alpha3().to_string(), "CHN");
/// assert_eq!(lookup_country("south korea").unwrap().alpha3().to_string(), "KOR");
/// assert!(lookup_country("Atlantis").is_none());
/// ```
pub fn lookup_country(name: &str) -> Option<Country> {
    let name = name.trim();
    keshvar::find_by_name(&name.to_lowercase())
        .or_else(|_| Country::try_from(name.to_uppercase().as_str()))
        .ok()
}

/// A nationality row resolved to a country
#[derive(Clone, Debug, PartialEq)]
pub struct GeoRow {
    pub nationality: String,
    pub country: String,
    pub iso_alpha: String,
    pub counts: f64,
    pub lat: f64,
    pub lon: f64,
}

/// Resolves `(nationality, count)` pairs to geo rows
///
/// Nationalities without a demonym entry are dropped.
///
/// # Arguments
/// * `rows` - `(nationality, count)` pairs in display order
/// * `config` - Supplies the demonym table
///
/// # Returns
/// One row per mapped nationality, in input order, with its alpha-3 code
/// and centroid
///
/// # Errors
/// * `CountryLookup` if a demonym maps to a country name with no ISO entry
pub fn resolve<'a, I>(rows: I, config: &DashboardConfig) -> Result<Vec<GeoRow>>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut resolved = Vec::new();
    for (nationality, counts) in rows {
        let Some(country_name) = config.country_for(nationality) else {
            continue;
        };
        let country = lookup_country(country_name)
            .ok_or_else(|| DashboardError::CountryLookup(country_name.to_string()))?;
        let centroid = country.geo();
        resolved.push(GeoRow {
            nationality: nationality.to_string(),
            country: country_name.to_string(),
            iso_alpha: country.alpha3().to_string(),
            counts,
            lat: centroid.latitude(),
            lon: centroid.longitude(),
        });
    }
    Ok(resolved)
}

/// Geo rows from a table with `Nationality` and `Counts` columns
///
/// Counts are zero-filled; rows with a missing nationality are skipped.
pub fn resolve_table(table: &Table, config: &DashboardConfig) -> Result<Vec<GeoRow>> {
    let column = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| DashboardError::MissingColumn(name.to_string()))
    };
    let (nat_idx, counts_idx) = (column("Nationality")?, column("Counts")?);

    let pairs: Vec<(String, f64)> = table
        .rows()
        .iter()
        .filter_map(|row| {
            let nationality = row[nat_idx].as_key()?;
            let counts = NullPolicy::ZeroFill.coerce(&row[counts_idx])?;
            Some((nationality, counts))
        })
        .collect();

    resolve(pairs.iter().map(|(n, c)| (n.as_str(), *c)), config)
}

/// Sums rows sharing an ISO code, keeping first-seen order
pub fn merge_by_country(rows: Vec<GeoRow>) -> Vec<GeoRow> {
    let mut merged: Vec<GeoRow> = Vec::new();
    for row in rows {
        match merged.iter_mut().find(|m| m.iso_alpha == row.iso_alpha) {
            Some(existing) => existing.counts += row.counts,
            None => merged.push(row),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DemonymEntry;

    #[test]
    fn every_default_demonym_resolves() {
        let config = DashboardConfig::default();
        for entry in &config.demonyms {
            assert!(
                lookup_country(&entry.country).is_some(),
                "no ISO entry for {}",
                entry.country
            );
        }
    }

    #[test]
    fn unknown_nationalities_are_dropped() {
        let config = DashboardConfig::default();
        let table = Table::from_records(
            &["Nationality", "Counts"],
            &[&["Chinese", "100"], &["Unknown", "50"]],
        );
        let rows = resolve_table(&table, &config).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].country, "China");
        assert_eq!(rows[0].iso_alpha, "CHN");
        assert_eq!(rows[0].counts, 100.0);
    }

    #[test]
    fn every_output_row_has_a_three_letter_code() {
        let config = DashboardConfig::default();
        let pairs = config
            .demonyms
            .iter()
            .map(|e| (e.demonym.as_str(), 1.0))
            .chain(std::iter::once(("Martian", 1.0)));
        let rows = resolve(pairs, &config).unwrap();
        assert_eq!(rows.len(), config.demonyms.len());
        assert!(rows.iter().all(|r| r.iso_alpha.len() == 3));
    }

    #[test]
    fn unresolvable_country_is_an_error() {
        let mut config = DashboardConfig::default();
        config.demonyms.push(DemonymEntry {
            demonym: "Atlantean".into(),
            country: "Atlantis".into(),
        });
        let err = resolve([("Atlantean", 3.0)], &config).unwrap_err();
        assert!(matches!(err, DashboardError::CountryLookup(c) if c == "Atlantis"));
    }

    #[test]
    fn configured_demonyms_resolve_through_the_registry() {
        let mut config = DashboardConfig::default();
        for (demonym, country) in [("Monegasque", "Monaco"), ("Andorran", "andorra"), ("Korean", "KOR")] {
            config.demonyms.push(DemonymEntry {
                demonym: demonym.into(),
                country: country.into(),
            });
        }
        let rows = resolve([("Monegasque", 1.0), ("Andorran", 2.0), ("Korean", 3.0)], &config).unwrap();
        let codes: Vec<&str> = rows.iter().map(|r| r.iso_alpha.as_str()).collect();
        assert_eq!(codes, ["MCO", "AND", "KOR"]);
        assert!(rows[0].lat > 43.0 && rows[0].lat < 44.5);
        assert!(rows[0].lon > 7.0 && rows[0].lon < 8.0);
    }

    #[test]
    fn lookup_accepts_codes_and_common_names() {
        for name in ["usa", "United States", "US", "gbr", " India "] {
            assert!(lookup_country(name).is_some(), "{} did not resolve", name);
        }
        assert_eq!(lookup_country("uk").map(|c| c.alpha3().to_string()), Some("GBR".to_string()));
        assert!(lookup_country("").is_none());
    }

    #[test]
    fn merge_sums_duplicate_countries() {
        let config = DashboardConfig::default();
        let rows = resolve([("Indian", 3.0), ("Chinese", 1.0), ("Indian", 4.0)], &config).unwrap();
        let merged = merge_by_country(rows);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].iso_alpha, "IND");
        assert_eq!(merged[0].counts, 7.0);
    }
}
