//! Wide-to-long reshaping of year-per-column sheets.
//!
//! Published visa tables carry one column per reporting period ("2019",
//! "YE June 2023", ...). `melt` turns them into one row per (entity, period)
//! observation with a `Year` and a count column.

use crate::config::DashboardConfig;
use crate::table::{Table, Value};
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref YEAR_REGEX: Regex = Regex::new(r"(\d{4})").unwrap();
}

/// What to do with a count that is missing or not a number
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullPolicy {
    /// Keep the row with a count of 0
    ZeroFill,
    /// Drop the row
    Drop,
}

impl NullPolicy {
    /// Applies the policy to one cell
    pub fn coerce(self, value: &Value) -> Option<f64> {
        match (value.as_number(), self) {
            (Some(n), _) => Some(n),
            (None, NullPolicy::ZeroFill) => Some(0.0),
            (None, NullPolicy::Drop) => None,
        }
    }
}

/// Disjoint id and year column sets of a sheet
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnSplit {
    pub id_columns: Vec<String>,
    pub year_columns: Vec<String>,
}

/// Label heuristic for period columns: contains "20" or "YE"
pub fn is_year_like(label: &str) -> bool {
    label.contains("20") || label.contains("YE")
}

/// First run of four digits in a column label
///
/// # Examples
/// ```
/// use visa_dashboard::reshape::extract_year;
///
/// assert_eq!(extract_year("YE June 2023").as_deref(), Some("2023"));
/// assert_eq!(extract_year("2019").as_deref(), Some("2019"));
/// assert_eq!(extract_year("YE June"), None);
/// ```
pub fn extract_year(label: &str) -> Option<String> {
    YEAR_REGEX
        .captures(label)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Splits columns by the year-label heuristic
pub fn detect_columns(table: &Table) -> ColumnSplit {
    let (year_columns, id_columns): (Vec<String>, Vec<String>) = table
        .columns()
        .iter()
        .cloned()
        .partition(|c| is_year_like(c));
    ColumnSplit {
        id_columns,
        year_columns,
    }
}

/// Column split for a named sheet
///
/// An explicit schema from configuration takes precedence over the
/// heuristic. Schema columns that the sheet does not have are ignored.
pub fn split_columns(sheet: &str, table: &Table, config: &DashboardConfig) -> ColumnSplit {
    let Some(schema) = config.schema_for(sheet) else {
        let split = detect_columns(table);
        debug!(
            "sheet '{}': detected {} year columns by label",
            sheet,
            split.year_columns.len()
        );
        return split;
    };

    let present = |cols: &[String]| -> Vec<String> {
        cols.iter()
            .filter(|c| {
                let found = table.has_column(c);
                if !found {
                    warn!("sheet '{}': configured column '{}' not found", sheet, c);
                }
                found
            })
            .cloned()
            .collect()
    };

    ColumnSplit {
        id_columns: present(&schema.id_columns),
        year_columns: present(&schema.year_columns),
    }
}

/// One observation of a long table
#[derive(Clone, Debug, PartialEq)]
pub struct LongRow {
    /// Values of the id columns, in `LongTable::id_columns` order
    pub ids: Vec<Value>,
    /// Four-digit year from the source column label, if it had one
    pub year: Option<String>,
    pub count: f64,
}

/// Result of a wide-to-long melt
#[derive(Clone, Debug, PartialEq)]
pub struct LongTable {
    pub id_columns: Vec<String>,
    pub value_name: String,
    pub rows: Vec<LongRow>,
}

impl LongTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Back to a plain table: id columns, then `Year`, then the value column
    pub fn to_table(&self) -> Table {
        let mut columns = self.id_columns.clone();
        columns.push("Year".to_string());
        columns.push(self.value_name.clone());

        let mut table = Table::new(columns);
        for row in &self.rows {
            let mut values = row.ids.clone();
            values.push(match &row.year {
                Some(year) => Value::Text(year.clone()),
                None => Value::Missing,
            });
            values.push(Value::Number(row.count));
            table.push_row(values);
        }
        table
    }
}

/// Wide-to-long melt
///
/// Produces one row per (source row × year column) in column-major order,
/// except rows dropped by `NullPolicy::Drop`. Columns of `split` that the
/// table lacks are skipped.
///
/// # Examples
/// ```
/// use visa_dashboard::reshape::{melt, detect_columns, NullPolicy};
/// use visa_dashboard::table::Table;
///
/// let wide = Table::from_records(
///     &["Visa", "2021", "2022"],
///     &[&["Study", "10", "20"], &["Family", "x", "5"]],
/// );
/// let long = melt(&wide, &detect_columns(&wide), "Count", NullPolicy::ZeroFill);
/// assert_eq!(long.len(), 4);
/// assert_eq!(long.rows[1].count, 0.0);
/// ```
pub fn melt(table: &Table, split: &ColumnSplit, value_name: &str, policy: NullPolicy) -> LongTable {
    let id_idx: Vec<(String, usize)> = split
        .id_columns
        .iter()
        .filter_map(|c| table.column_index(c).map(|i| (c.clone(), i)))
        .collect();
    let year_idx: Vec<(Option<String>, usize)> = split
        .year_columns
        .iter()
        .filter_map(|c| table.column_index(c).map(|i| (extract_year(c), i)))
        .collect();

    if year_idx.is_empty() {
        warn!("melt: no year columns, result is empty");
    }

    let mut rows = Vec::with_capacity(table.len() * year_idx.len());
    for (year, col) in &year_idx {
        for source in table.rows() {
            let Some(count) = policy.coerce(&source[*col]) else {
                continue;
            };
            rows.push(LongRow {
                ids: id_idx.iter().map(|(_, i)| source[*i].clone()).collect(),
                year: year.clone(),
                count,
            });
        }
    }

    LongTable {
        id_columns: id_idx.into_iter().map(|(c, _)| c).collect(),
        value_name: value_name.to_string(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SheetSchema;

    fn wide() -> Table {
        Table::from_records(
            &["Status", "Visa", "YE June 2021", "YE June 2022", "YE June 2023"],
            &[
                &["Granted", "Study", "100", "150", "200"],
                &["Granted", "Study dependant", "10", "", "30"],
                &["Refused", "Study", "5", "z", "7"],
            ],
        )
    }

    #[test]
    fn heuristic_picks_year_labels() {
        let split = detect_columns(&wide());
        assert_eq!(split.id_columns, vec!["Status", "Visa"]);
        assert_eq!(split.year_columns.len(), 3);
        assert!(is_year_like("YE"));
        assert!(!is_year_like("Nationality"));
    }

    #[test]
    fn melt_row_count_is_rows_times_year_columns() {
        let table = wide();
        let split = detect_columns(&table);
        let long = melt(&table, &split, "Count", NullPolicy::ZeroFill);
        assert_eq!(long.len(), table.len() * split.year_columns.len());
        assert_eq!(long.rows[0].year.as_deref(), Some("2021"));
        assert_eq!(long.rows[3].year.as_deref(), Some("2022"));
        // "" and "z" are zero-filled
        assert_eq!(long.rows[4].count, 0.0);
        assert_eq!(long.rows[5].count, 0.0);
    }

    #[test]
    fn drop_policy_removes_unparsable_cells() {
        let table = wide();
        let long = melt(&table, &detect_columns(&table), "Counts", NullPolicy::Drop);
        assert_eq!(long.len(), 7);
        assert!(long.rows.iter().all(|r| r.count > 0.0));
    }

    #[test]
    fn no_year_columns_gives_empty_table() {
        let table = Table::from_records(&["Nationality", "Counts"], &[&["Chinese", "1"]]);
        let long = melt(&table, &detect_columns(&table), "Count", NullPolicy::ZeroFill);
        assert!(long.is_empty());
        assert_eq!(long.id_columns, vec!["Nationality", "Counts"]);
    }

    #[test]
    fn explicit_schema_overrides_heuristic() {
        let mut config = DashboardConfig::default();
        config.sheet_schemas.insert(
            "Visas".to_string(),
            SheetSchema {
                id_columns: vec!["Visa".into(), "Ghost".into()],
                year_columns: vec!["YE June 2023".into()],
            },
        );
        let split = split_columns("Visas", &wide(), &config);
        assert_eq!(split.id_columns, vec!["Visa"]);
        assert_eq!(split.year_columns, vec!["YE June 2023"]);

        let fallback = split_columns("Other", &wide(), &config);
        assert_eq!(fallback.year_columns.len(), 3);
    }

    #[test]
    fn to_table_appends_year_and_value() {
        let table = wide();
        let long = melt(&table, &detect_columns(&table), "Count", NullPolicy::ZeroFill);
        let flat = long.to_table();
        assert_eq!(flat.columns(), &["Status", "Visa", "Year", "Count"]);
        assert_eq!(flat.get(0, "Year"), Some(&Value::Text("2021".into())));
        assert_eq!(flat.get(0, "Count"), Some(&Value::Number(100.0)));
    }
}
