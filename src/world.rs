//! Country outlines for the choropleth map.
//!
//! Natural Earth 1:110m admin-0 boundaries, embedded as GeoJSON with an
//! `iso_a3` property per feature. Only outer rings are kept: enclaves are
//! their own features and are drawn over the country around them.

use crate::error::{DashboardError, Result};
use geojson::{FeatureCollection, Value as Geometry};
use lazy_static::lazy_static;

const COUNTRIES_GEOJSON: &str = include_str!("static/countries.geojson");

/// One country's polygons as `(longitude, latitude)` rings
#[derive(Clone, Debug, PartialEq)]
pub struct CountryShape {
    pub iso_alpha: String,
    pub name: String,
    pub rings: Vec<Vec<(f64, f64)>>,
}

lazy_static! {
    static ref WORLD: std::result::Result<Vec<CountryShape>, String> =
        parse_shapes(COUNTRIES_GEOJSON).map_err(|e| e.to_string());
}

/// The embedded world outlines, parsed on first use
///
/// # Returns
/// Every country feature in file order
///
/// # Errors
/// * `Render` if the embedded GeoJSON cannot be read
pub fn world() -> Result<&'static [CountryShape]> {
    WORLD
        .as_deref()
        .map_err(|e| DashboardError::Render(format!("country outlines: {}", e)))
}

/// Outline of one country by alpha-3 code
pub fn shape_for(iso_alpha: &str) -> Option<&'static CountryShape> {
    world().ok()?.iter().find(|s| s.iso_alpha == iso_alpha)
}

/// Reads a feature collection of `Polygon`/`MultiPolygon` countries
///
/// Features without geometry or without an `iso_a3` property are skipped,
/// as are other geometry types.
///
/// # Errors
/// * `GeoJson` if the text is not a GeoJSON feature collection
pub fn parse_shapes(text: &str) -> Result<Vec<CountryShape>> {
    let collection: FeatureCollection = text.parse()?;

    let shapes = collection
        .features
        .into_iter()
        .filter_map(|feature| {
            let iso_alpha = feature.property("iso_a3")?.as_str()?.to_string();
            let name = feature
                .property("name")
                .and_then(|v| v.as_str())
                .unwrap_or(&iso_alpha)
                .to_string();
            let polygons = match feature.geometry?.value {
                Geometry::Polygon(polygon) => vec![polygon],
                Geometry::MultiPolygon(polygons) => polygons,
                _ => return None,
            };
            let rings = polygons
                .into_iter()
                .filter_map(|polygon| polygon.into_iter().next())
                .map(|ring| {
                    ring.into_iter()
                        .filter_map(|p| Some((*p.first()?, *p.get(1)?)))
                        .collect()
                })
                .collect();
            Some(CountryShape {
                iso_alpha,
                name,
                rings,
            })
        })
        .collect();

    Ok(shapes)
}

/// Absolute planar area of a ring in square degrees
pub fn ring_area(ring: &[(f64, f64)]) -> f64 {
    let twice: f64 = ring
        .iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|((x0, y0), (x1, y1))| x0 * y1 - x1 * y0)
        .sum();
    (twice / 2.0).abs()
}
