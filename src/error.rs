//! Error types for the visa dashboard.
//!
//! Chart-level failures (`CountryLookup`, `DuplicatePivotEntry`, `Render`) are
//! caught by the dashboard assembler and shown as notices; everything else
//! propagates to the caller.

/// All errors that can occur while loading, reshaping and rendering.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// Workbook could not be opened or a sheet could not be read.
    #[error("Spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// CSV input or export failure.
    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    /// XLSX export failure.
    #[error("XLSX export: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Configuration file is not valid JSON for `DashboardConfig`.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Embedded country outlines are not a GeoJSON feature collection.
    #[error("GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    /// HTML template failed to render.
    #[error("Template: {0}")]
    Template(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file extension: {0}")]
    UnsupportedFormat(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    /// A mapped country name has no ISO 3166 entry.
    #[error("No ISO 3166 entry for country '{0}'")]
    CountryLookup(String),

    /// Pivot saw the same (index, column) pair twice.
    #[error("Duplicate pivot entry for '{index}' / '{column}'")]
    DuplicatePivotEntry { index: String, column: String },

    #[error("Render error: {0}")]
    Render(String),

    /// Configuration values failed validation.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DashboardError>;

impl DashboardError {
    /// True for errors caused by the uploaded file rather than the server.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Spreadsheet(_) | Self::Csv(_) | Self::UnsupportedFormat(_) | Self::SheetNotFound(_)
        )
    }
}

impl From<handlebars::RenderError> for DashboardError {
    fn from(e: handlebars::RenderError) -> Self {
        Self::Template(e.to_string())
    }
}

impl From<handlebars::TemplateError> for DashboardError {
    fn from(e: handlebars::TemplateError) -> Self {
        Self::Template(e.to_string())
    }
}
