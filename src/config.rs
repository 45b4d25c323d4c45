use crate::error::{DashboardError, Result};
use crate::reshape::NullPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One demonym → country-name pair of the geo lookup
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemonymEntry {
    pub demonym: String,
    pub country: String,
}

/// Explicit column layout of a sheet
///
/// When a sheet has a schema, the reshaper uses it instead of guessing year
/// columns from their labels.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSchema {
    pub id_columns: Vec<String>,
    pub year_columns: Vec<String>,
}

/// Everything the dashboard treats as fixed input besides the workbook
///
/// Defaults reproduce the published UK visa statistics layout. Any field
/// may be overridden from a JSON file; missing fields keep their default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Candidate nationality sheets, first present one wins
    pub nationality_sheets: Vec<String>,

    pub demonyms: Vec<DemonymEntry>,

    /// Cohort shown on the map, also the value column of the comparison plot
    pub cohort_label: String,

    pub comparison_sheet: String,
    pub study_visa: String,
    pub dependant_visa: String,

    pub dependant_sheet: String,
    pub dependant_categories: Vec<String>,

    /// Number of bars in the nationality chart
    pub top_n: usize,

    /// Unparsable counts in the trend and flow charts
    pub count_policy: NullPolicy,

    /// Unparsable counts in the dependant trends chart
    pub dependant_count_policy: NullPolicy,

    /// Sheet name → explicit id/year columns
    pub sheet_schemas: BTreeMap<String, SheetSchema>,

    pub chart_width: u32,
    pub chart_height: u32,

    /// Rows shown in the sheet preview
    pub preview_rows: usize,

    pub bind_addr: String,
    pub max_upload_bytes: usize,

    /// Idle time after which an uploaded workbook is dropped
    pub session_ttl_secs: u64,
    /// Upper bound on workbooks held at once; the least recently used goes first
    pub max_sessions: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let demonyms = [
            ("Chinese", "China"),
            ("Indian", "India"),
            ("USA", "United States"),
            ("Nigerian", "Nigeria"),
            ("Saudi", "Saudi Arabia"),
            ("Malaysian", "Malaysia"),
            ("Pakistani", "Pakistan"),
            ("Thai", "Thailand"),
            ("South Korean", "South Korea"),
            ("Canadian", "Canada"),
            ("Bangladeshi", "Bangladesh"),
            ("Kuwaiti", "Kuwait"),
            ("Sri Lankan", "Sri Lanka"),
            ("Nepali", "Nepal"),
            ("Ghanaian", "Ghana"),
        ];

        Self {
            nationality_sheets: vec![
                "Study-related Nationality".to_string(),
                "Study only Nationality".to_string(),
                "Study Dep Nationality".to_string(),
                "Status by Nationality".to_string(),
                "Study and Dependant Nationality".to_string(),
            ],
            demonyms: demonyms
                .iter()
                .map(|(d, c)| DemonymEntry {
                    demonym: d.to_string(),
                    country: c.to_string(),
                })
                .collect(),
            cohort_label: "YE June 2023".to_string(),
            comparison_sheet: "Study and Dependant Nationality".to_string(),
            study_visa: "Study".to_string(),
            dependant_visa: "Study dependant".to_string(),
            dependant_sheet: "Study Dep Status and Visa".to_string(),
            dependant_categories: vec![
                "Study Dependant".to_string(),
                "Work Dependant".to_string(),
                "Family".to_string(),
            ],
            top_n: 10,
            count_policy: NullPolicy::ZeroFill,
            dependant_count_policy: NullPolicy::Drop,
            sheet_schemas: BTreeMap::new(),
            chart_width: 1000,
            chart_height: 550,
            preview_rows: 5,
            bind_addr: "127.0.0.1:3000".to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
            session_ttl_secs: 3600,
            max_sessions: 100,
        }
    }
}

impl DashboardConfig {
    /// Reads a JSON configuration file and validates it
    ///
    /// # Errors
    /// * `Io` if the file cannot be read
    /// * `Json` if it is not a valid configuration object
    /// * `Config` if a value is out of range
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: DashboardConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(DashboardError::Config("top_n must be greater than 0".into()));
        }
        if self.chart_width < 200 || self.chart_height < 200 {
            return Err(DashboardError::Config(
                "chart_width and chart_height must be at least 200 pixels".into(),
            ));
        }
        if self.cohort_label.trim().is_empty() {
            return Err(DashboardError::Config("cohort_label cannot be empty".into()));
        }
        if self.max_upload_bytes == 0 {
            return Err(DashboardError::Config(
                "max_upload_bytes must be greater than 0".into(),
            ));
        }
        if self.max_sessions == 0 {
            return Err(DashboardError::Config("max_sessions must be greater than 0".into()));
        }
        Ok(())
    }

    /// Country name for a nationality label, if the demonym is known
    pub fn country_for(&self, nationality: &str) -> Option<&str> {
        self.demonyms
            .iter()
            .find(|entry| entry.demonym == nationality)
            .map(|entry| entry.country.as_str())
    }

    pub fn schema_for(&self, sheet: &str) -> Option<&SheetSchema> {
        self.sheet_schemas.get(sheet)
    }
}
