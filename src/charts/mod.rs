//! Chart selection by data shape.
//!
//! `classify` looks at which sheets and columns are present and returns the
//! chart kinds that can be drawn; `build` turns one kind into its dataset.
//! Rendering lives in `crate::graph`.

pub mod datasets;

pub use datasets::{ChartData, DependantSeries, FlowDiagram, FlowLink, GapRow, Series};

use crate::config::DashboardConfig;
use crate::error::Result;
use crate::table::{Table, Workbook};
use serde::Serialize;

/// The six fixed charts of the dashboard, in page order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Stacked area of counts per year by visa type (selected sheet)
    VisaTrends,
    /// Status → visa flow diagram (selected sheet)
    StatusFlow,
    /// Top nationalities bar chart
    TopNationalities,
    /// Counts per country for one cohort, on a map
    GeoSpread,
    /// Study vs study-dependant dumbbell plot
    StudyDependantGap,
    /// Dependant visa categories over time
    DependantTrends,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::VisaTrends,
        ChartKind::StatusFlow,
        ChartKind::TopNationalities,
        ChartKind::GeoSpread,
        ChartKind::StudyDependantGap,
        ChartKind::DependantTrends,
    ];

    pub fn title(self, config: &DashboardConfig) -> String {
        match self {
            ChartKind::VisaTrends => "Visa Type Trends Over Time".to_string(),
            ChartKind::StatusFlow => "Status to Visa Flow".to_string(),
            ChartKind::TopNationalities => {
                format!("Top {} Nationalities of Students", config.top_n)
            }
            ChartKind::GeoSpread => match crate::reshape::extract_year(&config.cohort_label) {
                Some(year) => format!("Geographic Spread of Students ({})", year),
                None => format!("Geographic Spread of Students ({})", config.cohort_label),
            },
            ChartKind::StudyDependantGap => {
                "Study vs Dependent Visa Nationality Differences".to_string()
            }
            ChartKind::DependantTrends => "Dependent Visa Status Trends Over Time".to_string(),
        }
    }
}

/// What a chart kind needs from the workbook
pub(crate) struct Inputs<'a> {
    pub selected_name: &'a str,
    pub selected: &'a Table,
    pub workbook: &'a Workbook,
    pub config: &'a DashboardConfig,
}

impl<'a> Inputs<'a> {
    /// First configured nationality sheet present in the workbook
    pub fn nationality_sheet(&self) -> Option<(&'a str, &'a Table)> {
        self.workbook.first_present(&self.config.nationality_sheets)
    }

    fn is_renderable(&self, kind: ChartKind) -> bool {
        let config = self.config;
        match kind {
            ChartKind::VisaTrends => self.selected.has_columns(&["Cohort", "Visa"]),
            ChartKind::StatusFlow => self.selected.has_columns(&["Status", "Visa"]),
            ChartKind::TopNationalities => self
                .nationality_sheet()
                .is_some_and(|(_, t)| t.has_columns(&["Nationality", "Counts"])),
            ChartKind::GeoSpread => self
                .nationality_sheet()
                .is_some_and(|(_, t)| t.has_columns(&["Nationality", "Counts", "Cohort"])),
            ChartKind::StudyDependantGap => self
                .workbook
                .sheet(&config.comparison_sheet)
                .is_some_and(|t| {
                    t.has_columns(&["Nationality", "Visa", config.cohort_label.as_str()])
                }),
            ChartKind::DependantTrends => self
                .workbook
                .sheet(&config.dependant_sheet)
                .is_some_and(|t| t.has_column("Visa")),
        }
    }
}

/// Chart kinds whose sheets and columns are present
///
/// The first two kinds depend on the selected sheet; the others look for
/// their configured sheets anywhere in the workbook. Returns an empty list
/// when `selected` is not a sheet of `workbook`.
///
/// # Examples
/// ```
/// use visa_dashboard::charts::{classify, ChartKind};
/// use visa_dashboard::config::DashboardConfig;
/// use visa_dashboard::table::{Table, Workbook};
///
/// let mut wb = Workbook::new();
/// wb.insert("Flows", Table::from_records(&["Status", "Visa", "2022"], &[&["Granted", "Study", "1"]]));
/// let kinds = classify(&wb, "Flows", &DashboardConfig::default());
/// assert_eq!(kinds, vec![ChartKind::StatusFlow]);
/// ```
pub fn classify(workbook: &Workbook, selected: &str, config: &DashboardConfig) -> Vec<ChartKind> {
    let Some(table) = workbook.sheet(selected) else {
        return Vec::new();
    };
    let inputs = Inputs {
        selected_name: selected,
        selected: table,
        workbook,
        config,
    };
    ChartKind::ALL
        .into_iter()
        .filter(|kind| inputs.is_renderable(*kind))
        .collect()
}

/// Dataset for one chart kind
///
/// Returns `Ok(None)` when the kind is not renderable for this workbook or
/// when reshaping leaves nothing to draw.
///
/// # Errors
/// * `CountryLookup` from the geo chart
/// * `DuplicatePivotEntry` from the comparison chart
pub fn build(
    kind: ChartKind,
    workbook: &Workbook,
    selected: &str,
    config: &DashboardConfig,
) -> Result<Option<ChartData>> {
    let Some(table) = workbook.sheet(selected) else {
        return Ok(None);
    };
    let inputs = Inputs {
        selected_name: selected,
        selected: table,
        workbook,
        config,
    };
    if !inputs.is_renderable(kind) {
        return Ok(None);
    }

    let data = match kind {
        ChartKind::VisaTrends => datasets::visa_trends(&inputs)?,
        ChartKind::StatusFlow => datasets::status_flow(&inputs)?,
        ChartKind::TopNationalities => datasets::top_nationalities(&inputs)?,
        ChartKind::GeoSpread => datasets::geo_spread(&inputs)?,
        ChartKind::StudyDependantGap => datasets::study_dependant_gap(&inputs)?,
        ChartKind::DependantTrends => datasets::dependant_trends(&inputs)?,
    };
    Ok(data.filter(|d| !d.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook() -> Workbook {
        let mut wb = Workbook::new();
        wb.insert(
            "Study visas",
            Table::from_records(
                &["Cohort", "Status", "Visa", "2021", "2022"],
                &[&["YE June", "Granted", "Study", "1", "2"]],
            ),
        );
        wb.insert(
            "Study only Nationality",
            Table::from_records(
                &["Cohort", "Nationality", "Counts"],
                &[&["YE June 2023", "Chinese", "100"]],
            ),
        );
        wb
    }

    #[test]
    fn selected_sheet_gates_trend_and_flow() {
        let config = DashboardConfig::default();
        let kinds = classify(&workbook(), "Study visas", &config);
        assert_eq!(
            kinds,
            vec![
                ChartKind::VisaTrends,
                ChartKind::StatusFlow,
                ChartKind::TopNationalities,
                ChartKind::GeoSpread,
            ]
        );

        let kinds = classify(&workbook(), "Study only Nationality", &config);
        assert_eq!(kinds, vec![ChartKind::TopNationalities, ChartKind::GeoSpread]);
    }

    #[test]
    fn unknown_sheet_renders_nothing() {
        let config = DashboardConfig::default();
        assert!(classify(&workbook(), "Nope", &config).is_empty());
        assert!(
            build(ChartKind::StatusFlow, &workbook(), "Nope", &config)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn geo_title_uses_cohort_year() {
        let config = DashboardConfig::default();
        assert_eq!(
            ChartKind::GeoSpread.title(&config),
            "Geographic Spread of Students (2023)"
        );
    }
}
