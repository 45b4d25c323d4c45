use super::{ChartKind, Inputs};
use crate::aggregate::{group_sum, pivot};
use crate::error::Result;
use crate::geo::{self, GeoRow};
use crate::reshape::{ColumnSplit, melt, split_columns};
use std::cmp::Ordering;

/// Named sequence of values aligned with a shared x axis
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

/// Directed, weighted link between two flow-diagram nodes
#[derive(Clone, Debug, PartialEq)]
pub struct FlowLink {
    pub source: usize,
    pub target: usize,
    pub value: f64,
}

/// Two-level flow diagram
///
/// `nodes[..sources]` are the left-hand (status) nodes, the rest are the
/// right-hand (visa) nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowDiagram {
    pub nodes: Vec<String>,
    pub sources: usize,
    pub links: Vec<FlowLink>,
}

/// One nationality of the comparison plot
///
/// Either value may be absent; the gap exists only when both do.
#[derive(Clone, Debug, PartialEq)]
pub struct GapRow {
    pub nationality: String,
    pub study: Option<f64>,
    pub dependant: Option<f64>,
    /// `dependant - study`
    pub gap: Option<f64>,
}

impl GapRow {
    pub fn new(nationality: impl Into<String>, study: Option<f64>, dependant: Option<f64>) -> Self {
        Self {
            nationality: nationality.into(),
            study,
            dependant,
            gap: study.zip(dependant).map(|(s, d)| d - s),
        }
    }
}

/// Integer counts of one dependant category, ordered by year
#[derive(Clone, Debug, PartialEq)]
pub struct DependantSeries {
    pub name: String,
    pub points: Vec<(String, i64)>,
}

/// Dataset of one chart, ready for `graph::create_graph`
#[derive(Clone, Debug, PartialEq)]
pub enum ChartData {
    VisaTrends {
        years: Vec<String>,
        series: Vec<Series>,
    },
    StatusFlow(FlowDiagram),
    TopNationalities(Vec<(String, f64)>),
    GeoSpread(Vec<GeoRow>),
    StudyDependantGap {
        study_label: String,
        dependant_label: String,
        rows: Vec<GapRow>,
    },
    DependantTrends {
        years: Vec<String>,
        series: Vec<DependantSeries>,
    },
}

impl ChartData {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartData::VisaTrends { .. } => ChartKind::VisaTrends,
            ChartData::StatusFlow(_) => ChartKind::StatusFlow,
            ChartData::TopNationalities(_) => ChartKind::TopNationalities,
            ChartData::GeoSpread(_) => ChartKind::GeoSpread,
            ChartData::StudyDependantGap { .. } => ChartKind::StudyDependantGap,
            ChartData::DependantTrends { .. } => ChartKind::DependantTrends,
        }
    }

    /// True when there is nothing to draw
    pub fn is_empty(&self) -> bool {
        match self {
            ChartData::VisaTrends { years, series } => years.is_empty() || series.is_empty(),
            ChartData::StatusFlow(flow) => flow.links.is_empty(),
            ChartData::TopNationalities(bars) => bars.is_empty(),
            ChartData::GeoSpread(rows) => rows.is_empty(),
            ChartData::StudyDependantGap { rows, .. } => rows.is_empty(),
            ChartData::DependantTrends { series, .. } => series.is_empty(),
        }
    }
}

pub(crate) fn visa_trends(inputs: &Inputs<'_>) -> Result<Option<ChartData>> {
    let config = inputs.config;
    let split = split_columns(inputs.selected_name, inputs.selected, config);
    let long = melt(inputs.selected, &split, "Count", config.count_policy);
    let agg = group_sum(&long.to_table(), &["Year", "Visa"], "Count")?.sorted_by_keys();

    let years = agg.distinct_keys(0);
    let mut visas = agg.distinct_keys(1);
    visas.sort();

    let series = visas
        .into_iter()
        .map(|visa| {
            let values = years
                .iter()
                .map(|year| {
                    agg.groups
                        .iter()
                        .find(|g| &g.keys[0] == year && g.keys[1] == visa)
                        .map_or(0.0, |g| g.total)
                })
                .collect();
            Series { name: visa, values }
        })
        .collect();

    Ok(Some(ChartData::VisaTrends { years, series }))
}

pub(crate) fn status_flow(inputs: &Inputs<'_>) -> Result<Option<ChartData>> {
    let config = inputs.config;
    let split = split_columns(inputs.selected_name, inputs.selected, config);
    let long = melt(inputs.selected, &split, "Count", config.count_policy);
    let agg = group_sum(&long.to_table(), &["Status", "Visa"], "Count")?
        .positive_only()
        .sorted_by_keys();

    let statuses = agg.distinct_keys(0);
    let visas = agg.distinct_keys(1);
    let sources = statuses.len();

    let links = agg
        .groups
        .iter()
        .filter_map(|g| {
            let source = statuses.iter().position(|s| *s == g.keys[0])?;
            let target = visas.iter().position(|v| *v == g.keys[1])?;
            Some(FlowLink {
                source,
                target: sources + target,
                value: g.total,
            })
        })
        .collect();

    let mut nodes = statuses;
    nodes.extend(visas);

    Ok(Some(ChartData::StatusFlow(FlowDiagram {
        nodes,
        sources,
        links,
    })))
}

pub(crate) fn top_nationalities(inputs: &Inputs<'_>) -> Result<Option<ChartData>> {
    let Some((_, table)) = inputs.nationality_sheet() else {
        return Ok(None);
    };
    let top = group_sum(table, &["Nationality"], "Counts")?.top_n(inputs.config.top_n);
    let bars = top
        .groups
        .into_iter()
        .map(|g| (g.keys.into_iter().next().unwrap_or_default(), g.total))
        .collect();
    Ok(Some(ChartData::TopNationalities(bars)))
}

pub(crate) fn geo_spread(inputs: &Inputs<'_>) -> Result<Option<ChartData>> {
    let Some((_, table)) = inputs.nationality_sheet() else {
        return Ok(None);
    };
    let cohort = std::slice::from_ref(&inputs.config.cohort_label);
    let current = table.filter_in("Cohort", cohort);
    let rows = geo::resolve_table(&current, inputs.config)?;
    Ok(Some(ChartData::GeoSpread(geo::merge_by_country(rows))))
}

pub(crate) fn study_dependant_gap(inputs: &Inputs<'_>) -> Result<Option<ChartData>> {
    let config = inputs.config;
    let Some(table) = inputs.workbook.sheet(&config.comparison_sheet) else {
        return Ok(None);
    };

    // both visa types must occur somewhere in the sheet
    let wanted = [config.study_visa.clone(), config.dependant_visa.clone()];
    let present = table.filter_in("Visa", &wanted);
    let Some(visa_idx) = present.column_index("Visa") else {
        return Ok(None);
    };
    let has = |visa: &str| {
        present
            .rows()
            .iter()
            .any(|row| row[visa_idx].as_key().as_deref() == Some(visa))
    };
    if !has(&config.study_visa) || !has(&config.dependant_visa) {
        return Ok(None);
    }

    let pivoted = pivot(
        &present,
        "Nationality",
        "Visa",
        &config.cohort_label,
        &[config.study_visa.as_str(), config.dependant_visa.as_str()],
    )?;

    let mut rows: Vec<GapRow> = pivoted
        .into_iter()
        .map(|p| {
            let study = p.values.first().copied().flatten();
            let dependant = p.values.get(1).copied().flatten();
            GapRow::new(p.index, study, dependant)
        })
        .collect();
    // nationality order first, then largest gap first with incomplete rows last
    rows.sort_by(|a, b| a.nationality.cmp(&b.nationality));
    rows.sort_by(|a, b| match (a.gap, b.gap) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    Ok(Some(ChartData::StudyDependantGap {
        study_label: config.study_visa.clone(),
        dependant_label: config.dependant_visa.clone(),
        rows,
    }))
}

pub(crate) fn dependant_trends(inputs: &Inputs<'_>) -> Result<Option<ChartData>> {
    let config = inputs.config;
    let Some(table) = inputs.workbook.sheet(&config.dependant_sheet) else {
        return Ok(None);
    };

    let filtered = table.filter_in("Visa", &config.dependant_categories);
    let split = ColumnSplit {
        id_columns: vec!["Visa".to_string()],
        year_columns: split_columns(&config.dependant_sheet, &filtered, config).year_columns,
    };
    let mut long = melt(&filtered, &split, "Counts", config.dependant_count_policy);
    for row in &mut long.rows {
        row.count = row.count.trunc();
    }
    let agg = group_sum(&long.to_table(), &["Visa", "Year"], "Counts")?.sorted_by_keys();

    let mut years = agg.distinct_keys(1);
    years.sort();

    let series = config
        .dependant_categories
        .iter()
        .filter_map(|category| {
            let points: Vec<(String, i64)> = agg
                .groups
                .iter()
                .filter(|g| &g.keys[0] == category)
                .map(|g| (g.keys[1].clone(), g.total as i64))
                .collect();
            (!points.is_empty()).then(|| DependantSeries {
                name: category.clone(),
                points,
            })
        })
        .collect();

    Ok(Some(ChartData::DependantTrends { years, series }))
}
