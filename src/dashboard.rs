//! Assembles everything one page shows for a workbook and a selected sheet.

use crate::charts::{self, ChartKind};
use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::graph::{create_graph, GraphOptions};
use crate::table::Workbook;
use log::{debug, warn};
use serde::Serialize;

/// First rows of the selected sheet, as display strings
#[derive(Clone, Debug, Default, Serialize)]
pub struct Preview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RenderedChart {
    pub kind: ChartKind,
    pub title: String,
    /// Standalone SVG document
    pub svg: String,
}

/// A chart that could not be drawn and why
#[derive(Clone, Debug, Serialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

/// Everything the page template needs
#[derive(Clone, Debug, Serialize)]
pub struct Dashboard {
    pub sheet_names: Vec<String>,
    pub selected: String,
    pub preview: Preview,
    pub charts: Vec<RenderedChart>,
    pub notices: Vec<Notice>,
}

impl Dashboard {
    /// Kinds of the charts that were actually drawn
    pub fn chart_kinds(&self) -> Vec<ChartKind> {
        self.charts.iter().map(|c| c.kind).collect()
    }
}

/// Builds the dashboard for `selected` (or the first sheet)
///
/// Every renderable chart is built and drawn on its own. A chart that fails
/// becomes a [`Notice`] and the others are still drawn; charts whose data is
/// empty are left out silently.
///
/// # Errors
/// * `SheetNotFound` if `selected` names a sheet the workbook lacks, or the
///   workbook has no sheets at all
pub fn build_dashboard(
    workbook: &Workbook,
    selected: Option<&str>,
    config: &DashboardConfig,
) -> Result<Dashboard> {
    let selected = match selected {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .into_iter()
            .next()
            .ok_or_else(|| DashboardError::SheetNotFound("(workbook has no sheets)".into()))?,
    };
    let table = workbook
        .sheet(&selected)
        .ok_or_else(|| DashboardError::SheetNotFound(selected.clone()))?;

    let preview = Preview {
        columns: table.columns().to_vec(),
        rows: table.head(config.preview_rows),
    };

    let kinds = charts::classify(workbook, &selected, config);
    debug!("Sheet {:?}: renderable charts {:?}", selected, kinds);

    let mut rendered = Vec::new();
    let mut notices = Vec::new();
    for kind in kinds {
        match render_chart(kind, workbook, &selected, config) {
            Ok(Some(chart)) => rendered.push(chart),
            Ok(None) => debug!("{:?}: nothing to draw", kind),
            Err(e) => {
                warn!("{:?} skipped: {}", kind, e);
                notices.push(Notice {
                    title: kind.title(config),
                    message: e.to_string(),
                });
            }
        }
    }

    Ok(Dashboard {
        sheet_names: workbook.sheet_names(),
        selected,
        preview,
        charts: rendered,
        notices,
    })
}

fn render_chart(
    kind: ChartKind,
    workbook: &Workbook,
    selected: &str,
    config: &DashboardConfig,
) -> Result<Option<RenderedChart>> {
    let Some(data) = charts::build(kind, workbook, selected, config)? else {
        return Ok(None);
    };
    let options = GraphOptions::for_chart(kind, config).fit_to(&data);
    let svg = create_graph(&data, &options)?;
    Ok(Some(RenderedChart {
        kind,
        title: options.title,
        svg,
    }))
}
