use crate::dashboard::Dashboard;
use crate::error::Result;
use handlebars::Handlebars;
use serde::Serialize;

const TEMPLATE_NAME: &str = "dashboard";
const PAGE_TITLE: &str = "UK International Student Visa Dashboard";
const HEADING: &str = "UK International Student & Dependent Visa Dashboard (2019-2023)";
const UPLOAD_INFO: &str = "Please upload an Excel file to see the dashboard.";

#[derive(Serialize)]
struct SheetLink<'a> {
    name: &'a str,
    href: String,
    selected: bool,
}

#[derive(Serialize)]
struct PageContext<'a> {
    page_title: &'static str,
    heading: &'static str,
    info: &'static str,
    interactive: bool,
    error: Option<&'a str>,
    dashboard: Option<&'a Dashboard>,
    sheets: Vec<SheetLink<'a>>,
    export_csv: String,
    export_xlsx: String,
    generated: Option<String>,
}

/// Link to the page for one sheet
pub fn sheet_href(sheet: &str) -> String {
    format!("/?sheet={}", urlencoding::encode(sheet))
}

/// Link to the long-format download of one sheet
pub fn export_href(sheet: &str, format: &str) -> String {
    format!(
        "/export?sheet={}&format={}",
        urlencoding::encode(sheet),
        format
    )
}

/// HTML pages of the dashboard
///
/// The interactive page carries the upload form, sheet links, the sheet
/// selector and export links. The static page (used by `visa-report`) has
/// the same content without forms and with a generation timestamp.
pub struct ReportRenderer {
    registry: Handlebars<'static>,
}

impl ReportRenderer {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_template_string(TEMPLATE_NAME, include_str!("./static/dashboard.hbs"))?;
        Ok(ReportRenderer { registry })
    }

    /// Landing page: upload form and the info message, plus `error` if set
    pub fn render_upload(&self, error: Option<&str>) -> Result<String> {
        self.render(PageContext {
            error,
            ..Self::context(None, true)
        })
    }

    /// Interactive dashboard page
    pub fn render_dashboard(&self, dashboard: &Dashboard) -> Result<String> {
        self.render(Self::context(Some(dashboard), true))
    }

    /// Self-contained report without forms
    pub fn render_static(&self, dashboard: &Dashboard) -> Result<String> {
        self.render(PageContext {
            generated: Some(chrono::Local::now().format("%Y-%m-%d %H:%M").to_string()),
            ..Self::context(Some(dashboard), false)
        })
    }

    fn context(dashboard: Option<&Dashboard>, interactive: bool) -> PageContext<'_> {
        let sheets = dashboard
            .map(|d| {
                d.sheet_names
                    .iter()
                    .map(|name| SheetLink {
                        name,
                        href: sheet_href(name),
                        selected: *name == d.selected,
                    })
                    .collect()
            })
            .unwrap_or_default();
        let selected = dashboard.map(|d| d.selected.as_str()).unwrap_or_default();

        PageContext {
            page_title: PAGE_TITLE,
            heading: HEADING,
            info: UPLOAD_INFO,
            interactive,
            error: None,
            dashboard,
            sheets,
            export_csv: export_href(selected, "csv"),
            export_xlsx: export_href(selected, "xlsx"),
            generated: None,
        }
    }

    fn render(&self, context: PageContext<'_>) -> Result<String> {
        Ok(self.registry.render(TEMPLATE_NAME, &context)?)
    }
}
