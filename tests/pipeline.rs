mod common;

use common::{TREND_SHEET, sample_workbook};
use visa_dashboard::charts::{self, ChartData, ChartKind};
use visa_dashboard::config::DashboardConfig;
use visa_dashboard::dashboard::build_dashboard;
use visa_dashboard::downloader::{ExportFormat, export};
use visa_dashboard::loader::{load_workbook, load_workbook_bytes};
use visa_dashboard::report::ReportRenderer;
use visa_dashboard::table::Workbook;

fn loaded() -> Workbook {
    load_workbook_bytes("visas.xlsx", sample_workbook()).unwrap()
}

fn dataset(kind: ChartKind) -> ChartData {
    charts::build(kind, &loaded(), TREND_SHEET, &DashboardConfig::default())
        .unwrap()
        .unwrap()
}

#[test]
fn all_six_charts_render_for_the_trend_sheet() {
    let config = DashboardConfig::default();
    let dash = build_dashboard(&loaded(), Some(TREND_SHEET), &config).unwrap();

    assert_eq!(dash.chart_kinds(), ChartKind::ALL.to_vec());
    assert!(dash.notices.is_empty());
    for chart in &dash.charts {
        assert!(chart.svg.starts_with("<svg"), "{} is not svg", chart.title);
    }
    assert_eq!(dash.preview.columns.len(), 6);
    assert_eq!(dash.preview.rows.len(), 3);
}

#[test]
fn nationality_sheet_only_gets_workbook_wide_charts() {
    let config = DashboardConfig::default();
    let kinds = charts::classify(&loaded(), "Study only Nationality", &config);
    assert_eq!(
        kinds,
        vec![
            ChartKind::TopNationalities,
            ChartKind::GeoSpread,
            ChartKind::StudyDependantGap,
            ChartKind::DependantTrends,
        ]
    );
}

#[test]
fn trend_values_are_summed_per_year_and_visa() {
    let ChartData::VisaTrends { years, series } = dataset(ChartKind::VisaTrends) else {
        panic!("wrong dataset");
    };
    assert_eq!(years, vec!["2021", "2022", "2023"]);
    assert_eq!(series[0].name, "Study");
    assert_eq!(series[0].values, vec![105.0, 150.0, 207.0]);
    assert_eq!(series[1].name, "Study dependant");
    assert_eq!(series[1].values, vec![10.0, 0.0, 30.0]);
}

#[test]
fn geo_rows_have_iso_codes_and_skip_unmapped() {
    let ChartData::GeoSpread(rows) = dataset(ChartKind::GeoSpread) else {
        panic!("wrong dataset");
    };
    let codes: Vec<(&str, f64)> = rows
        .iter()
        .map(|r| (r.iso_alpha.as_str(), r.counts))
        .collect();
    assert_eq!(codes, vec![("CHN", 100.0), ("IND", 80.0), ("KOR", 10.0)]);
    assert!(rows.iter().all(|r| r.iso_alpha.len() == 3));
}

#[test]
fn gap_rows_keep_incomplete_nationalities_last() {
    let ChartData::StudyDependantGap { rows, .. } = dataset(ChartKind::StudyDependantGap) else {
        panic!("wrong dataset");
    };
    let gaps: Vec<(&str, Option<f64>)> = rows
        .iter()
        .map(|r| (r.nationality.as_str(), r.gap))
        .collect();
    assert_eq!(
        gaps,
        vec![("Nigeria", Some(40.0)), ("India", Some(-30.0)), ("China", None)]
    );
    assert_eq!(rows[2].study, Some(90.0));
}

#[test]
fn dependant_trends_follow_category_order() {
    let ChartData::DependantTrends { years, series } = dataset(ChartKind::DependantTrends) else {
        panic!("wrong dataset");
    };
    assert_eq!(years, vec!["2021", "2022"]);
    let names: Vec<&str> = series.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Work Dependant", "Family"]);
    assert_eq!(
        series[1].points,
        vec![("2021".to_string(), 205), ("2022".to_string(), 210)]
    );
    assert_eq!(series[0].points[0], ("2021".to_string(), 12));
}

#[test]
fn csv_export_has_one_row_per_cell() {
    let config = DashboardConfig::default();
    let bytes = export(&loaded(), TREND_SHEET, ExportFormat::Csv, &config).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Cohort,Status,Visa,Year,Count");
    assert_eq!(lines.len(), 1 + 3 * 3);
    assert!(lines.contains(&"Main,Refused,Study,2022,0"));
}

#[test]
fn static_report_written_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("visas.xlsx");
    std::fs::write(&path, sample_workbook()).unwrap();

    let config = DashboardConfig::default();
    let workbook = load_workbook(&path).unwrap();
    let dash = build_dashboard(&workbook, None, &config).unwrap();
    assert_eq!(dash.selected, TREND_SHEET);

    let html = ReportRenderer::new().unwrap().render_static(&dash).unwrap();
    assert_eq!(html.matches("<figure class=\"chart\"").count(), 6);
    assert!(html.contains("Preview of 'Study visas'"));
}
