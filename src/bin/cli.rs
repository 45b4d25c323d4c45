use std::env;
use std::fs;
use std::io::{self, Write};
use visa_dashboard::config::DashboardConfig;
use visa_dashboard::dashboard::build_dashboard;
use visa_dashboard::loader::load_workbook;
use visa_dashboard::report::ReportRenderer;

const USAGE: &str = "Usage: visa-report <input> [--sheet NAME] [--config FILE] [-o OUT]";

struct Args {
    input: String,
    sheet: Option<String>,
    config: Option<String>,
    output: Option<String>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = env::args().skip(1);
    let mut input = None;
    let mut sheet = None;
    let mut config = None;
    let mut output = None;

    while let Some(arg) = args.next() {
        let target = match arg.as_str() {
            "--sheet" => &mut sheet,
            "--config" => &mut config,
            "-o" | "--output" => &mut output,
            _ if input.is_none() && !arg.starts_with('-') => {
                input = Some(arg);
                continue;
            }
            _ => return Err(format!("unexpected argument: {}", arg)),
        };
        *target = Some(args.next().ok_or_else(|| format!("{} needs a value", arg))?);
    }

    Ok(Args {
        input: input.ok_or("missing input file")?,
        sheet,
        config,
        output,
    })
}

/// Writes a static HTML dashboard for one spreadsheet
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    let config = match &args.config {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::default(),
    };
    config.validate()?;

    let workbook = load_workbook(&args.input)?;
    let dashboard = build_dashboard(&workbook, args.sheet.as_deref(), &config)?;
    for notice in &dashboard.notices {
        eprintln!("warning: {}: {}", notice.title, notice.message);
    }
    let html = ReportRenderer::new()?.render_static(&dashboard)?;

    match &args.output {
        Some(path) => {
            fs::write(path, html)?;
            log::info!(
                "Wrote {} with {} chart(s) to {}",
                dashboard.selected,
                dashboard.charts.len(),
                path
            );
        }
        None => io::stdout().write_all(html.as_bytes())?,
    }

    Ok(())
}
