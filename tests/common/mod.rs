#![allow(dead_code)]

use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

pub const TREND_SHEET: &str = "Study visas";

/// Writes a header row followed by string/number rows; numeric-looking
/// cells are written as numbers unless they start with `'`
fn fill(sheet: &mut Worksheet, header: &[&str], rows: &[&[&str]]) -> Result<(), XlsxError> {
    for (c, label) in header.iter().enumerate() {
        sheet.write_string(0, c as u16, *label)?;
    }
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let (r, c) = (r as u32 + 1, c as u16);
            if let Some(text) = cell.strip_prefix('\'') {
                sheet.write_string(r, c, text)?;
            } else if let Ok(n) = cell.parse::<f64>() {
                sheet.write_number(r, c, n)?;
            } else if !cell.is_empty() {
                sheet.write_string(r, c, *cell)?;
            }
        }
    }
    Ok(())
}

/// A workbook with every sheet the dashboard knows about
pub fn sample_workbook() -> Vec<u8> {
    let mut wb = Workbook::new();

    let sheet = wb.add_worksheet();
    sheet.set_name(TREND_SHEET).unwrap();
    fill(
        sheet,
        &["Cohort", "Status", "Visa", "YE June 2021", "YE June 2022", "YE June 2023"],
        &[
            &["Main", "Granted", "Study", "100", "150", "200"],
            &["Main", "Granted", "Study dependant", "10", "", "30"],
            &["Main", "Refused", "Study", "5", "n/a", "7"],
        ],
    )
    .unwrap();

    let sheet = wb.add_worksheet();
    sheet.set_name("Study only Nationality").unwrap();
    fill(
        sheet,
        &["Cohort", "Nationality", "Counts"],
        &[
            &["YE June 2023", "Chinese", "100"],
            &["YE June 2023", "Indian", "80"],
            &["YE June 2023", "Unknown", "50"],
            &["YE June 2022", "Nigerian", "40"],
            &["YE June 2023", "South Korean", "10"],
        ],
    )
    .unwrap();

    let sheet = wb.add_worksheet();
    sheet.set_name("Study and Dependant Nationality").unwrap();
    fill(
        sheet,
        &["Nationality", "Visa", "YE June 2023"],
        &[
            &["India", "Study", "40"],
            &["India", "Study dependant", "10"],
            &["Nigeria", "Study", "20"],
            &["Nigeria", "Study dependant", "60"],
            &["China", "Study", "90"],
        ],
    )
    .unwrap();

    let sheet = wb.add_worksheet();
    sheet.set_name("Study Dep Status and Visa").unwrap();
    fill(
        sheet,
        &["Visa", "YE June 2021", "YE June 2022"],
        &[
            &["Family", "'200", "210"],
            &["Family", "5", ""],
            &["Work Dependant", "12.7", "15"],
            &["Other", "999", "999"],
        ],
    )
    .unwrap();

    wb.save_to_buffer().unwrap()
}
