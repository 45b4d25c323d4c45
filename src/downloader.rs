use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::reshape::{melt, split_columns, LongTable};
use crate::table::{format_number, Value, Workbook};
use std::str::FromStr;

/// Name of the value column in exported long tables
pub const EXPORT_VALUE_COLUMN: &str = "Count";

/// Download formats of the long-format export
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl FromStr for ExportFormat {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            other => Err(DashboardError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Long-format reshape of one sheet, as used for export
///
/// # Errors
/// * `SheetNotFound` if the workbook has no sheet called `sheet`
pub fn long_table_for_sheet(
    workbook: &Workbook,
    sheet: &str,
    config: &DashboardConfig,
) -> Result<LongTable> {
    let table = workbook
        .sheet(sheet)
        .ok_or_else(|| DashboardError::SheetNotFound(sheet.to_string()))?;
    let split = split_columns(sheet, table, config);
    Ok(melt(table, &split, EXPORT_VALUE_COLUMN, config.count_policy))
}

/// Reshapes `sheet` and encodes it in `format`
///
/// # Arguments
/// * `workbook` - The uploaded workbook
/// * `sheet` - Name of the sheet to export
/// * `format` - CSV or XLSX
/// * `config` - Supplies the split columns and null policy for the melt
///
/// # Returns
/// The encoded file body, one row per (identifier, year) pair
///
/// # Errors
/// * `SheetNotFound` if the workbook has no sheet called `sheet`
/// * `Csv` / `Xlsx` if encoding fails
pub fn export(
    workbook: &Workbook,
    sheet: &str,
    format: ExportFormat,
    config: &DashboardConfig,
) -> Result<Vec<u8>> {
    let long = long_table_for_sheet(workbook, sheet, config)?;
    log::info!(
        "Exporting sheet {:?} as {} ({} rows)",
        sheet,
        format.extension(),
        long.len()
    );
    match format {
        ExportFormat::Csv => Ok(to_csv(&long)?.into_bytes()),
        ExportFormat::Xlsx => to_xlsx(&long),
    }
}

fn header(long: &LongTable) -> Vec<String> {
    let mut columns = long.id_columns.clone();
    columns.push("Year".to_string());
    columns.push(long.value_name.clone());
    columns
}

/// Convert a long table to CSV
///
/// Header row is the id columns, `Year` and the value column. Missing cells
/// are written as empty fields.
///
/// # Examples
/// ```
/// use visa_dashboard::downloader::to_csv;
/// use visa_dashboard::reshape::{detect_columns, melt, NullPolicy};
/// use visa_dashboard::table::Table;
///
/// let wide = Table::from_records(&["Visa", "2022"], &[&["Study", "5"]]);
/// let long = melt(&wide, &detect_columns(&wide), "Count", NullPolicy::ZeroFill);
/// assert_eq!(to_csv(&long).unwrap(), "Visa,Year,Count\nStudy,2022,5\n");
/// ```
pub fn to_csv(long: &LongTable) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header(long))?;

    for row in &long.rows {
        let mut record: Vec<String> = row.ids.iter().map(Value::to_string).collect();
        record.push(row.year.clone().unwrap_or_default());
        record.push(format_number(row.count));
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DashboardError::Io(std::io::Error::new(e.error().kind(), e.to_string())))?;
    String::from_utf8(bytes)
        .map_err(|e| DashboardError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Convert a long table to an XLSX workbook with one "Long format" sheet
pub fn to_xlsx(long: &LongTable) -> Result<Vec<u8>> {
    use rust_xlsxwriter::{Format, Workbook};

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Long format")?;

    for (c, name) in header(long).iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, name, &bold)?;
    }

    for (r, row) in long.rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, value) in row.ids.iter().enumerate() {
            match value {
                Value::Text(s) => {
                    worksheet.write_string(r, c as u16, s)?;
                }
                Value::Number(n) => {
                    worksheet.write_number(r, c as u16, *n)?;
                }
                Value::Missing => {}
            }
        }
        let year_col = row.ids.len() as u16;
        if let Some(year) = &row.year {
            worksheet.write_string(r, year_col, year)?;
        }
        worksheet.write_number(r, year_col + 1, row.count)?;
    }

    Ok(workbook.save_to_buffer()?)
}
