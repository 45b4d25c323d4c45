use crate::error::{DashboardError, Result};
use crate::table::{Table, Value, Workbook};
use calamine::{Data, Range, Reader};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;

/// Extensions handled by calamine
const SPREADSHEET_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

/// Load every sheet of a spreadsheet file
///
/// The format is chosen from the file extension. See [`load_workbook_bytes`].
///
/// # Examples
/// ```no_run
/// use visa_dashboard::loader::load_workbook;
///
/// match load_workbook("visas.xlsx") {
///     Ok(wb) => println!("Loaded sheets: {:?}", wb.sheet_names()),
///     Err(e) => eprintln!("Error loading workbook: {}", e),
/// }
/// ```
pub fn load_workbook(path: impl AsRef<Path>) -> Result<Workbook> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    load_workbook_bytes(file_name, bytes)
}

/// Load every sheet of an uploaded spreadsheet held in memory
///
/// `.xlsx`, `.xlsm`, `.xls` and `.ods` go through calamine; `.csv` becomes a
/// single sheet named after the file stem. The first row of each sheet is the
/// header row.
///
/// # Arguments
/// * `file_name` - Name of the upload; only its extension and stem are used
/// * `bytes` - The file contents
///
/// # Returns
/// A workbook with one table per sheet, in file order
///
/// # Errors
/// * `UnsupportedFormat` for any other extension
/// * `Spreadsheet` / `Csv` if the content cannot be parsed
pub fn load_workbook_bytes(file_name: &str, bytes: Vec<u8>) -> Result<Workbook> {
    let path = Path::new(file_name);
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let workbook = if extension == "csv" {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("Sheet1");
        let mut workbook = Workbook::new();
        workbook.insert(stem, from_csv(&bytes)?);
        workbook
    } else if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
        from_spreadsheet(bytes)?
    } else {
        return Err(DashboardError::UnsupportedFormat(file_name.to_string()));
    };

    log::info!(
        "Loaded {} with {} sheet(s)",
        file_name,
        workbook.sheets().len()
    );
    Ok(workbook)
}

fn from_spreadsheet(bytes: Vec<u8>) -> Result<Workbook> {
    let mut sheets = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let mut workbook = Workbook::new();

    for name in sheets.sheet_names() {
        let range = sheets.worksheet_range(&name)?;
        let table = range_to_table(&range);
        log::debug!(
            "Sheet {:?}: {} columns, {} rows",
            name,
            table.columns().len(),
            table.len()
        );
        workbook.insert(name, table);
    }

    Ok(workbook)
}

fn from_csv(bytes: &[u8]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(csv_value).collect::<Vec<_>>());
    }
    Ok(build_table(rows))
}

/// Converts a calamine range to a table, first row as header
pub fn range_to_table(range: &Range<Data>) -> Table {
    build_table(
        range
            .rows()
            .map(|row| row.iter().map(cell_value).collect())
            .collect(),
    )
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::Number(*i as f64),
        Data::Float(f) => Value::Number(*f),
        Data::String(s) => Value::text(s.as_str()),
        Data::Error(_) | Data::Empty => Value::Missing,
        other => Value::text(other.to_string()),
    }
}

fn csv_value(field: &str) -> Value {
    match field.trim().parse::<f64>() {
        Ok(n) if !field.trim().is_empty() && n.is_finite() => Value::Number(n),
        _ => Value::text(field),
    }
}

fn build_table(mut rows: Vec<Vec<Value>>) -> Table {
    if rows.is_empty() {
        return Table::new(Vec::new());
    }
    let header = rows.remove(0);
    let mut table = Table::new(header_labels(&header));
    for row in rows {
        if row.iter().all(Value::is_missing) {
            continue;
        }
        table.push_row(row);
    }
    table
}

/// Header normalisation: trimmed labels, `Unnamed: i` for blanks and
/// `.1`, `.2`, ... suffixes on repeats
fn header_labels(header: &[Value]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut repeats: HashMap<String, usize> = HashMap::new();
    let mut labels = Vec::with_capacity(header.len());

    for (i, cell) in header.iter().enumerate() {
        let label = match cell {
            Value::Missing => format!("Unnamed: {}", i),
            other => other.to_string().trim().to_string(),
        };
        if used.insert(label.clone()) {
            labels.push(label);
            continue;
        }
        let count = repeats.entry(label.clone()).or_insert(0);
        loop {
            *count += 1;
            let candidate = format!("{}.{}", label, count);
            if used.insert(candidate.clone()) {
                labels.push(candidate);
                break;
            }
        }
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Vec<u8> {
        let mut wb = rust_xlsxwriter::Workbook::new();
        let ws = wb.add_worksheet();
        ws.set_name("Study visas").unwrap();
        ws.write_string(0, 0, " Status ").unwrap();
        ws.write_string(0, 1, "Visa").unwrap();
        ws.write_number(0, 2, 2021.0).unwrap();
        ws.write_string(0, 3, "Visa").unwrap();
        ws.write_string(1, 0, "Granted").unwrap();
        ws.write_string(1, 1, "Study").unwrap();
        ws.write_number(1, 2, 12.0).unwrap();
        ws.write_string(1, 3, "x").unwrap();
        // row 2 left empty
        ws.write_string(3, 0, "Refused").unwrap();
        ws.write_string(3, 1, "Study").unwrap();
        ws.write_string(3, 2, "3").unwrap();
        ws.write_string(3, 4, "extra").unwrap();

        let other = wb.add_worksheet();
        other.set_name("Notes").unwrap();
        other.write_string(0, 0, "Note").unwrap();
        wb.save_to_buffer().unwrap()
    }

    #[test]
    fn xlsx_headers_are_normalised() {
        let wb = load_workbook_bytes("visas.xlsx", fixture()).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Study visas", "Notes"]);

        let table = wb.sheet("Study visas").unwrap();
        assert_eq!(
            table.columns(),
            &["Status", "Visa", "2021", "Visa.1", "Unnamed: 4"]
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "2021"), Some(&Value::Number(12.0)));
        assert_eq!(table.get(1, "2021"), Some(&Value::Text("3".into())));
        assert_eq!(table.get(0, "Unnamed: 4"), Some(&Value::Missing));
    }

    #[test]
    fn csv_becomes_one_sheet_named_after_the_file() {
        let data = b"Nationality,Counts,\nChinese,100,\n,,\nIndian, 40 ,\n".to_vec();
        let wb = load_workbook_bytes("uploads/nationalities.CSV", data).unwrap();
        assert_eq!(wb.sheet_names(), vec!["nationalities"]);

        let table = wb.sheet("nationalities").unwrap();
        assert_eq!(table.columns(), &["Nationality", "Counts", "Unnamed: 2"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1, "Counts"), Some(&Value::Number(40.0)));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_workbook_bytes("notes.txt", b"hello".to_vec()).unwrap_err();
        assert!(matches!(err, DashboardError::UnsupportedFormat(_)));
        assert!(err.is_input_error());
    }

    #[test]
    fn corrupt_xlsx_is_an_input_error() {
        let err = load_workbook_bytes("broken.xlsx", b"not a zip".to_vec()).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("visas.xlsx");
        std::fs::write(&path, fixture()).unwrap();
        let wb = load_workbook(&path).unwrap();
        assert!(wb.sheet("Notes").is_some());
    }

    #[test]
    fn repeated_duplicates_do_not_collide() {
        let header = vec![
            Value::text("A"),
            Value::text("A"),
            Value::text("A.1"),
            Value::text("A"),
        ];
        assert_eq!(header_labels(&header), vec!["A", "A.1", "A.1.1", "A.2"]);
    }
}
