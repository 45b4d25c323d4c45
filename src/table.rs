use serde::Serialize;
use std::fmt;

/// A single cell value after loading
///
/// Spreadsheet cells are collapsed into three shapes: text, numbers and
/// missing cells. Dates, booleans and durations are kept as their text form.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Number(f64),
    Missing,
}

impl Value {
    /// Builds a text value, mapping blank strings to `Missing`
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.trim().is_empty() {
            Value::Missing
        } else {
            Value::Text(s)
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Numeric coercion
    ///
    /// Numbers pass through; text is trimmed and parsed as a float.
    /// Everything else (including `NaN` text) is unparsable.
    ///
    /// # Examples
    /// ```
    /// use visa_dashboard::table::Value;
    ///
    /// assert_eq!(Value::text("200").as_number(), Some(200.0));
    /// assert_eq!(Value::text(" 12.5 ").as_number(), Some(12.5));
    /// assert_eq!(Value::text("z").as_number(), None);
    /// assert_eq!(Value::Missing.as_number(), None);
    /// ```
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) if n.is_finite() => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Textual form used for grouping, or `None` for missing cells
    pub fn as_key(&self) -> Option<String> {
        match self {
            Value::Missing => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Missing => Ok(()),
        }
    }
}

/// Formats a number without a trailing `.0` for integral values
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A rectangular sheet: named columns and rows of values
///
/// Every row has exactly one value per column; `push_row` pads short rows
/// with `Missing` and drops extra cells.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    /// Builds a table from string literals, mostly for tests and fixtures
    ///
    /// Cells that parse as numbers become `Value::Number`, empty strings
    /// become `Value::Missing`.
    pub fn from_records(columns: &[&str], records: &[&[&str]]) -> Self {
        let mut table = Table::new(columns.iter().map(|c| c.to_string()).collect());
        for record in records {
            let row = record
                .iter()
                .map(|cell| match cell.trim().parse::<f64>() {
                    Ok(n) => Value::Number(n),
                    Err(_) => Value::text(*cell),
                })
                .collect();
            table.push_row(row);
        }
        table
    }

    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Missing);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// True when every named column exists
    pub fn has_columns(&self, names: &[&str]) -> bool {
        names.iter().all(|name| self.has_column(name))
    }

    /// Value at `row` in column `name`
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        let col = self.column_index(name)?;
        self.rows.get(row)?.get(col)
    }

    /// New table containing only the rows accepted by `keep`
    pub fn filter_rows<F>(&self, keep: F) -> Table
    where
        F: Fn(&[Value]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|row| keep(row)).cloned().collect(),
        }
    }

    /// Rows whose `column` holds one of `allowed` (compared textually)
    ///
    /// Returns an empty table when the column does not exist.
    pub fn filter_in(&self, column: &str, allowed: &[String]) -> Table {
        match self.column_index(column) {
            Some(idx) => self.filter_rows(|row| {
                row[idx]
                    .as_key()
                    .is_some_and(|key| allowed.iter().any(|a| a == &key))
            }),
            None => Table::new(self.columns.clone()),
        }
    }

    /// First `n` rows, rendered as display strings
    pub fn head(&self, n: usize) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .take(n)
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect()
    }
}

/// One named sheet of a workbook
#[derive(Clone, Debug, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub table: Table,
}

/// All sheets of one uploaded file, in workbook order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Workbook { sheets: Vec::new() }
    }

    /// Adds a sheet, replacing any existing sheet with the same name
    pub fn insert(&mut self, name: impl Into<String>, table: Table) {
        let name = name.into();
        match self.sheets.iter_mut().find(|s| s.name == name) {
            Some(existing) => existing.table = table,
            None => self.sheets.push(Sheet { name, table }),
        }
    }

    pub fn sheet(&self, name: &str) -> Option<&Table> {
        self.sheets.iter().find(|s| s.name == name).map(|s| &s.table)
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// First sheet from `candidates` that exists in this workbook
    pub fn first_present<'a>(&'a self, candidates: &'a [String]) -> Option<(&'a str, &'a Table)> {
        candidates
            .iter()
            .find_map(|name| self.sheet(name).map(|table| (name.as_str(), table)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_row_pads_and_truncates() {
        let mut table = Table::new(vec!["A".into(), "B".into()]);
        table.push_row(vec![Value::Number(1.0)]);
        table.push_row(vec![
            Value::Number(1.0),
            Value::Number(2.0),
            Value::Number(3.0),
        ]);
        assert_eq!(table.rows()[0], vec![Value::Number(1.0), Value::Missing]);
        assert_eq!(table.rows()[1].len(), 2);
    }

    #[test]
    fn keys_render_integral_numbers_without_fraction() {
        assert_eq!(Value::Number(2021.0).as_key().as_deref(), Some("2021"));
        assert_eq!(Value::Number(0.5).as_key().as_deref(), Some("0.5"));
        assert_eq!(Value::Missing.as_key(), None);
    }

    #[test]
    fn filter_in_keeps_listed_values_only() {
        let table = Table::from_records(
            &["Visa", "2021"],
            &[&["Family", "1"], &["Study", "2"], &["Work Dependant", "3"]],
        );
        let allowed = vec!["Family".to_string(), "Work Dependant".to_string()];
        let filtered = table.filter_in("Visa", &allowed);
        assert_eq!(filtered.len(), 2);
        assert!(table.filter_in("Nope", &allowed).is_empty());
    }

    #[test]
    fn workbook_first_present_follows_candidate_order() {
        let mut wb = Workbook::new();
        wb.insert("Study only Nationality", Table::default());
        wb.insert("Study-related Nationality", Table::default());
        let candidates = vec![
            "Study-related Nationality".to_string(),
            "Study only Nationality".to_string(),
        ];
        let (name, _) = wb.first_present(&candidates).unwrap();
        assert_eq!(name, "Study-related Nationality");
        assert_eq!(
            wb.sheet_names(),
            vec!["Study only Nationality", "Study-related Nationality"]
        );
    }
}
