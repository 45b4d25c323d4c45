use crate::error::{DashboardError, Result};
use crate::reshape::NullPolicy;
use crate::table::Table;
use std::collections::HashMap;

/// One group of an aggregation: its key values and the summed value
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    pub keys: Vec<String>,
    pub total: f64,
}

/// Output of `group_sum`
///
/// Groups are kept in first-encounter order unless a sorting method is
/// applied.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregatedTable {
    pub key_columns: Vec<String>,
    pub value_column: String,
    pub groups: Vec<Group>,
}

impl AggregatedTable {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Sum over all groups
    pub fn total(&self) -> f64 {
        self.groups.iter().map(|g| g.total).sum()
    }

    /// Keeps groups with a strictly positive total (flow links)
    pub fn positive_only(mut self) -> Self {
        self.groups.retain(|g| g.total > 0.0);
        self
    }

    /// Largest `n` groups, descending; equal totals keep encounter order
    pub fn top_n(mut self, n: usize) -> Self {
        self.groups.sort_by(|a, b| b.total.total_cmp(&a.total));
        self.groups.truncate(n);
        self
    }

    /// Lexicographic order on the key tuple
    pub fn sorted_by_keys(mut self) -> Self {
        self.groups.sort_by(|a, b| a.keys.cmp(&b.keys));
        self
    }

    /// Distinct values of key column `idx`, in current group order
    pub fn distinct_keys(&self, idx: usize) -> Vec<String> {
        let mut seen = Vec::new();
        for group in &self.groups {
            if let Some(key) = group.keys.get(idx) {
                if !seen.contains(key) {
                    seen.push(key.clone());
                }
            }
        }
        seen
    }
}

/// Group-by-and-sum
///
/// Rows with a missing key are skipped. Values are coerced with zero-fill,
/// so every remaining row contributes to exactly one group.
///
/// # Errors
/// * `MissingColumn` if a key or the value column does not exist
///
/// # Examples
/// ```
/// use visa_dashboard::aggregate::group_sum;
/// use visa_dashboard::table::Table;
///
/// let table = Table::from_records(
///     &["Nationality", "Counts"],
///     &[&["Chinese", "100"], &["Indian", "40"], &["Chinese", "5"]],
/// );
/// let agg = group_sum(&table, &["Nationality"], "Counts").unwrap();
/// assert_eq!(agg.groups[0].keys, vec!["Chinese"]);
/// assert_eq!(agg.groups[0].total, 105.0);
/// ```
pub fn group_sum(table: &Table, keys: &[&str], value: &str) -> Result<AggregatedTable> {
    let key_idx = keys
        .iter()
        .map(|k| {
            table
                .column_index(k)
                .ok_or_else(|| DashboardError::MissingColumn(k.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;
    let value_idx = table
        .column_index(value)
        .ok_or_else(|| DashboardError::MissingColumn(value.to_string()))?;

    let mut groups: Vec<Group> = Vec::new();
    let mut positions: HashMap<Vec<String>, usize> = HashMap::new();

    for row in table.rows() {
        let Some(key) = key_idx
            .iter()
            .map(|i| row[*i].as_key())
            .collect::<Option<Vec<String>>>()
        else {
            continue;
        };
        let amount = NullPolicy::ZeroFill.coerce(&row[value_idx]).unwrap_or(0.0);

        match positions.get(&key) {
            Some(&pos) => groups[pos].total += amount,
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push(Group {
                    keys: key,
                    total: amount,
                });
            }
        }
    }

    Ok(AggregatedTable {
        key_columns: keys.iter().map(|k| k.to_string()).collect(),
        value_column: value.to_string(),
        groups,
    })
}

/// One row of a pivot: the index value and one optional value per wanted column
#[derive(Clone, Debug, PartialEq)]
pub struct PivotRow {
    pub index: String,
    pub values: Vec<Option<f64>>,
}

/// Long-to-wide pivot restricted to `wanted` pivot values
///
/// Rows whose pivot value is not in `wanted`, or whose index is missing, are
/// ignored. Unparsable cells become `None`. Index values keep encounter
/// order.
///
/// # Errors
/// * `MissingColumn` if `index`, `columns` or `values` does not exist
/// * `DuplicatePivotEntry` if an (index, pivot value) pair occurs twice
pub fn pivot(
    table: &Table,
    index: &str,
    columns: &str,
    values: &str,
    wanted: &[&str],
) -> Result<Vec<PivotRow>> {
    let column = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| DashboardError::MissingColumn(name.to_string()))
    };
    let (index_idx, columns_idx, values_idx) = (column(index)?, column(columns)?, column(values)?);

    let mut rows: Vec<PivotRow> = Vec::new();
    let mut filled: Vec<Vec<bool>> = Vec::new();

    for row in table.rows() {
        let Some(pivot_key) = row[columns_idx].as_key() else {
            continue;
        };
        let Some(slot) = wanted.iter().position(|w| *w == pivot_key) else {
            continue;
        };
        let Some(index_key) = row[index_idx].as_key() else {
            continue;
        };

        let pos = match rows.iter().position(|r| r.index == index_key) {
            Some(pos) => pos,
            None => {
                rows.push(PivotRow {
                    index: index_key.clone(),
                    values: vec![None; wanted.len()],
                });
                filled.push(vec![false; wanted.len()]);
                rows.len() - 1
            }
        };

        if filled[pos][slot] {
            return Err(DashboardError::DuplicatePivotEntry {
                index: index_key,
                column: pivot_key,
            });
        }
        filled[pos][slot] = true;
        rows[pos].values[slot] = row[values_idx].as_number();
    }

    Ok(rows)
}
