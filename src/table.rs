//! Tabular values shared by expected answers and query results.
//!
//! Cells are held in their canonical text form: strings verbatim, numbers in
//! their JSON textual form, booleans as `true`/`false`. A null or missing cell
//! is simply absent from its row.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// One table row: column name to canonical cell text.
pub type Row = BTreeMap<String, String>;

/// An ordered table with an explicit column sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given column sequence.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row given as cells in column order; `None` marks an absent cell.
    pub fn push_cells<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let row = self
            .columns
            .iter()
            .zip(cells)
            .filter_map(|(column, cell)| cell.map(|c| (column.clone(), c.into())))
            .collect();
        self.rows.push(row);
    }

    /// Build a table from a JSON object mapping each column to a sequence of values.
    ///
    /// Returns `None` if the object is empty or any value is not an array.
    pub fn from_column_map(map: &serde_json::Map<String, Value>) -> Option<Self> {
        if map.is_empty() {
            return None;
        }

        let mut arrays = Vec::with_capacity(map.len());
        for value in map.values() {
            arrays.push(value.as_array()?);
        }

        let row_count = arrays.iter().map(|a| a.len()).max().unwrap_or(0);
        let mut table = Table::new(map.keys().cloned().collect());
        for i in 0..row_count {
            table.push_cells(arrays.iter().map(|a| a.get(i).and_then(cell_text)));
        }
        Some(table)
    }

    /// Build a table from a JSON sequence of row objects.
    ///
    /// Columns are the union of keys in first-appearance order. Returns `None`
    /// if the list is empty, holds a non-object, or has no keys at all.
    pub fn from_record_list(records: &[Value]) -> Option<Self> {
        let (columns, cells) = records_to_cells(records)?;
        let mut table = Table::new(columns);
        for row in cells {
            table.push_cells(row.iter().map(cell_text));
        }
        Some(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// The column name and value of a one-row, one-column table.
    pub fn single_cell(&self) -> Option<(&str, Option<&str>)> {
        if self.row_count() != 1 || self.column_count() != 1 {
            return None;
        }
        let column = self.columns[0].as_str();
        Some((column, self.rows[0].get(column).map(String::as_str)))
    }

    /// Look up one cell by row index and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }
}

/// Canonical text of a JSON cell; `None` for null.
pub fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Split a list of JSON row objects into a column sequence and positional cells.
///
/// Missing keys become `Value::Null`.
pub fn records_to_cells(records: &[Value]) -> Option<(Vec<String>, Vec<Vec<Value>>)> {
    if records.is_empty() {
        return None;
    }

    let mut columns: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for record in records {
        for key in record.as_object()?.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
    }
    if columns.is_empty() {
        return None;
    }

    let rows = records
        .iter()
        .filter_map(Value::as_object)
        .map(|obj| {
            columns
                .iter()
                .map(|c| obj.get(c).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Some((columns, rows))
}

/// Turn a possibly-qualified column name into its display form.
///
/// Keeps the last `.`-separated segment and turns `_` into spaces:
/// `order_items.total_sale_price` becomes `total sale price`.
pub fn normalize_column_name(raw: &str) -> String {
    raw.rsplit('.').next().unwrap_or(raw).replace('_', " ")
}

/// `raw`, or `raw (2)`, `raw (3)`, ... if that is taken too.
fn unique_column_name(raw: &str, taken: &[String]) -> String {
    let mut candidate = raw.to_string();
    let mut n = 1;
    while taken.contains(&candidate) {
        n += 1;
        candidate = format!("{} ({})", raw, n);
    }
    candidate
}

/// Whether a raw result column is an engine helper (raw/pivot/sort) rather than data.
pub fn is_helper_column(raw: &str) -> bool {
    let lower = raw.to_lowercase();
    ["raw", "pivot", "sort"].iter().any(|k| lower.contains(k))
}

/// Outcome of running a query against the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ActualResult {
    /// The query returned at least one row.
    Rows(Table),
    /// The query ran but returned nothing.
    Empty,
    /// Generation or execution failed.
    Failed(String),
}

impl ActualResult {
    /// Build a result from raw engine columns and positional rows.
    ///
    /// Helper columns are dropped and the remaining names normalized. When two
    /// columns normalize to the same name the later one keeps its raw name,
    /// numbered if even that is taken, so no column is lost.
    pub fn from_raw(columns: &[String], rows: &[Vec<Value>]) -> Self {
        if rows.is_empty() {
            return ActualResult::Empty;
        }

        let mut kept = Vec::new();
        let mut names: Vec<String> = Vec::new();
        for (idx, raw) in columns.iter().enumerate() {
            if is_helper_column(raw) {
                debug!(column = %raw, "Dropping helper column");
                continue;
            }
            let mut name = normalize_column_name(raw);
            if names.contains(&name) {
                warn!(column = %raw, normalized = %name, "Normalized column name collides, keeping raw name");
                name = unique_column_name(raw, &names);
            }
            kept.push(idx);
            names.push(name);
        }

        let mut table = Table::new(names);
        for row in rows {
            table.push_cells(kept.iter().map(|&i| row.get(i).and_then(cell_text)));
        }
        ActualResult::Rows(table)
    }

    /// Build a result from a list of JSON row objects.
    pub fn from_records(records: &[Value]) -> Self {
        match records_to_cells(records) {
            Some((columns, rows)) => Self::from_raw(&columns, &rows),
            None => ActualResult::Empty,
        }
    }

    pub fn table(&self) -> Option<&Table> {
        match self {
            ActualResult::Rows(table) => Some(table),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ActualResult::Failed(_))
    }
}
