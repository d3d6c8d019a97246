//! Expected-answer parsing.
//!
//! Free-form answer text is turned into a canonical [`ExpectedValue`] by trying
//! each supported encoding in order: JSON table, CSV table, then the raw text
//! as a scalar.

use crate::table::Table;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Canonical comparable form of an expected answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExpectedValue {
    Scalar(String),
    Table(Table),
}

/// Which encoding an expected answer was recognized as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerFormat {
    Json,
    Csv,
    Scalar,
}

impl fmt::Display for AnswerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerFormat::Json => write!(f, "json"),
            AnswerFormat::Csv => write!(f, "csv"),
            AnswerFormat::Scalar => write!(f, "scalar"),
        }
    }
}

type Attempt = fn(&str) -> Option<Table>;

const ATTEMPTS: [(AnswerFormat, Attempt); 2] =
    [(AnswerFormat::Json, try_json), (AnswerFormat::Csv, try_csv)];

/// Parse an expected answer into its canonical form.
pub fn parse_expected(text: &str) -> ExpectedValue {
    parse_expected_with_format(text).0
}

/// Parse an expected answer, also reporting which encoding matched.
///
/// [`AnswerFormat::Scalar`] means no structured encoding matched and the text
/// was kept verbatim.
pub fn parse_expected_with_format(text: &str) -> (ExpectedValue, AnswerFormat) {
    for (format, attempt) in ATTEMPTS {
        if let Some(table) = attempt(text) {
            debug!(%format, rows = table.row_count(), "Parsed expected answer as table");
            return (ExpectedValue::Table(table), format);
        }
    }
    (ExpectedValue::Scalar(text.to_string()), AnswerFormat::Scalar)
}

/// JSON object of column arrays, or JSON array of row objects.
fn try_json(text: &str) -> Option<Table> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(map) => Table::from_column_map(&map),
        Value::Array(records) => Table::from_record_list(&records),
        _ => None,
    }
}

/// Comma-delimited text with a header row and at least one data row.
///
/// Headers and cells are kept exactly as written; surrounding whitespace is
/// part of the value.
fn try_csv(text: &str) -> Option<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .ok()?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() || headers.iter().any(String::is_empty) {
        return None;
    }
    let distinct: HashSet<&String> = headers.iter().collect();
    if distinct.len() != headers.len() {
        return None;
    }

    let mut table = Table::new(headers);
    for record in reader.records() {
        let record = record.ok()?;
        table.push_cells(record.iter().map(Some));
    }

    if table.row_count() == 0 {
        return None;
    }
    Some(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(value: &ExpectedValue) -> &Table {
        match value {
            ExpectedValue::Table(t) => t,
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_scalar_number() {
        let (value, format) = parse_expected_with_format("42");
        assert_eq!(value, ExpectedValue::Scalar("42".to_string()));
        assert_eq!(format, AnswerFormat::Scalar);
    }

    #[test]
    fn test_scalar_kept_verbatim() {
        assert_eq!(
            parse_expected("  about 1,200 orders "),
            ExpectedValue::Scalar("  about 1,200 orders ".to_string())
        );
    }

    #[test]
    fn test_json_object_of_arrays() {
        let (value, format) =
            parse_expected_with_format(r#"{"state": ["CA", "NY"], "count": [10, 3]}"#);
        assert_eq!(format, AnswerFormat::Json);
        let t = table(&value);
        assert_eq!(t.columns(), ["state", "count"]);
        assert_eq!(t.cell(0, "state"), Some("CA"));
        assert_eq!(t.cell(1, "count"), Some("3"));
    }

    #[test]
    fn test_json_list_of_rows() {
        let (value, format) =
            parse_expected_with_format(r#"[{"state": "CA", "count": 10}, {"state": "NY"}]"#);
        assert_eq!(format, AnswerFormat::Json);
        let t = table(&value);
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.cell(1, "count"), None);
    }

    #[test]
    fn test_csv_table() {
        let (value, format) = parse_expected_with_format("state,count\nCA,10\nNY,3\n");
        assert_eq!(format, AnswerFormat::Csv);
        let t = table(&value);
        assert_eq!(t.columns(), ["state", "count"]);
        assert_eq!(t.cell(0, "count"), Some("10"));
    }

    #[test]
    fn test_csv_quoted_field() {
        let value = parse_expected("name,total\n\"Smith, J\",5");
        assert_eq!(table(&value).cell(0, "name"), Some("Smith, J"));
    }

    #[test]
    fn test_csv_whitespace_is_kept() {
        let value = parse_expected("state, count\nCA, 10");
        let t = table(&value);
        assert_eq!(t.columns(), ["state", " count"]);
        assert_eq!(t.cell(0, " count"), Some(" 10"));

        let value = parse_expected("name\n  padded value  ");
        assert_eq!(table(&value).cell(0, "name"), Some("  padded value  "));
    }

    #[test]
    fn test_header_only_csv_is_scalar() {
        let value = parse_expected("Total revenue was 10, roughly");
        assert!(matches!(value, ExpectedValue::Scalar(_)));
    }

    #[test]
    fn test_ragged_csv_is_scalar() {
        let value = parse_expected("a,b\n1,2,3");
        assert!(matches!(value, ExpectedValue::Scalar(_)));
    }

    #[test]
    fn test_duplicate_csv_headers_is_scalar() {
        let value = parse_expected("count,count\n1,2");
        assert!(matches!(value, ExpectedValue::Scalar(_)));
    }

    #[test]
    fn test_json_scalar_object_falls_through() {
        let value = parse_expected(r#"{"count": 5}"#);
        assert!(matches!(value, ExpectedValue::Scalar(_)));
    }
}
