//! Comparison of actual query results against expected answers.
//!
//! Table comparison ignores both row order and column order. Each row is
//! canonicalized as its sorted `(column, value)` pairs, and the canonical rows
//! of both sides are matched either as a multiset (default) or as a set.

use crate::error::EvalError;
use crate::format::render_table;
use crate::parser::ExpectedValue;
use crate::table::{ActualResult, Row, Table};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// How canonical rows are matched once row counts and column sets agree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowMatching {
    /// Every distinct row must occur the same number of times on both sides.
    #[default]
    Multiset,
    /// Distinct rows are compared as sets, so duplicate rows collapse.
    Set,
}

impl FromStr for RowMatching {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "multiset" => Ok(RowMatching::Multiset),
            "set" => Ok(RowMatching::Set),
            other => Err(EvalError::Config(format!(
                "Unknown row matching '{}', expected 'multiset' or 'set'",
                other
            ))),
        }
    }
}

/// Pass/fail outcome of an automated check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => write!(f, "pass"),
            Outcome::Fail => write!(f, "fail"),
        }
    }
}

/// Why two well-formed values did not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    RowCount { actual: usize, expected: usize },
    Columns { missing: Vec<String>, unexpected: Vec<String> },
    Rows,
    Value { actual: Option<String>, expected: String },
}

/// Detailed result of comparing an actual result with an expected value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Match,
    Mismatch(Mismatch),
    /// A scalar was expected but the result did not hold exactly one cell.
    ShapeMismatch { rows: usize, columns: usize },
    /// The query produced no result to compare.
    ExecutionFailed(String),
    /// One side was malformed; treated as a failure.
    Error(String),
}

impl Comparison {
    pub fn outcome(&self) -> Outcome {
        match self {
            Comparison::Match => Outcome::Pass,
            _ => Outcome::Fail,
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome() == Outcome::Pass
    }

    /// Failures that point at the test case or the harness rather than the model.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Comparison::ShapeMismatch { .. } | Comparison::Error(_)
        )
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Match => write!(f, "match"),
            Comparison::Mismatch(Mismatch::RowCount { actual, expected }) => {
                write!(f, "row count {} != expected {}", actual, expected)
            }
            Comparison::Mismatch(Mismatch::Columns {
                missing,
                unexpected,
            }) => write!(
                f,
                "columns differ (missing: [{}], unexpected: [{}])",
                missing.join(", "),
                unexpected.join(", ")
            ),
            Comparison::Mismatch(Mismatch::Rows) => write!(f, "row values differ"),
            Comparison::Mismatch(Mismatch::Value { actual, expected }) => write!(
                f,
                "value '{}' != expected '{}'",
                actual.as_deref().unwrap_or(""),
                expected
            ),
            Comparison::ShapeMismatch { rows, columns } => write!(
                f,
                "expected a single value but result has {} row(s) x {} column(s)",
                rows, columns
            ),
            Comparison::ExecutionFailed(reason) => write!(f, "no result: {}", reason),
            Comparison::Error(reason) => write!(f, "comparison error: {}", reason),
        }
    }
}

/// Compares actual results with expected values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Comparator {
    row_matching: RowMatching,
}

impl Comparator {
    pub fn new(row_matching: RowMatching) -> Self {
        Self { row_matching }
    }

    pub fn row_matching(&self) -> RowMatching {
        self.row_matching
    }

    /// Compare an actual result against an expected value.
    pub fn compare(&self, actual: &ActualResult, expected: &ExpectedValue) -> Comparison {
        let comparison = match (actual, expected) {
            (ActualResult::Failed(reason), _) => Comparison::ExecutionFailed(reason.clone()),
            (ActualResult::Empty, ExpectedValue::Table(table)) => {
                if table.row_count() == 0 {
                    Comparison::Match
                } else {
                    Comparison::Mismatch(Mismatch::RowCount {
                        actual: 0,
                        expected: table.row_count(),
                    })
                }
            }
            (ActualResult::Empty, ExpectedValue::Scalar(_)) => {
                Comparison::ShapeMismatch { rows: 0, columns: 0 }
            }
            (ActualResult::Rows(actual), ExpectedValue::Table(expected)) => {
                self.compare_tables(actual, expected)
            }
            (ActualResult::Rows(actual), ExpectedValue::Scalar(expected)) => {
                compare_scalar(actual, expected)
            }
        };

        if comparison.is_warning() {
            warn!(%comparison, "Comparison could not be evaluated cleanly");
        }
        comparison
    }

    fn compare_tables(&self, actual: &Table, expected: &Table) -> Comparison {
        if let Err(reason) = check_well_formed(expected, "expected") {
            return Comparison::Error(reason);
        }
        if let Err(reason) = check_well_formed(actual, "actual") {
            return Comparison::Error(reason);
        }

        if actual.row_count() != expected.row_count() {
            return Comparison::Mismatch(Mismatch::RowCount {
                actual: actual.row_count(),
                expected: expected.row_count(),
            });
        }

        let actual_columns: BTreeSet<&str> = actual.columns().iter().map(String::as_str).collect();
        let expected_columns: BTreeSet<&str> =
            expected.columns().iter().map(String::as_str).collect();
        if actual_columns != expected_columns {
            return Comparison::Mismatch(Mismatch::Columns {
                missing: expected_columns
                    .difference(&actual_columns)
                    .map(|c| c.to_string())
                    .collect(),
                unexpected: actual_columns
                    .difference(&expected_columns)
                    .map(|c| c.to_string())
                    .collect(),
            });
        }

        let same_rows = match self.row_matching {
            RowMatching::Multiset => row_counts(actual.rows()) == row_counts(expected.rows()),
            RowMatching::Set => {
                let a: BTreeSet<&Row> = actual.rows().iter().collect();
                let e: BTreeSet<&Row> = expected.rows().iter().collect();
                a == e
            }
        };

        if same_rows {
            Comparison::Match
        } else {
            Comparison::Mismatch(Mismatch::Rows)
        }
    }
}

/// Compare with the default comparator.
pub fn compare(actual: &ActualResult, expected: &ExpectedValue) -> Comparison {
    Comparator::default().compare(actual, expected)
}

/// Text projection of an actual result, as stored in evaluation records.
pub fn render_actual(actual: &ActualResult) -> String {
    match actual {
        ActualResult::Rows(table) => render_table(table),
        ActualResult::Empty => "(no rows)".to_string(),
        ActualResult::Failed(reason) => format!("(failed: {})", reason),
    }
}

fn compare_scalar(actual: &Table, expected: &str) -> Comparison {
    match actual.single_cell() {
        Some((_, value)) if value == Some(expected) => Comparison::Match,
        Some((_, value)) => Comparison::Mismatch(Mismatch::Value {
            actual: value.map(str::to_string),
            expected: expected.to_string(),
        }),
        None => Comparison::ShapeMismatch {
            rows: actual.row_count(),
            columns: actual.column_count(),
        },
    }
}

fn row_counts(rows: &[Row]) -> BTreeMap<&Row, usize> {
    let mut counts = BTreeMap::new();
    for row in rows {
        *counts.entry(row).or_insert(0) += 1;
    }
    counts
}

/// A table needs at least one column and no cells outside its column sequence.
fn check_well_formed(table: &Table, side: &str) -> std::result::Result<(), String> {
    if table.column_count() == 0 {
        return Err(format!("{} table has no columns", side));
    }
    let columns: BTreeSet<&str> = table.columns().iter().map(String::as_str).collect();
    for (idx, row) in table.rows().iter().enumerate() {
        if let Some(stray) = row.keys().find(|k| !columns.contains(k.as_str())) {
            return Err(format!(
                "{} row {} has a cell for unknown column '{}'",
                side, idx, stray
            ));
        }
    }
    Ok(())
}
