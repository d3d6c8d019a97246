//! Test cases and the capped test suite.
//!
//! Cases come from manual entry or from a CSV file with `Question` and
//! `Answer` columns. The suite never holds more than [`MAX_TEST_CASES`].

use crate::error::{EvalError, Result};
use crate::parser::{AnswerFormat, ExpectedValue, parse_expected_with_format};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Upper bound on cases in one suite.
pub const MAX_TEST_CASES: usize = 5;

const QUESTION_HEADER: &str = "Question";
const ANSWER_HEADER: &str = "Answer";

/// A question with its expected answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub question: String,
    /// Expected answer as entered.
    pub expected_raw: String,
    pub expected: ExpectedValue,
    /// Encoding the answer was recognized as.
    pub format: AnswerFormat,
}

impl TestCase {
    /// Create a case, parsing the expected answer.
    pub fn new(question: impl Into<String>, expected_raw: impl Into<String>) -> Self {
        let question = question.into();
        let expected_raw = expected_raw.into();
        let (expected, format) = parse_expected_with_format(&expected_raw);

        if format == AnswerFormat::Scalar && looks_structured(&expected_raw) {
            warn!(
                question = %question,
                "Expected answer matched no table format, comparing it as a single value"
            );
        }

        Self {
            question,
            expected_raw,
            expected,
            format,
        }
    }
}

/// Multi-line or bracketed text that still fell back to a scalar.
fn looks_structured(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.contains('\n') || trimmed.starts_with('{') || trimmed.starts_with('[')
}

/// An ordered suite of at most [`MAX_TEST_CASES`] cases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestSuite {
    cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn remaining_capacity(&self) -> usize {
        MAX_TEST_CASES - self.cases.len()
    }

    /// Add one case, rejecting it if the suite is full.
    pub fn push(&mut self, case: TestCase) -> Result<()> {
        if self.cases.len() >= MAX_TEST_CASES {
            warn!(capacity = MAX_TEST_CASES, "Test suite full, case rejected");
            return Err(EvalError::SuiteFull {
                capacity: MAX_TEST_CASES,
            });
        }
        self.cases.push(case);
        Ok(())
    }

    /// Add several cases, all or none.
    pub fn extend(&mut self, cases: Vec<TestCase>) -> Result<()> {
        if cases.len() > self.remaining_capacity() {
            warn!(
                incoming = cases.len(),
                remaining = self.remaining_capacity(),
                "Not enough room in test suite, batch rejected"
            );
            return Err(EvalError::SuiteFull {
                capacity: MAX_TEST_CASES,
            });
        }
        self.cases.extend(cases);
        Ok(())
    }

    /// Remove the case at `index`.
    pub fn remove(&mut self, index: usize) -> Result<TestCase> {
        if index >= self.cases.len() {
            return Err(EvalError::IndexOutOfRange {
                index,
                len: self.cases.len(),
            });
        }
        Ok(self.cases.remove(index))
    }

    pub fn clear(&mut self) {
        self.cases.clear();
    }

    /// Import cases from CSV text into the suite, all or none.
    pub fn import_csv<R: Read>(&mut self, reader: R) -> Result<usize> {
        let cases = read_test_cases(reader)?;
        let count = cases.len();
        self.extend(cases)?;
        info!(count, "Imported test cases");
        Ok(count)
    }

    /// Import cases from a CSV file into the suite, all or none.
    pub fn import_csv_file(&mut self, path: &Path) -> Result<usize> {
        let file = std::fs::File::open(path).map_err(|e| EvalError::io(path, e))?;
        self.import_csv(file)
    }
}

/// Read test cases from CSV text with `Question` and `Answer` headers.
///
/// Any missing header or malformed row rejects the whole input.
pub fn read_test_cases<R: Read>(reader: R) -> Result<Vec<TestCase>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (Some(question_idx), Some(answer_idx)) = (position(QUESTION_HEADER), position(ANSWER_HEADER))
    else {
        return Err(EvalError::Import(format!(
            "CSV must have '{}' and '{}' columns",
            QUESTION_HEADER, ANSWER_HEADER
        )));
    };

    let mut cases = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let question = record.get(question_idx).unwrap_or_default();
        let answer = record.get(answer_idx).unwrap_or_default();
        debug!(row = line + 1, question, "Read test case");
        cases.push(TestCase::new(question, answer));
    }
    Ok(cases)
}
