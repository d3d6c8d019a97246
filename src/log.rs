//! The evaluation log: an append-only, creation-ordered record of outcomes.
//!
//! Two record shapes share one log. Manual records carry a human rating and
//! note; automated records carry the expected answer, the rendered actual
//! result, and a pass/fail outcome.

use crate::compare::Outcome;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display format for record timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A human verdict on one model answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Positive,
    Negative,
}

impl Rating {
    pub fn symbol(&self) -> &'static str {
        match self {
            Rating::Positive => "👍",
            Rating::Negative => "👎",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "+" | "up" | "y" | "yes" | "good" | "positive" | "👍" => Ok(Rating::Positive),
            "-" | "down" | "n" | "no" | "bad" | "negative" | "👎" => Ok(Rating::Negative),
            other => Err(format!("unrecognized rating '{}'", other)),
        }
    }
}

/// Which schema a record follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMode {
    Manual,
    Automated,
}

/// Mode-specific fields of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordDetails {
    Automated {
        expected_response: String,
        actual_response: String,
        outcome: Outcome,
    },
    Manual {
        rating: Rating,
        #[serde(default)]
        note: String,
    },
}

/// One logged outcome for one model on one prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub timestamp: DateTime<Local>,
    /// Model label, e.g. "Model A".
    pub model: String,
    pub model_id: String,
    pub prompt: String,
    #[serde(flatten)]
    pub details: RecordDetails,
}

impl EvaluationRecord {
    /// A human rating, timestamped now.
    pub fn manual(
        model: impl Into<String>,
        model_id: impl Into<String>,
        prompt: impl Into<String>,
        rating: Rating,
        note: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            model: model.into(),
            model_id: model_id.into(),
            prompt: prompt.into(),
            details: RecordDetails::Manual {
                rating,
                note: note.into(),
            },
        }
    }

    /// An automated check, timestamped now.
    pub fn automated(
        model: impl Into<String>,
        model_id: impl Into<String>,
        prompt: impl Into<String>,
        expected_response: impl Into<String>,
        actual_response: impl Into<String>,
        outcome: Outcome,
    ) -> Self {
        Self {
            timestamp: Local::now(),
            model: model.into(),
            model_id: model_id.into(),
            prompt: prompt.into(),
            details: RecordDetails::Automated {
                expected_response: expected_response.into(),
                actual_response: actual_response.into(),
                outcome,
            },
        }
    }

    /// Override the timestamp.
    pub fn at(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn mode(&self) -> RecordMode {
        match self.details {
            RecordDetails::Manual { .. } => RecordMode::Manual,
            RecordDetails::Automated { .. } => RecordMode::Automated,
        }
    }

    pub fn rating(&self) -> Option<Rating> {
        match self.details {
            RecordDetails::Manual { rating, .. } => Some(rating),
            RecordDetails::Automated { .. } => None,
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.details {
            RecordDetails::Automated { outcome, .. } => Some(outcome),
            RecordDetails::Manual { .. } => None,
        }
    }

    pub fn timestamp_label(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Append-only sequence of evaluation records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationLog {
    records: Vec<EvaluationRecord>,
}

impl EvaluationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: EvaluationRecord) {
        self.records.push(record);
    }

    /// Records in creation order.
    pub fn records(&self) -> &[EvaluationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records newest first; records sharing a timestamp keep newest-appended first.
    pub fn history(&self) -> Vec<&EvaluationRecord> {
        let mut history: Vec<&EvaluationRecord> = self.records.iter().rev().collect();
        history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        history
    }

    pub fn records_of(&self, mode: RecordMode) -> impl Iterator<Item = &EvaluationRecord> {
        self.records.iter().filter(move |r| r.mode() == mode)
    }
}
