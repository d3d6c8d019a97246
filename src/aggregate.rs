//! Per-model summaries over evaluation records.

use crate::compare::Outcome;
use crate::error::{EvalError, Result};
use crate::format::render_grid;
use crate::log::{EvaluationRecord, Rating, RecordMode};
use serde::Serialize;
use std::collections::BTreeMap;

/// Rating counts for one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualSummary {
    pub model: String,
    pub total: usize,
    pub positive: usize,
    pub negative: usize,
    pub net_positive: String,
}

/// Pass/fail counts for one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutomatedSummary {
    pub model: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: String,
}

/// Summary of one record set, in the schema its records follow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "models", rename_all = "lowercase")]
pub enum Summary {
    Manual(Vec<ManualSummary>),
    Automated(Vec<AutomatedSummary>),
}

/// `count / total` as a percentage with one decimal, e.g. `66.7%`.
pub fn percentage_label(count: usize, total: usize) -> String {
    let pct = if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    };
    format!("{:.1}%", pct)
}

/// Summarize a record set, picking the schema from the records themselves.
///
/// Any record with an outcome selects the automated schema. A set that mixes
/// both schemas is rejected; an empty set yields an empty manual summary.
pub fn aggregate<'a, I>(records: I) -> Result<Summary>
where
    I: IntoIterator<Item = &'a EvaluationRecord>,
{
    let records: Vec<&EvaluationRecord> = records.into_iter().collect();
    let automated = records
        .iter()
        .filter(|r| r.mode() == RecordMode::Automated)
        .count();

    if automated == 0 {
        Ok(Summary::Manual(aggregate_manual(records)))
    } else if automated == records.len() {
        Ok(Summary::Automated(aggregate_automated(records)))
    } else {
        Err(EvalError::MixedRecordModes)
    }
}

/// Rating summaries per model label. Records without a rating are skipped.
pub fn aggregate_manual<'a, I>(records: I) -> Vec<ManualSummary>
where
    I: IntoIterator<Item = &'a EvaluationRecord>,
{
    let mut groups: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for record in records {
        let Some(rating) = record.rating() else {
            continue;
        };
        let entry = groups.entry(record.model.as_str()).or_default();
        match rating {
            Rating::Positive => entry.0 += 1,
            Rating::Negative => entry.1 += 1,
        }
    }

    groups
        .into_iter()
        .map(|(model, (positive, negative))| {
            let total = positive + negative;
            ManualSummary {
                model: model.to_string(),
                total,
                positive,
                negative,
                net_positive: percentage_label(positive, total),
            }
        })
        .collect()
}

/// Pass/fail summaries per model label. Records without an outcome are skipped.
pub fn aggregate_automated<'a, I>(records: I) -> Vec<AutomatedSummary>
where
    I: IntoIterator<Item = &'a EvaluationRecord>,
{
    let mut groups: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for record in records {
        let Some(outcome) = record.outcome() else {
            continue;
        };
        let entry = groups.entry(record.model.as_str()).or_default();
        match outcome {
            Outcome::Pass => entry.0 += 1,
            Outcome::Fail => entry.1 += 1,
        }
    }

    groups
        .into_iter()
        .map(|(model, (passed, failed))| {
            let total = passed + failed;
            AutomatedSummary {
                model: model.to_string(),
                total,
                passed,
                failed,
                pass_rate: percentage_label(passed, total),
            }
        })
        .collect()
}

fn display_label(model: &str) -> String {
    if model.is_empty() {
        "(unlabeled)".to_string()
    } else {
        model.to_string()
    }
}

/// Render a summary as a text table.
pub fn render_summary(summary: &Summary) -> String {
    let (headers, rows): (Vec<&str>, Vec<Vec<String>>) = match summary {
        Summary::Manual(models) => (
            vec!["Model", "Total Evaluations", "👍 Count", "👎 Count", "Net Positive %"],
            models
                .iter()
                .map(|m| {
                    vec![
                        display_label(&m.model),
                        m.total.to_string(),
                        m.positive.to_string(),
                        m.negative.to_string(),
                        m.net_positive.clone(),
                    ]
                })
                .collect(),
        ),
        Summary::Automated(models) => (
            vec!["Model", "Total Tests", "Pass", "Fail", "Pass Rate"],
            models
                .iter()
                .map(|m| {
                    vec![
                        display_label(&m.model),
                        m.total.to_string(),
                        m.passed.to_string(),
                        m.failed.to_string(),
                        m.pass_rate.clone(),
                    ]
                })
                .collect(),
        ),
    };

    let headers: Vec<String> = headers.into_iter().map(str::to_string).collect();
    render_grid(&headers, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auto(model: &str, outcome: Outcome) -> EvaluationRecord {
        EvaluationRecord::automated(model, "id", "q", "e", "a", outcome)
    }

    fn rated(model: &str, rating: Rating) -> EvaluationRecord {
        EvaluationRecord::manual(model, "id", "q", rating, "")
    }

    #[test]
    fn test_automated_summary() {
        let records = vec![
            auto("A", Outcome::Pass),
            auto("A", Outcome::Pass),
            auto("A", Outcome::Fail),
            auto("B", Outcome::Pass),
        ];

        let summary = aggregate(&records).unwrap();
        let Summary::Automated(models) = summary else {
            panic!("expected automated summary");
        };
        assert_eq!(
            models,
            vec![
                AutomatedSummary {
                    model: "A".into(),
                    total: 3,
                    passed: 2,
                    failed: 1,
                    pass_rate: "66.7%".into(),
                },
                AutomatedSummary {
                    model: "B".into(),
                    total: 1,
                    passed: 1,
                    failed: 0,
                    pass_rate: "100.0%".into(),
                },
            ]
        );
    }

    #[test]
    fn test_manual_summary() {
        let records = vec![
            rated("Model A", Rating::Positive),
            rated("Model A", Rating::Negative),
            rated("Model B", Rating::Negative),
        ];

        let Summary::Manual(models) = aggregate(&records).unwrap() else {
            panic!("expected manual summary");
        };
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].total, 2);
        assert_eq!(models[0].positive, 1);
        assert_eq!(models[0].net_positive, "50.0%");
        assert_eq!(models[1].negative, 1);
        assert_eq!(models[1].net_positive, "0.0%");
    }

    #[test]
    fn test_unknown_labels_form_their_own_group() {
        let records = vec![
            auto("", Outcome::Fail),
            auto("Model A", Outcome::Pass),
            auto("Model Z", Outcome::Pass),
        ];
        let models = aggregate_automated(&records);
        let labels: Vec<&str> = models.iter().map(|m| m.model.as_str()).collect();
        assert_eq!(labels, ["", "Model A", "Model Z"]);
        assert!(render_summary(&Summary::Automated(models)).contains("(unlabeled)"));
    }

    #[test]
    fn test_mixed_modes_rejected() {
        let records = vec![auto("A", Outcome::Pass), rated("A", Rating::Positive)];
        assert!(matches!(
            aggregate(&records),
            Err(EvalError::MixedRecordModes)
        ));
    }

    #[test]
    fn test_empty_records() {
        let records: Vec<EvaluationRecord> = Vec::new();
        assert_eq!(aggregate(&records).unwrap(), Summary::Manual(Vec::new()));
    }

    #[test]
    fn test_percentage_label() {
        assert_eq!(percentage_label(1, 3), "33.3%");
        assert_eq!(percentage_label(2, 3), "66.7%");
        assert_eq!(percentage_label(0, 0), "0.0%");
    }

    #[test]
    fn test_render_summary() {
        let records = vec![rated("Model A", Rating::Positive)];
        let text = render_summary(&aggregate(&records).unwrap());
        assert!(text.contains("Net Positive %"));
        assert!(text.contains("100.0%"));
    }
}
