//! Batch runner: drives a test suite through both models.
//!
//! Test cases run one after another. Within a case the two models are queried
//! concurrently, each result is compared with the expected answer, and one
//! automated record per model is appended to the log.

use crate::compare::{Comparator, Outcome, render_actual};
use crate::config::ModelsConfig;
use crate::log::{EvaluationLog, EvaluationRecord};
use crate::query::{QueryExecutor, QueryGenerator, run_prompt};
use crate::suite::{TestCase, TestSuite};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub const MODEL_A_LABEL: &str = "Model A";
pub const MODEL_B_LABEL: &str = "Model B";

/// A model under evaluation: its display label and service identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSlot {
    pub label: String,
    pub id: String,
}

impl ModelSlot {
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
        }
    }

    /// The "Model A" / "Model B" pair from configuration.
    pub fn pair(models: &ModelsConfig) -> [ModelSlot; 2] {
        [
            ModelSlot::new(MODEL_A_LABEL, &models.model_a),
            ModelSlot::new(MODEL_B_LABEL, &models.model_b),
        ]
    }
}

/// How far a batch run has got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Completed share in `0.0..=1.0`; an empty run counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Outcome for one model on one test case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseOutcome {
    pub case: usize,
    pub question: String,
    pub model: String,
    pub outcome: Outcome,
    pub detail: String,
    /// Shape mismatch or comparison error rather than a plain wrong answer.
    pub warning: bool,
}

/// Everything a batch run produced besides the log records.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub total_cases: usize,
    pub outcomes: Vec<CaseOutcome>,
    pub total_time_secs: f64,
}

impl BatchReport {
    pub fn warnings(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.outcomes.iter().filter(|o| o.warning)
    }
}

/// Runs test suites against two models.
pub struct BatchRunner {
    generator: Arc<dyn QueryGenerator>,
    executor: Arc<dyn QueryExecutor>,
    models: [ModelSlot; 2],
    comparator: Comparator,
}

impl BatchRunner {
    pub fn new(
        generator: Arc<dyn QueryGenerator>,
        executor: Arc<dyn QueryExecutor>,
        models: [ModelSlot; 2],
        comparator: Comparator,
    ) -> Self {
        Self {
            generator,
            executor,
            models,
            comparator,
        }
    }

    pub fn models(&self) -> &[ModelSlot; 2] {
        &self.models
    }

    /// Run every case in order, appending two records per case to `log`.
    ///
    /// `on_progress` is called after each case and once more at the end with
    /// the run complete. Failures for one model never stop the run.
    pub async fn run<F>(
        &self,
        suite: &TestSuite,
        log: &mut EvaluationLog,
        mut on_progress: F,
    ) -> BatchReport
    where
        F: FnMut(Progress),
    {
        let start = Instant::now();
        let total = suite.len();
        let mut outcomes = Vec::with_capacity(total * self.models.len());

        info!(cases = total, "Starting batch run");

        for (index, case) in suite.cases().iter().enumerate() {
            for (slot, record, outcome) in self.run_case(index, case).await {
                if outcome.warning {
                    warn!(case = index + 1, model = %slot.label, detail = %outcome.detail, "Check needs attention");
                }
                log.append(record);
                outcomes.push(outcome);
            }

            if index + 1 < total {
                on_progress(Progress {
                    completed: index + 1,
                    total,
                });
            }
        }
        on_progress(Progress {
            completed: total,
            total,
        });

        let report = BatchReport {
            total_cases: total,
            outcomes,
            total_time_secs: start.elapsed().as_secs_f64(),
        };
        info!(
            cases = total,
            passed = report.outcomes.iter().filter(|o| o.outcome == Outcome::Pass).count(),
            "Batch run finished"
        );
        report
    }

    async fn run_case(
        &self,
        index: usize,
        case: &TestCase,
    ) -> Vec<(&ModelSlot, EvaluationRecord, CaseOutcome)> {
        let [a, b] = &self.models;
        let (run_a, run_b) = tokio::join!(
            run_prompt(self.generator.as_ref(), self.executor.as_ref(), &a.id, &case.question),
            run_prompt(self.generator.as_ref(), self.executor.as_ref(), &b.id, &case.question),
        );

        [(a, run_a), (b, run_b)]
            .into_iter()
            .map(|(slot, run)| {
                let comparison = self.comparator.compare(&run.result, &case.expected);
                let record = EvaluationRecord::automated(
                    &slot.label,
                    &slot.id,
                    &case.question,
                    &case.expected_raw,
                    render_actual(&run.result),
                    comparison.outcome(),
                );
                let outcome = CaseOutcome {
                    case: index,
                    question: case.question.clone(),
                    model: slot.label.clone(),
                    outcome: comparison.outcome(),
                    detail: comparison.to_string(),
                    warning: comparison.is_warning(),
                };
                (slot, record, outcome)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Summary, aggregate};
    use crate::log::RecordMode;
    use crate::query::testing::{FakeQueryService, single};

    fn runner(service: FakeQueryService) -> BatchRunner {
        let service = Arc::new(service);
        BatchRunner::new(
            service.clone(),
            service,
            [ModelSlot::new("Model A", "a"), ModelSlot::new("Model B", "b")],
            Comparator::default(),
        )
    }

    #[tokio::test]
    async fn test_batch_run_records_each_model() {
        let service = FakeQueryService::new()
            .with_result("a", "How many orders?", single("count", "42"))
            .with_result("b", "How many orders?", single("count", "41"))
            .with_result("a", "Orders by state", single("count", "1"))
            .with_result("b", "Orders by state", single("count", "1"));
        let runner = runner(service);

        let mut suite = TestSuite::new();
        suite.push(TestCase::new("How many orders?", "42")).unwrap();
        suite.push(TestCase::new("Orders by state", "state,count\nCA,10")).unwrap();

        let mut log = EvaluationLog::new();
        let mut progress = Vec::new();
        let report = runner.run(&suite, &mut log, |p| progress.push(p.fraction())).await;

        assert_eq!(report.total_cases, 2);
        assert_eq!(log.len(), 4);
        assert_eq!(log.records_of(RecordMode::Automated).count(), 4);
        assert_eq!(progress, vec![0.5, 1.0]);

        let outcomes: Vec<Outcome> = report.outcomes.iter().map(|o| o.outcome).collect();
        assert_eq!(
            outcomes,
            vec![Outcome::Pass, Outcome::Fail, Outcome::Fail, Outcome::Fail]
        );
        assert_eq!(log.records()[0].model, "Model A");
        assert_eq!(log.records()[1].model, "Model B");

        let Summary::Automated(summary) = aggregate(log.records()).unwrap() else {
            panic!("expected automated summary");
        };
        assert_eq!(summary[0].pass_rate, "50.0%");
        assert_eq!(summary[1].pass_rate, "0.0%");
    }

    #[tokio::test]
    async fn test_execution_failure_does_not_block_other_model() {
        let service = FakeQueryService::new()
            .with_execution_error("a", "q1", "engine down")
            .with_result("b", "q1", single("count", "7"))
            .with_result("a", "q2", single("count", "8"))
            .with_result("b", "q2", single("count", "8"));
        let runner = runner(service);

        let mut suite = TestSuite::new();
        suite.push(TestCase::new("q1", "7")).unwrap();
        suite.push(TestCase::new("q2", "8")).unwrap();

        let mut log = EvaluationLog::new();
        let report = runner.run(&suite, &mut log, |_| {}).await;

        assert_eq!(log.len(), 4);
        assert_eq!(log.records()[0].outcome(), Some(Outcome::Fail));
        assert_eq!(log.records()[1].outcome(), Some(Outcome::Pass));
        assert_eq!(log.records()[2].outcome(), Some(Outcome::Pass));
        assert_eq!(log.records()[3].outcome(), Some(Outcome::Pass));
        assert!(report.outcomes[0].detail.contains("engine down"));
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_flagged() {
        let multi = crate::table::ActualResult::from_raw(
            &["state".to_string(), "count".to_string()],
            &[vec![serde_json::json!("CA"), serde_json::json!(10)]],
        );
        let service = FakeQueryService::new()
            .with_result("a", "q", multi)
            .with_result("b", "q", single("count", "10"));
        let runner = runner(service);

        let mut suite = TestSuite::new();
        suite.push(TestCase::new("q", "10")).unwrap();

        let mut log = EvaluationLog::new();
        let report = runner.run(&suite, &mut log, |_| {}).await;

        let warnings: Vec<&str> = report.warnings().map(|o| o.model.as_str()).collect();
        assert_eq!(warnings, ["Model A"]);
        assert_eq!(log.records()[1].outcome(), Some(Outcome::Pass));
    }

    #[tokio::test]
    async fn test_empty_suite_completes() {
        let runner = runner(FakeQueryService::new());
        let mut log = EvaluationLog::new();
        let mut progress = Vec::new();
        let report = runner
            .run(&TestSuite::new(), &mut log, |p| progress.push(p))
            .await;

        assert_eq!(report.total_cases, 0);
        assert!(log.is_empty());
        assert_eq!(progress.len(), 1);
        assert_eq!(progress[0].fraction(), 1.0);
    }

    #[test]
    fn test_model_pair_from_config() {
        let models = ModelsConfig {
            model_a: "x".into(),
            model_b: "y".into(),
        };
        let [a, b] = ModelSlot::pair(&models);
        assert_eq!(a, ModelSlot::new("Model A", "x"));
        assert_eq!(b.label, MODEL_B_LABEL);
    }
}
