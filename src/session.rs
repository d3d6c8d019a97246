//! Interactive evaluation session.
//!
//! Holds everything one user session works with: the two model panels with
//! their latest results and pending feedback, the test suite, and the
//! evaluation log. Nothing here outlives the process.

use crate::aggregate::{AutomatedSummary, ManualSummary, aggregate_automated, aggregate_manual};
use crate::compare::Comparator;
use crate::config::Config;
use crate::error::{EvalError, Result};
use crate::log::{EvaluationLog, EvaluationRecord, Rating, RecordMode};
use crate::query::{ModelRun, QueryExecutor, QueryGenerator, QueryServiceClient, run_prompt};
use crate::runner::{BatchReport, BatchRunner, ModelSlot, Progress};
use crate::suite::{TestCase, TestSuite};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Feedback a user is preparing for one model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackForm {
    pub rating: Option<Rating>,
    pub note: String,
}

/// One side of the side-by-side view.
#[derive(Debug, Clone)]
pub struct ModelPanel {
    pub slot: ModelSlot,
    pub last_run: Option<ModelRun>,
    pub feedback: FeedbackForm,
}

impl ModelPanel {
    fn new(slot: ModelSlot) -> Self {
        Self {
            slot,
            last_run: None,
            feedback: FeedbackForm::default(),
        }
    }
}

/// Per-model summaries of both record kinds.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub manual: Vec<ManualSummary>,
    pub automated: Vec<AutomatedSummary>,
}

/// Everything a user export holds: the log, its summaries and optionally the
/// report of the batch run that just finished.
#[derive(Debug, Serialize)]
pub struct SessionExport<'a> {
    pub log: &'a EvaluationLog,
    pub summary: SessionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<&'a BatchReport>,
}

/// State of one interactive session.
pub struct EvalSession {
    generator: Arc<dyn QueryGenerator>,
    executor: Arc<dyn QueryExecutor>,
    comparator: Comparator,
    panels: [ModelPanel; 2],
    last_prompt: Option<String>,
    suite: TestSuite,
    log: EvaluationLog,
}

impl EvalSession {
    pub fn new(
        generator: Arc<dyn QueryGenerator>,
        executor: Arc<dyn QueryExecutor>,
        models: [ModelSlot; 2],
        comparator: Comparator,
    ) -> Self {
        let [a, b] = models;
        Self {
            generator,
            executor,
            comparator,
            panels: [ModelPanel::new(a), ModelPanel::new(b)],
            last_prompt: None,
            suite: TestSuite::new(),
            log: EvaluationLog::new(),
        }
    }

    /// Create a session talking to the configured query service.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Arc::new(QueryServiceClient::new(config.api.clone())?);
        Ok(Self::new(
            client.clone(),
            client,
            ModelSlot::pair(&config.models),
            Comparator::new(config.comparison.row_matching),
        ))
    }

    pub fn panels(&self) -> &[ModelPanel; 2] {
        &self.panels
    }

    pub fn last_prompt(&self) -> Option<&str> {
        self.last_prompt.as_deref()
    }

    pub fn suite(&self) -> &TestSuite {
        &self.suite
    }

    pub fn log(&self) -> &EvaluationLog {
        &self.log
    }

    /// Change which model id a panel evaluates.
    pub fn set_model_id(&mut self, panel: usize, model_id: impl Into<String>) {
        if let Some(p) = self.panels.get_mut(panel) {
            p.slot.id = model_id.into();
        }
    }

    /// Send a prompt to both models and keep their results.
    ///
    /// Blank prompts are ignored and return `false`; anything else is sent
    /// as typed. Pending feedback is cleared because it referred to the
    /// previous answers.
    pub async fn submit_prompt(&mut self, prompt: &str) -> bool {
        if prompt.trim().is_empty() {
            return false;
        }

        let [a, b] = &self.panels;
        let (run_a, run_b) = tokio::join!(
            run_prompt(self.generator.as_ref(), self.executor.as_ref(), &a.slot.id, prompt),
            run_prompt(self.generator.as_ref(), self.executor.as_ref(), &b.slot.id, prompt),
        );

        for (panel, run) in self.panels.iter_mut().zip([run_a, run_b]) {
            panel.last_run = Some(run);
            panel.feedback = FeedbackForm::default();
        }
        self.last_prompt = Some(prompt.to_string());
        info!(prompt, "Prompt submitted to both models");
        true
    }

    /// Set the pending rating and note for a panel.
    pub fn set_feedback(&mut self, panel: usize, rating: Option<Rating>, note: impl Into<String>) {
        if let Some(p) = self.panels.get_mut(panel) {
            p.feedback = FeedbackForm {
                rating,
                note: note.into(),
            };
        }
    }

    /// Log pending feedback; only panels with a rating produce a record.
    ///
    /// Returns the number of records appended.
    pub fn submit_feedback(&mut self) -> usize {
        let Some(prompt) = self.last_prompt.clone() else {
            return 0;
        };

        let mut appended = 0;
        for panel in &mut self.panels {
            let form = std::mem::take(&mut panel.feedback);
            if let Some(rating) = form.rating {
                self.log.append(EvaluationRecord::manual(
                    &panel.slot.label,
                    &panel.slot.id,
                    &prompt,
                    rating,
                    form.note,
                ));
                appended += 1;
            }
        }
        debug!(appended, "Feedback submitted");
        appended
    }

    /// Add a manually entered test case.
    pub fn add_test_case(&mut self, question: &str, answer: &str) -> Result<()> {
        self.suite.push(TestCase::new(question, answer))
    }

    /// Import test cases from a CSV file, all or none.
    pub fn import_test_cases(&mut self, path: &Path) -> Result<usize> {
        self.suite.import_csv_file(path)
    }

    pub fn remove_test_case(&mut self, index: usize) -> Result<TestCase> {
        self.suite.remove(index)
    }

    pub fn clear_test_cases(&mut self) {
        self.suite.clear();
    }

    /// Run the test suite against both models.
    pub async fn run_suite<F>(&mut self, on_progress: F) -> BatchReport
    where
        F: FnMut(Progress),
    {
        let [a, b] = &self.panels;
        let runner = BatchRunner::new(
            self.generator.clone(),
            self.executor.clone(),
            [a.slot.clone(), b.slot.clone()],
            self.comparator,
        );
        runner.run(&self.suite, &mut self.log, on_progress).await
    }

    /// Per-model summaries, each record kind aggregated on its own.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            manual: aggregate_manual(self.log.records_of(RecordMode::Manual)),
            automated: aggregate_automated(self.log.records_of(RecordMode::Automated)),
        }
    }

    /// Write the log and summaries as pretty JSON.
    pub fn export_json(&self, path: &Path, report: Option<&BatchReport>) -> Result<()> {
        let export = SessionExport {
            log: &self.log,
            summary: self.summary(),
            report,
        };
        let content = serde_json::to_string_pretty(&export)
            .map_err(|e| EvalError::Serialization(e.to_string()))?;
        fs::write(path, content).map_err(|e| EvalError::io(path, e))?;
        info!(path = %path.display(), records = self.log.len(), "Exported evaluation log");
        Ok(())
    }
}
