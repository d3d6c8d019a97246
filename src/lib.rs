//! Query Eval - side-by-side evaluation of natural-language-to-query models.
//!
//! Two query-generation models ("Model A" and "Model B") each translate a
//! question into a structured query, the query runs against a tabular dataset,
//! and the results are either rated by a person or checked automatically
//! against an expected answer.
//!
//! # Quick Start
//!
//! ```no_run
//! use query_eval::{
//!     config::Config,
//!     session::EvalSession,
//!     aggregate::render_summary,
//! };
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let mut session = EvalSession::from_config(&config)?;
//!     session.import_test_cases(Path::new("golden.csv"))?;
//!
//!     let report = session
//!         .run_suite(|p| println!("{:.0}%", p.fraction() * 100.0))
//!         .await;
//!     println!("{} cases checked", report.total_cases);
//!
//!     let summary = session.summary();
//!     println!("{}", render_summary(&query_eval::Summary::Automated(summary.automated)));
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **parser**: expected-answer text to a canonical scalar or table
//! - **compare**: order-independent table comparison and scalar checks
//! - **log** / **aggregate**: append-only evaluation records and per-model summaries
//! - **runner**: drives a test suite through both models
//! - **query**: the query-generation and query-execution collaborators
//! - **session**: typed state for one interactive session

pub mod aggregate;
pub mod compare;
pub mod config;
pub mod error;
pub mod format;
pub mod log;
pub mod parser;
pub mod query;
pub mod runner;
pub mod session;
pub mod suite;
pub mod table;

// Re-export commonly used types
pub use aggregate::{Summary, aggregate};
pub use compare::{Comparator, Comparison, Outcome, RowMatching, compare};
pub use config::Config;
pub use error::{EvalError, Result};
pub use log::{EvaluationLog, EvaluationRecord, Rating};
pub use parser::{ExpectedValue, parse_expected};
pub use query::{QueryExecutor, QueryGenerator, QueryServiceClient};
pub use runner::{BatchReport, BatchRunner, ModelSlot, Progress};
pub use session::EvalSession;
pub use suite::{TestCase, TestSuite};
pub use table::{ActualResult, Table};
