//! Query-generation and query-execution collaborators.
//!
//! The harness only talks to the query service through the two traits here,
//! so the runner and session can be driven by any implementation.

mod client;
mod description;

pub use client::QueryServiceClient;
pub use description::QueryDescription;

use crate::error::Result;
use crate::table::ActualResult;
use async_trait::async_trait;
use tracing::warn;

/// Translates a natural-language prompt into a structured query.
#[async_trait]
pub trait QueryGenerator: Send + Sync {
    async fn generate(&self, model_id: &str, prompt: &str) -> Result<QueryDescription>;
}

/// Runs a structured query against the data.
///
/// A query that runs but returns nothing is `Ok(ActualResult::Empty)`, not an error.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: &QueryDescription) -> Result<ActualResult>;
}

/// What one model produced for one prompt.
#[derive(Debug, Clone)]
pub struct ModelRun {
    /// The generated query, if generation succeeded.
    pub query: Option<QueryDescription>,
    pub result: ActualResult,
}

/// Generate and execute a query for one model, folding any failure into the result.
pub async fn run_prompt(
    generator: &dyn QueryGenerator,
    executor: &dyn QueryExecutor,
    model_id: &str,
    prompt: &str,
) -> ModelRun {
    let query = match generator.generate(model_id, prompt).await {
        Ok(query) => query,
        Err(e) => {
            warn!(model_id, error = %e, "Query generation failed");
            return ModelRun {
                query: None,
                result: ActualResult::Failed(e.to_string()),
            };
        }
    };

    let result = match executor.execute(&query).await {
        Ok(result) => result,
        Err(e) => {
            warn!(model_id, error = %e, "Query execution failed");
            ActualResult::Failed(e.to_string())
        }
    };

    ModelRun {
        query: Some(query),
        result,
    }
}
