//! HTTP client for the query service.
//!
//! One client covers both collaborators: query generation
//! (`/api/unstable/ai/generate-query`) and query execution
//! (`/api/v1/query/run`).

use super::{QueryDescription, QueryExecutor, QueryGenerator};
use crate::config::ApiConfig;
use crate::error::{EvalError, Result};
use crate::table::ActualResult;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Request body for query generation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateQueryRequest<'a> {
    current_topic_name: &'a str,
    model_id: &'a str,
    prompt: &'a str,
}

/// Response from query execution.
///
/// Rows are either positional arrays matching `columns`, or objects.
#[derive(Debug, Deserialize)]
struct RunQueryResponse {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Error body returned by the service.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(alias = "error", alias = "detail")]
    message: String,
}

/// Client for the query service.
#[derive(Clone)]
pub struct QueryServiceClient {
    client: Client,
    config: ApiConfig,
}

impl QueryServiceClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EvalError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn generate_endpoint(&self) -> String {
        format!("{}/api/unstable/ai/generate-query", self.base())
    }

    fn run_endpoint(&self) -> String {
        format!("{}/api/v1/query/run", self.base())
    }

    async fn post_json<T: Serialize + ?Sized>(&self, url: String, body: &T) -> Result<String> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(EvalError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }

    /// Test connectivity by generating one query with the given model.
    pub async fn test_connection(&self, model_id: &str) -> Result<QueryDescription> {
        self.generate(model_id, "How many orders are there?").await
    }
}

#[async_trait]
impl QueryGenerator for QueryServiceClient {
    async fn generate(&self, model_id: &str, prompt: &str) -> Result<QueryDescription> {
        let request = GenerateQueryRequest {
            current_topic_name: &self.config.topic,
            model_id,
            prompt,
        };

        debug!(model_id, topic = %self.config.topic, "Generating query");
        let body = self.post_json(self.generate_endpoint(), &request).await?;
        let value: Value = serde_json::from_str(&body)?;
        Ok(QueryDescription::new(value))
    }
}

#[async_trait]
impl QueryExecutor for QueryServiceClient {
    async fn execute(&self, query: &QueryDescription) -> Result<ActualResult> {
        let body = self.post_json(self.run_endpoint(), query).await?;
        let result = parse_run_response(&body)?;
        info!(
            rows = result.table().map(|t| t.row_count()).unwrap_or(0),
            "Query executed"
        );
        Ok(result)
    }
}

fn parse_run_response(body: &str) -> Result<ActualResult> {
    let response: RunQueryResponse = serde_json::from_str(body)?;

    if let Some(error) = response.error {
        return Err(EvalError::Execution(error));
    }

    if response.rows.iter().all(Value::is_object) {
        return Ok(ActualResult::from_records(&response.rows));
    }

    let rows = response
        .rows
        .into_iter()
        .map(|row| match row {
            Value::Array(cells) => Ok(cells),
            other => Err(EvalError::ResponseParse(format!(
                "Row is neither an array nor an object: {}",
                other
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ActualResult::from_raw(&response.columns, &rows))
}
