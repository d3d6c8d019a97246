//! Configuration for the evaluation harness.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::compare::RowMatching;
use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default topic queried by both models.
pub const DEFAULT_TOPIC: &str = "orders_ai";

/// Default identifier for the first model under evaluation.
pub const DEFAULT_MODEL_A: &str = "7f250d4f-75bd-45ab-a58d-22db81174793";

/// Default identifier for the second model under evaluation.
pub const DEFAULT_MODEL_B: &str = "e29c35ca-39f6-4a6b-bcb8-0bfc8f5be64b";

/// Query service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the query service (e.g., "https://example.omniapp.co")
    pub base_url: String,

    /// API key for bearer authentication
    pub api_key: String,

    /// Topic the generated queries run against
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            topic: default_topic(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// The two model identifiers being compared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    pub model_a: String,
    pub model_b: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            model_a: DEFAULT_MODEL_A.to_string(),
            model_b: DEFAULT_MODEL_B.to_string(),
        }
    }
}

/// Comparator options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComparisonConfig {
    #[serde(default)]
    pub row_matching: RowMatching,
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Query service settings
    pub api: ApiConfig,
    /// Models under evaluation
    pub models: ModelsConfig,
    /// Result comparison settings
    pub comparison: ComparisonConfig,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    api: Option<ApiFileSection>,
    models: Option<ModelsFileSection>,
    comparison: Option<ComparisonFileSection>,
}

#[derive(Debug, Deserialize)]
struct ApiFileSection {
    base_url: Option<String>,
    api_key: Option<String>,
    topic: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ModelsFileSection {
    model_a: Option<String>,
    model_b: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ComparisonFileSection {
    row_matching: Option<RowMatching>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (EVAL_API_BASE, EVAL_API_KEY, EVAL_MODEL_A, ...)
    /// 2. Config file (~/.config/query-eval/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(base_url) = env::var("EVAL_API_BASE") {
            self.api.base_url = base_url;
        }

        if let Ok(api_key) = env::var("EVAL_API_KEY") {
            self.api.api_key = api_key;
        }

        if let Ok(topic) = env::var("EVAL_TOPIC") {
            self.api.topic = topic;
        }

        if let Ok(timeout) = env::var("EVAL_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.api.timeout_secs = secs;
            }
        }

        if let Ok(model_a) = env::var("EVAL_MODEL_A") {
            self.models.model_a = model_a;
        }

        if let Ok(model_b) = env::var("EVAL_MODEL_B") {
            self.models.model_b = model_b;
        }

        if let Ok(matching) = env::var("EVAL_ROW_MATCHING") {
            self.comparison.row_matching = matching.parse()?;
        }

        Ok(())
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;

        let file_config: ConfigFile = serde_yaml::from_str(&content)
            .map_err(|e| EvalError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(api) = file_config.api {
            if let Some(base_url) = api.base_url {
                config.api.base_url = base_url;
            }
            if let Some(api_key) = api.api_key {
                config.api.api_key = api_key;
            }
            if let Some(topic) = api.topic {
                config.api.topic = topic;
            }
            if let Some(timeout_secs) = api.timeout_secs {
                config.api.timeout_secs = timeout_secs;
            }
        }

        if let Some(models) = file_config.models {
            if let Some(model_a) = models.model_a {
                config.models.model_a = model_a;
            }
            if let Some(model_b) = models.model_b {
                config.models.model_b = model_b;
            }
        }

        if let Some(row_matching) = file_config.comparison.and_then(|c| c.row_matching) {
            config.comparison.row_matching = row_matching;
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "query-eval")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that required configuration is present.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.is_empty() {
            return Err(EvalError::Config(
                "API base URL is required. Set EVAL_API_BASE environment variable or add to config file.".to_string()
            ));
        }

        if self.api.api_key.is_empty() {
            return Err(EvalError::Config(
                "API key is required. Set EVAL_API_KEY environment variable or add to config file."
                    .to_string(),
            ));
        }

        if self.models.model_a.is_empty() || self.models.model_b.is_empty() {
            return Err(EvalError::Config(
                "Both model ids are required. Set EVAL_MODEL_A / EVAL_MODEL_B or add to config file."
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Create a config from explicit values (useful for testing).
    pub fn with_api(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: base_url.into(),
                api_key: api_key.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.api.base_url.is_empty());
        assert!(config.api.api_key.is_empty());
        assert_eq!(config.api.topic, "orders_ai");
        assert_eq!(config.api.timeout_secs, 60);
        assert_eq!(config.models.model_a, DEFAULT_MODEL_A);
        assert_eq!(config.comparison.row_matching, RowMatching::Multiset);
    }

    #[test]
    fn test_validate_fails_without_required_fields() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::with_api("https://api.example.com", "key");
        assert!(config.validate().is_ok());
        config.models.model_b.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_with_api() {
        let config = Config::with_api("https://api.example.com", "test-key");
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.api.api_key, "test-key");
        assert_eq!(config.models.model_b, DEFAULT_MODEL_B);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
api:
  base_url: https://acme.example.com
  api_key: secret
  timeout_secs: 5
models:
  model_b: custom-b
comparison:
  row_matching: set
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.api.base_url, "https://acme.example.com");
        assert_eq!(config.api.topic, DEFAULT_TOPIC);
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.models.model_a, DEFAULT_MODEL_A);
        assert_eq!(config.models.model_b, "custom-b");
        assert_eq!(config.comparison.row_matching, RowMatching::Set);
    }

    #[test]
    fn test_load_from_bad_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "api: [not, a, map").unwrap();
        assert!(matches!(
            Config::load_from_file(&path),
            Err(EvalError::Config(_))
        ));
    }
}
