// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use anyhow::Result;
use metricgate_core::{AggregationPolicy, ReasonSelection, ScoreAggregation};
use metricgate_evals::JudgeModelConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Metricgate Server Configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub catalogue: CatalogueConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Default judge model injected into metrics with a `model` slot
    #[serde(default)]
    pub judge: JudgeModelConfig,
    #[serde(default)]
    pub evaluation: EvaluationSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP API listen address (e.g., "127.0.0.1:8000")
    #[serde(default = "default_http_addr")]
    pub listen_addr: String,

    /// Request timeout in seconds; judged runs can take minutes
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Enable CORS for browser clients (all origins)
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogueConfig {
    /// Path to the metric catalogue (YAML)
    #[serde(default = "default_catalogue_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory for per-run evidence documents
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EvaluationSettings {
    #[serde(default)]
    pub score_aggregation: ScoreAggregation,
    #[serde(default)]
    pub reason_selection: ReasonSelection,
    /// Threshold given to metrics selected through an evaluation config
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,
    /// Evaluation config used when a from-config request carries none inline
    #[serde(default)]
    pub config_path: Option<PathBuf>,
}

// Default values
fn default_http_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_request_timeout() -> u64 {
    300
}

fn default_enable_cors() -> bool {
    true
}

fn default_catalogue_path() -> PathBuf {
    PathBuf::from("catalogue/metrics.schema.yaml")
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("./artifacts")
}

fn default_threshold() -> f64 {
    0.7
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_http_addr(),
            request_timeout_secs: default_request_timeout(),
            enable_cors: default_enable_cors(),
        }
    }
}

impl Default for CatalogueConfig {
    fn default() -> Self {
        Self {
            path: default_catalogue_path(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
        }
    }
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            score_aggregation: ScoreAggregation::default(),
            reason_selection: ReasonSelection::default(),
            default_threshold: default_threshold(),
            config_path: None,
        }
    }
}

impl EvaluationSettings {
    pub fn policy(&self) -> AggregationPolicy {
        AggregationPolicy {
            score: self.score_aggregation,
            reason: self.reason_selection,
        }
    }
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - METRICGATE_HTTP_ADDR: HTTP listen address (default: 127.0.0.1:8000)
    /// - METRICGATE_REQUEST_TIMEOUT: Request timeout in seconds (default: 300)
    /// - METRICGATE_CATALOGUE: Metric catalogue path
    /// - METRICGATE_ARTIFACT_DIR: Evidence directory (default: ./artifacts)
    /// - METRICGATE_EVAL_CONFIG: Default evaluation config path
    /// - OLLAMA_BASE_URL, OLLAMA_MODEL, OLLAMA_API_KEY: Default judge model
    /// - OLLAMA_COST_PER_INPUT_TOKEN, OLLAMA_COST_PER_OUTPUT_TOKEN: Judge pricing (USD)
    pub fn from_env() -> Self {
        Self::merge_with_env(Self::default())
    }

    /// Load configuration with priority: env > file > defaults
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        // Override with environment variables
        Ok(Self::merge_with_env(config))
    }

    /// Overlay any explicitly set environment variables
    fn merge_with_env(mut config: Self) -> Self {
        if let Ok(addr) = std::env::var("METRICGATE_HTTP_ADDR") {
            config.server.listen_addr = addr;
        }
        if let Ok(timeout) = std::env::var("METRICGATE_REQUEST_TIMEOUT") {
            if let Ok(val) = timeout.parse() {
                config.server.request_timeout_secs = val;
            }
        }
        if let Ok(path) = std::env::var("METRICGATE_CATALOGUE") {
            config.catalogue.path = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var("METRICGATE_ARTIFACT_DIR") {
            config.storage.artifact_dir = PathBuf::from(dir);
        }
        if let Ok(path) = std::env::var("METRICGATE_EVAL_CONFIG") {
            config.evaluation.config_path = Some(PathBuf::from(path));
        }

        // Judge model
        if let Ok(base_url) = std::env::var("OLLAMA_BASE_URL") {
            config.judge.base_url = base_url;
        }
        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            config.judge.model = model;
        }
        if let Ok(key) = std::env::var("OLLAMA_API_KEY") {
            config.judge.api_key = key;
        }
        if let Ok(cost) = std::env::var("OLLAMA_COST_PER_INPUT_TOKEN") {
            if let Ok(val) = cost.parse() {
                config.judge.cost_per_input_token = val;
            }
        }
        if let Ok(cost) = std::env::var("OLLAMA_COST_PER_OUTPUT_TOKEN") {
            if let Ok(val) = cost.parse() {
                config.judge.cost_per_output_token = val;
            }
        }

        config
    }

    /// Parse listen address as SocketAddr
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(self.server.listen_addr.parse()?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }
        if self.judge.cost_per_input_token < 0.0 || self.judge.cost_per_output_token < 0.0 {
            anyhow::bail!("judge token costs must not be negative");
        }
        if !(0.0..=1.0).contains(&self.evaluation.default_threshold) {
            anyhow::bail!(
                "default_threshold must be within [0, 1] (got {})",
                self.evaluation.default_threshold
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1:8000");
        assert_eq!(config.judge.model, "deepseek-r1:1.5b");
        assert_eq!(config.evaluation.policy(), AggregationPolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file_partial_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
listen_addr = "0.0.0.0:9000"

[judge]
model = "llama3.1:8b"

[evaluation]
score_aggregation = "min"
reason_selection = "worst_case"
"#
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:9000");
        assert_eq!(config.server.request_timeout_secs, 300);
        assert_eq!(config.judge.model, "llama3.1:8b");
        assert_eq!(config.judge.base_url, "http://localhost:11434/v1");
        assert_eq!(config.evaluation.policy().score, ScoreAggregation::Min);
        assert_eq!(config.evaluation.policy().reason, ReasonSelection::WorstCase);
        assert_eq!(config.storage.artifact_dir, PathBuf::from("./artifacts"));
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("METRICGATE_ARTIFACT_DIR", "/tmp/metricgate-env-test");
        std::env::set_var("OLLAMA_COST_PER_INPUT_TOKEN", "0.000002");

        let config = ServerConfig::from_env();
        assert_eq!(
            config.storage.artifact_dir,
            PathBuf::from("/tmp/metricgate-env-test")
        );
        assert_eq!(config.judge.cost_per_input_token, 0.000002);

        std::env::remove_var("METRICGATE_ARTIFACT_DIR");
        std::env::remove_var("OLLAMA_COST_PER_INPUT_TOKEN");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ServerConfig::default();
        config.server.listen_addr = "not-an-addr".into();
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.server.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.judge.cost_per_output_token = -1.0;
        assert!(config.validate().is_err());
    }
}
