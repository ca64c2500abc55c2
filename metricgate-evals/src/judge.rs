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

//! Judge model backend
//!
//! Judged scorers receive their model through the `model` init param. The value is
//! either a model name or a partial [`JudgeModelConfig`] object, merged over the
//! process-wide defaults and turned into an [`LLMClient`] by a [`JudgeConnector`].

use crate::llm_client::{LLMClient, OpenAIClient};
use crate::scorer::ScorerError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Connection settings for an OpenAI-compatible judge model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeModelConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Never serialized, so it cannot leak into evidence or API responses
    #[serde(default = "default_api_key", skip_serializing)]
    pub api_key: String,
    #[serde(default)]
    pub cost_per_input_token: f64,
    #[serde(default)]
    pub cost_per_output_token: f64,
}

fn default_model() -> String {
    "deepseek-r1:1.5b".to_string()
}

fn default_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_api_key() -> String {
    "ollama".to_string()
}

impl Default for JudgeModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key: default_api_key(),
            cost_per_input_token: 0.0,
            cost_per_output_token: 0.0,
        }
    }
}

impl JudgeModelConfig {
    /// Value injected into a metric's `model` slot when the caller gave none
    pub fn to_param(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::String(self.model.clone()))
    }

    /// Interpret a `model` init param against these defaults
    pub fn merged_with(&self, value: &Value) -> Result<JudgeModelConfig, ScorerError> {
        let mut merged = self.clone();
        match value {
            Value::String(model) if !model.trim().is_empty() => {
                merged.model = model.trim().to_string();
            }
            Value::Object(fields) => {
                for (key, field) in fields {
                    match key.as_str() {
                        "model" => merged.model = string_field(key, field)?,
                        "base_url" => merged.base_url = string_field(key, field)?,
                        "api_key" => merged.api_key = string_field(key, field)?,
                        "cost_per_input_token" => {
                            merged.cost_per_input_token = cost_field(key, field)?
                        }
                        "cost_per_output_token" => {
                            merged.cost_per_output_token = cost_field(key, field)?
                        }
                        _ => {}
                    }
                }
            }
            _ => {
                return Err(ScorerError::invalid_param(
                    "model",
                    "expected a model name or a judge configuration object",
                ))
            }
        }
        Ok(merged)
    }
}

fn string_field(key: &str, value: &Value) -> Result<String, ScorerError> {
    value
        .as_str()
        .map(String::from)
        .ok_or_else(|| ScorerError::invalid_param("model", format!("'{}' must be a string", key)))
}

fn cost_field(key: &str, value: &Value) -> Result<f64, ScorerError> {
    match value.as_f64() {
        Some(cost) if cost >= 0.0 => Ok(cost),
        _ => Err(ScorerError::invalid_param(
            "model",
            format!("'{}' must be a non-negative number", key),
        )),
    }
}

/// Turns a `model` init param into a judge client
pub trait JudgeConnector: Send + Sync {
    fn connect(&self, model: &Value) -> Result<Arc<dyn LLMClient>, ScorerError>;
}

/// Connects to OpenAI-compatible endpoints, including a local Ollama server
pub struct OpenAICompatibleConnector {
    defaults: JudgeModelConfig,
}

impl OpenAICompatibleConnector {
    pub fn new(defaults: JudgeModelConfig) -> Self {
        Self { defaults }
    }
}

impl JudgeConnector for OpenAICompatibleConnector {
    fn connect(&self, model: &Value) -> Result<Arc<dyn LLMClient>, ScorerError> {
        let config = self.defaults.merged_with(model)?;
        let client = OpenAIClient::new(config.api_key, config.model)
            .with_base_url(config.base_url)
            .with_costs(config.cost_per_input_token, config.cost_per_output_token);
        Ok(Arc::new(client))
    }
}

/// Hands out the same client regardless of the `model` value
pub struct FixedClientConnector {
    client: Arc<dyn LLMClient>,
}

impl FixedClientConnector {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }
}

impl JudgeConnector for FixedClientConnector {
    fn connect(&self, _model: &Value) -> Result<Arc<dyn LLMClient>, ScorerError> {
        Ok(Arc::clone(&self.client))
    }
}

/// Parsed `{score, reason}` verdict
#[derive(Debug, Clone, PartialEq)]
pub struct JudgeVerdict {
    pub score: f64,
    pub reason: Option<String>,
    pub cost_usd: f64,
}

/// Find the first well-formed JSON object embedded in `text`
///
/// Reasoning models often wrap the answer in a preamble or code fence.
pub fn extract_json_object(text: &str) -> Option<Value> {
    text.char_indices()
        .filter(|(_, c)| *c == '{')
        .find_map(|(start, _)| {
            serde_json::Deserializer::from_str(&text[start..])
                .into_iter::<Value>()
                .next()
                .and_then(Result::ok)
                .filter(Value::is_object)
        })
}

/// Send a prompt and parse the verdict
pub async fn ask_judge(client: &dyn LLMClient, prompt: String) -> Result<JudgeVerdict, ScorerError> {
    let response = client.evaluate(prompt).await?;
    let (input_cost, output_cost) = client.cost_per_token();
    let cost_usd = response.usage.calculate_cost(input_cost, output_cost);

    let json = extract_json_object(&response.content).ok_or_else(|| {
        ScorerError::InvalidVerdict("no JSON object in judge response".to_string())
    })?;

    let score = match &json["score"] {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ScorerError::InvalidVerdict("missing numeric 'score'".to_string()))?;

    if !(0.0..=1.0).contains(&score) {
        return Err(ScorerError::InvalidVerdict(format!(
            "score {} is outside [0, 1]",
            score
        )));
    }

    let reason = json["reason"]
        .as_str()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(String::from);

    Ok(JudgeVerdict {
        score,
        reason,
        cost_usd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{LLMError, LLMResponse, TokenUsage};
    use async_trait::async_trait;
    use serde_json::json;

    struct MockLLMClient {
        content: String,
    }

    #[async_trait]
    impl LLMClient for MockLLMClient {
        async fn evaluate(&self, _prompt: String) -> Result<LLMResponse, LLMError> {
            Ok(LLMResponse {
                content: self.content.clone(),
                usage: TokenUsage {
                    prompt_tokens: 1000,
                    completion_tokens: 100,
                    total_tokens: 1100,
                },
                model: "mock-model".to_string(),
            })
        }

        fn model_name(&self) -> &str {
            "mock-model"
        }

        fn cost_per_token(&self) -> (f64, f64) {
            (0.000001, 0.000002)
        }
    }

    #[test]
    fn test_extract_json_object_skips_preamble() {
        let text = "<think>the {answer} is...</think>\n```json\n{\"score\": 0.4, \"reason\": \"partial\"}\n```";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["score"], 0.4);
        assert!(extract_json_object("no json here").is_none());
    }

    #[tokio::test]
    async fn test_ask_judge_parses_verdict_and_cost() {
        let client = MockLLMClient {
            content: r#"Sure. {"score": "0.75", "reason": "  mostly relevant "}"#.to_string(),
        };
        let verdict = ask_judge(&client, "prompt".to_string()).await.unwrap();
        assert_eq!(verdict.score, 0.75);
        assert_eq!(verdict.reason.as_deref(), Some("mostly relevant"));
        // 1000 * 0.000001 + 100 * 0.000002
        assert!((verdict.cost_usd - 0.0012).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_ask_judge_rejects_bad_scores() {
        let out_of_range = MockLLMClient {
            content: r#"{"score": 7, "reason": "x"}"#.to_string(),
        };
        assert!(matches!(
            ask_judge(&out_of_range, "p".to_string()).await,
            Err(ScorerError::InvalidVerdict(_))
        ));

        let missing = MockLLMClient {
            content: r#"{"reason": "x"}"#.to_string(),
        };
        assert!(matches!(
            ask_judge(&missing, "p".to_string()).await,
            Err(ScorerError::InvalidVerdict(_))
        ));
    }

    #[test]
    fn test_model_param_merging() {
        let defaults = JudgeModelConfig::default();

        let by_name = defaults.merged_with(&json!("llama3:8b")).unwrap();
        assert_eq!(by_name.model, "llama3:8b");
        assert_eq!(by_name.base_url, "http://localhost:11434/v1");

        let partial = defaults
            .merged_with(&json!({"base_url": "http://judge:8080/v1", "cost_per_input_token": 0.5}))
            .unwrap();
        assert_eq!(partial.model, "deepseek-r1:1.5b");
        assert_eq!(partial.base_url, "http://judge:8080/v1");
        assert_eq!(partial.cost_per_input_token, 0.5);
        assert_eq!(partial.api_key, "ollama");

        assert!(defaults.merged_with(&json!(42)).is_err());
        assert!(defaults
            .merged_with(&json!({"cost_per_output_token": -1.0}))
            .is_err());
    }

    #[test]
    fn test_api_key_never_serialized() {
        let config = JudgeModelConfig {
            api_key: "sk-secret".to_string(),
            ..Default::default()
        };
        let param = config.to_param();
        assert!(param.get("api_key").is_none());
        assert!(!param.to_string().contains("sk-secret"));
        assert_eq!(param["model"], "deepseek-r1:1.5b");
    }
}
