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

//! LLM client abstraction for judged scorers

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are an expert evaluator. Respond only with valid JSON.";

/// Trait for LLM clients used by judged scorers
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Send a prompt and get the raw completion back
    async fn evaluate(&self, prompt: String) -> Result<LLMResponse, LLMError>;

    /// Get model name
    fn model_name(&self) -> &str;

    /// Get cost per token (input, output)
    fn cost_per_token(&self) -> (f64, f64);
}

/// Response from LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub model: String,
}

impl LLMResponse {
    /// Parse response as JSON
    pub fn as_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.content)
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Calculate cost based on per-token pricing
    pub fn calculate_cost(&self, cost_per_input: f64, cost_per_output: f64) -> f64 {
        (self.prompt_tokens as f64 * cost_per_input)
            + (self.completion_tokens as f64 * cost_per_output)
    }
}

/// Errors from LLM clients
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Client for any OpenAI-compatible chat-completions endpoint (OpenAI, Ollama, vLLM)
pub struct OpenAIClient {
    api_key: String,
    model: String,
    base_url: String,
    cost_per_input: f64,
    cost_per_output: f64,
    json_mode: bool,
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: "https://api.openai.com/v1".to_string(),
            cost_per_input: 0.0,
            cost_per_output: 0.0,
            json_mode: true,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_costs(mut self, cost_per_input: f64, cost_per_output: f64) -> Self {
        self.cost_per_input = cost_per_input;
        self.cost_per_output = cost_per_output;
        self
    }

    /// Disable `response_format: json_object` for servers that reject it
    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn evaluate(&self, prompt: String) -> Result<LLMResponse, LLMError> {
        let mut request = serde_json::json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": SYSTEM_PROMPT
                },
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "temperature": 0.0
        });
        if self.json_mode {
            request["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        debug!(model = %self.model, base_url = %self.base_url, "Sending judge request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LLMError::RateLimitExceeded);
            }
            return Err(LLMError::ApiError(format!("{}: {}", status, error_text)));
        }

        let response_data: serde_json::Value = response.json().await?;

        let content = response_data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(LLMError::InvalidResponse("Missing content".to_string()))?
            .to_string();

        let usage_data = &response_data["usage"];
        let usage = TokenUsage {
            prompt_tokens: usage_data["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: usage_data["completion_tokens"].as_u64().unwrap_or(0) as u32,
            total_tokens: usage_data["total_tokens"].as_u64().unwrap_or(0) as u32,
        };

        Ok(LLMResponse {
            content,
            usage,
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn cost_per_token(&self) -> (f64, f64) {
        (self.cost_per_input, self.cost_per_output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_cost() {
        let usage = TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 50,
            total_tokens: 150,
        };

        let cost = usage.calculate_cost(0.00000015, 0.0000006);

        // 100 * 0.00000015 + 50 * 0.0000006 = 0.000045
        assert!((cost - 0.000045).abs() < 0.0000001);
    }

    #[tokio::test]
    async fn test_openai_client_parses_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer ollama")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "choices": [{"message": {"content": "{\"score\": 0.8, \"reason\": \"ok\"}"}}],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20}
                }"#,
            )
            .create_async()
            .await;

        let client = OpenAIClient::new("ollama".to_string(), "deepseek-r1:1.5b".to_string())
            .with_base_url(server.url());
        let response = client.evaluate("judge this".to_string()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.usage.total_tokens, 20);
        assert_eq!(response.as_json().unwrap()["score"], 0.8);
        assert_eq!(response.model, "deepseek-r1:1.5b");
    }

    #[tokio::test]
    async fn test_openai_client_maps_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _busy = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let client =
            OpenAIClient::new("k".to_string(), "m".to_string()).with_base_url(server.url());
        let err = client.evaluate("p".to_string()).await.unwrap_err();
        assert!(matches!(err, LLMError::RateLimitExceeded));
    }

    #[test]
    fn test_configured_costs() {
        let client =
            OpenAIClient::new("k".to_string(), "m".to_string()).with_costs(0.000001, 0.000002);
        assert_eq!(client.cost_per_token(), (0.000001, 0.000002));
    }
}
