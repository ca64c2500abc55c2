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

//! Scorer contract
//!
//! A scorer is the executable behind a catalogue metric. It is built once per metric
//! selection from the merged init params and then measured against each adapted
//! test case in order.

use crate::adapter::LlmTestCase;
use crate::llm_client::LLMError;
use async_trait::async_trait;
use thiserror::Error;

/// Outcome of measuring one test case
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measurement {
    /// `None` is an execution failure for the whole metric
    pub score: Option<f64>,
    pub reason: Option<String>,
    /// Judge spend in USD, when a judge was called
    pub cost_usd: Option<f64>,
}

impl Measurement {
    pub fn scored(score: f64, reason: impl Into<String>) -> Self {
        Self {
            score: Some(score),
            reason: Some(reason.into()),
            cost_usd: None,
        }
    }
}

/// Errors raised by scorer construction or measurement
#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("missing required init param '{0}'")]
    MissingParam(String),

    #[error("invalid init param '{name}': {message}")]
    InvalidParam { name: String, message: String },

    #[error("test case is missing '{0}'")]
    MissingField(String),

    #[error("judge call failed: {0}")]
    Judge(#[from] LLMError),

    #[error("judge returned an unusable verdict: {0}")]
    InvalidVerdict(String),
}

impl ScorerError {
    /// Failure type name used in execution error messages
    pub fn kind(&self) -> &'static str {
        match self {
            ScorerError::MissingParam(_) => "MissingParam",
            ScorerError::InvalidParam { .. } => "InvalidParam",
            ScorerError::MissingField(_) => "MissingField",
            ScorerError::Judge(_) => "JudgeError",
            ScorerError::InvalidVerdict(_) => "InvalidVerdict",
        }
    }

    pub fn invalid_param(name: impl Into<String>, message: impl Into<String>) -> Self {
        ScorerError::InvalidParam {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Executable scorer resolved from a catalogue `scorer_class`
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Registered class name
    fn class_name(&self) -> &str;

    /// Threshold configured at construction; `None` leaves `passed` unknown
    fn threshold(&self) -> Option<f64>;

    /// Score one adapted test case
    async fn measure(&self, case: &LlmTestCase) -> Result<Measurement, ScorerError>;
}
