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

//! Scorers that need no judge model

use crate::adapter::{LlmTestCase, ToolCall};
use crate::init_params::InitParams;
use crate::scorer::{Measurement, Scorer, ScorerError};
use async_trait::async_trait;
use jsonschema::JSONSchema;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::collections::HashSet;

fn require_text<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, ScorerError> {
    value
        .as_deref()
        .ok_or_else(|| ScorerError::MissingField(field.to_string()))
}

/// 1.0 when `actual_output` equals `expected_output` after trimming
pub struct ExactMatchMetric {
    threshold: Option<f64>,
}

impl ExactMatchMetric {
    pub fn from_params(params: &InitParams) -> Result<Self, ScorerError> {
        Ok(Self {
            threshold: params.threshold()?,
        })
    }
}

#[async_trait]
impl Scorer for ExactMatchMetric {
    fn class_name(&self) -> &str {
        "ExactMatchMetric"
    }

    fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    async fn measure(&self, case: &LlmTestCase) -> Result<Measurement, ScorerError> {
        let actual = require_text(&case.actual_output, "actual_output")?;
        let expected = require_text(&case.expected_output, "expected_output")?;

        if actual.trim() == expected.trim() {
            Ok(Measurement::scored(1.0, "The actual output exactly matches the expected output."))
        } else {
            Ok(Measurement::scored(0.0, "The actual output does not match the expected output."))
        }
    }
}

/// 1.0 when the whole `actual_output` matches `pattern`
pub struct PatternMatchMetric {
    pattern: Regex,
    threshold: Option<f64>,
}

impl PatternMatchMetric {
    pub fn from_params(params: &InitParams) -> Result<Self, ScorerError> {
        let source = params.require_str("pattern")?;
        let ignore_case = params.bool_or("ignore_case", false)?;
        let pattern = RegexBuilder::new(&format!("^(?:{})$", source))
            .case_insensitive(ignore_case)
            .build()
            .map_err(|e| ScorerError::invalid_param("pattern", e.to_string()))?;

        Ok(Self {
            pattern,
            threshold: params.threshold()?,
        })
    }
}

#[async_trait]
impl Scorer for PatternMatchMetric {
    fn class_name(&self) -> &str {
        "PatternMatchMetric"
    }

    fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    async fn measure(&self, case: &LlmTestCase) -> Result<Measurement, ScorerError> {
        let actual = require_text(&case.actual_output, "actual_output")?;
        if self.pattern.is_match(actual.trim()) {
            Ok(Measurement::scored(1.0, "The actual output matches the pattern."))
        } else {
            Ok(Measurement::scored(0.0, "The actual output does not match the pattern."))
        }
    }
}

/// 1.0 when `actual_output` parses as JSON and satisfies `expected_schema`
pub struct JsonCorrectnessMetric {
    schema: JSONSchema,
    threshold: Option<f64>,
}

impl JsonCorrectnessMetric {
    pub fn from_params(params: &InitParams) -> Result<Self, ScorerError> {
        let schema_value = params.require("expected_schema")?;
        let schema = JSONSchema::options()
            .compile(schema_value)
            .map_err(|e| ScorerError::invalid_param("expected_schema", e.to_string()))?;

        Ok(Self {
            schema,
            threshold: params.threshold()?,
        })
    }
}

#[async_trait]
impl Scorer for JsonCorrectnessMetric {
    fn class_name(&self) -> &str {
        "JsonCorrectnessMetric"
    }

    fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    async fn measure(&self, case: &LlmTestCase) -> Result<Measurement, ScorerError> {
        let actual = require_text(&case.actual_output, "actual_output")?;
        let instance: Value = match serde_json::from_str(actual.trim()) {
            Ok(v) => v,
            Err(e) => {
                return Ok(Measurement::scored(
                    0.0,
                    format!("The actual output is not valid JSON: {}", e),
                ))
            }
        };

        let first_error = self
            .schema
            .validate(&instance)
            .err()
            .and_then(|mut errors| errors.next().map(|e| e.to_string()));

        match first_error {
            None => Ok(Measurement::scored(1.0, "The actual output conforms to the expected schema.")),
            Some(message) => Ok(Measurement::scored(
                0.0,
                format!("The actual output violates the expected schema: {}", message),
            )),
        }
    }
}

/// Fraction of expected tools the agent called
///
/// With `should_consider_ordering` the longest common subsequence of names is used.
/// With `should_exact_match` the score is 1.0 only for identical call lists.
pub struct ToolCorrectnessMetric {
    exact_match: bool,
    consider_ordering: bool,
    threshold: Option<f64>,
}

impl ToolCorrectnessMetric {
    pub fn from_params(params: &InitParams) -> Result<Self, ScorerError> {
        Ok(Self {
            exact_match: params.bool_or("should_exact_match", false)?,
            consider_ordering: params.bool_or("should_consider_ordering", false)?,
            threshold: params.threshold()?,
        })
    }

    fn score(&self, called: &[&str], expected: &[&str]) -> f64 {
        if self.exact_match {
            return if called == expected { 1.0 } else { 0.0 };
        }
        if expected.is_empty() {
            return 1.0;
        }
        let matched = if self.consider_ordering {
            lcs_len(called, expected)
        } else {
            let called: HashSet<&str> = called.iter().copied().collect();
            expected.iter().filter(|e| called.contains(*e)).count()
        };
        matched as f64 / expected.len() as f64
    }
}

fn names(tools: &[ToolCall]) -> Vec<&str> {
    tools.iter().map(|t| t.name.as_str()).collect()
}

fn lcs_len(a: &[&str], b: &[&str]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    for x in a {
        let mut row = vec![0usize; b.len() + 1];
        for (j, y) in b.iter().enumerate() {
            row[j + 1] = if x == y {
                prev[j] + 1
            } else {
                row[j].max(prev[j + 1])
            };
        }
        prev = row;
    }
    prev[b.len()]
}

#[async_trait]
impl Scorer for ToolCorrectnessMetric {
    fn class_name(&self) -> &str {
        "ToolCorrectnessMetric"
    }

    fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    async fn measure(&self, case: &LlmTestCase) -> Result<Measurement, ScorerError> {
        let called = names(&case.tools_called);
        let expected = names(&case.expected_tools);
        let score = self.score(&called, &expected);

        let missing: Vec<&str> = expected
            .iter()
            .filter(|e| !called.contains(e))
            .copied()
            .collect();
        let reason = if missing.is_empty() {
            format!("Called [{}]; all expected tools were used.", called.join(", "))
        } else {
            format!(
                "Called [{}]; missing expected tools [{}].",
                called.join(", "),
                missing.join(", ")
            )
        };

        Ok(Measurement::scored(score, reason))
    }
}
