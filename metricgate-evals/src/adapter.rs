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

//! Test-case adapter
//!
//! Converts the generic [`TestCase`] into the shape a scorer consumes. Only the
//! single-turn shape exists in this version; the other kinds surface as
//! [`AdapterError::UnsupportedKind`] so the runner can record them as gaps.

use metricgate_core::{TestCase, TestCaseKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("{} execution is not implemented in this version", kind_label(.0))]
    UnsupportedKind(TestCaseKind),

    #[error("invalid '{field}': {message}")]
    InvalidField { field: &'static str, message: String },
}

fn kind_label(kind: &TestCaseKind) -> &'static str {
    match kind {
        TestCaseKind::SingleTurn => "LLMTestCase",
        TestCaseKind::Conversational => "ConversationalTestCase",
        TestCaseKind::Arena => "ArenaTestCase",
    }
}

/// A tool invocation recorded on a test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub input_parameters: Option<Value>,
    #[serde(default)]
    pub output: Option<Value>,
}

/// Single-turn test case in scorer-native form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmTestCase {
    pub input: Option<String>,
    pub actual_output: Option<String>,
    pub expected_output: Option<String>,
    pub context: Vec<String>,
    pub retrieval_context: Vec<String>,
    pub tools_called: Vec<ToolCall>,
    pub expected_tools: Vec<ToolCall>,
    pub image_inputs: Vec<String>,
    pub image_outputs: Vec<String>,
    pub mcp_servers: Option<Value>,
    pub mcp_tools_called: Option<Value>,
    pub mcp_resources_called: Option<Value>,
    pub mcp_prompts_called: Option<Value>,
    pub additional_metadata: Option<Value>,
}

impl LlmTestCase {
    /// Text rendering of a field for judge prompts; `None` when absent or empty
    pub fn field_text(&self, name: &str) -> Option<String> {
        let text = match name {
            "input" => self.input.clone()?,
            "actual_output" => self.actual_output.clone()?,
            "expected_output" => self.expected_output.clone()?,
            "context" => bullet_list(&self.context)?,
            "retrieval_context" => bullet_list(&self.retrieval_context)?,
            "tools_called" => tool_names(&self.tools_called)?,
            "expected_tools" => tool_names(&self.expected_tools)?,
            "image_inputs" => bullet_list(&self.image_inputs)?,
            "image_outputs" => bullet_list(&self.image_outputs)?,
            _ => return None,
        };
        Some(text)
    }
}

fn bullet_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    Some(
        items
            .iter()
            .map(|i| format!("- {}", i))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

fn tool_names(tools: &[ToolCall]) -> Option<String> {
    if tools.is_empty() {
        return None;
    }
    Some(
        tools
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    )
}

/// Build the scorer-native shape for `kind`
pub fn adapt(kind: TestCaseKind, case: &TestCase) -> Result<LlmTestCase, AdapterError> {
    match kind {
        TestCaseKind::SingleTurn => to_llm_test_case(case),
        TestCaseKind::Conversational | TestCaseKind::Arena => {
            Err(AdapterError::UnsupportedKind(kind))
        }
    }
}

fn to_llm_test_case(case: &TestCase) -> Result<LlmTestCase, AdapterError> {
    Ok(LlmTestCase {
        input: text(case.field("input")),
        actual_output: text(case.field("actual_output")),
        expected_output: text(case.field("expected_output")),
        context: text_list(case.field("context")),
        retrieval_context: text_list(case.field("retrieval_context")),
        tools_called: tool_list("tools_called", case.field("tools_called"))?,
        expected_tools: tool_list("expected_tools", case.field("expected_tools"))?,
        image_inputs: text_list(case.field("image_inputs")),
        image_outputs: text_list(case.field("image_outputs")),
        mcp_servers: case.field("mcp_servers").cloned(),
        mcp_tools_called: case.field("mcp_tools_called").cloned(),
        mcp_resources_called: case.field("mcp_resources_called").cloned(),
        mcp_prompts_called: case.field("mcp_prompts_called").cloned(),
        additional_metadata: case.field("additional_metadata").cloned(),
    })
}

/// Strings pass through; anything else is rendered as compact JSON
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    value.map(value_text)
}

fn text_list(value: Option<&Value>) -> Vec<String> {
    match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(value_text)
            .collect(),
        Some(other) => vec![value_text(other)],
    }
}

fn tool_list(field: &'static str, value: Option<&Value>) -> Result<Vec<ToolCall>, AdapterError> {
    let items: Vec<&Value> = match value {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(name) => Ok(ToolCall {
                name: name.clone(),
                input_parameters: None,
                output: None,
            }),
            Value::Object(_) => {
                serde_json::from_value(item.clone()).map_err(|e| AdapterError::InvalidField {
                    field,
                    message: format!("entry {}: {}", i, e),
                })
            }
            other => Err(AdapterError::InvalidField {
                field,
                message: format!("entry {} is not a tool call: {}", i, other),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn case(value: Value) -> TestCase {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_single_turn_preserves_fields() {
        let tc = case(json!({
            "input": "What is the refund window?",
            "actual_output": "30 days",
            "retrieval_context": ["Refunds within 30 days.", "Shipping is free."],
            "tools_called": ["search", {"name": "lookup", "input_parameters": {"id": 3}}],
            "additional_metadata": {"ticket": 42}
        }));

        let adapted = adapt(TestCaseKind::SingleTurn, &tc).unwrap();
        assert_eq!(adapted.input.as_deref(), Some("What is the refund window?"));
        assert_eq!(adapted.retrieval_context.len(), 2);
        assert_eq!(adapted.tools_called[1].name, "lookup");
        assert_eq!(adapted.tools_called[1].input_parameters, Some(json!({"id": 3})));
        assert_eq!(adapted.additional_metadata, Some(json!({"ticket": 42})));
        assert_eq!(
            adapted.field_text("tools_called").as_deref(),
            Some("search, lookup")
        );
    }

    #[test]
    fn test_non_string_values_render_as_json() {
        let tc = case(json!({"input": {"q": 1}, "actual_output": 7, "context": "single"}));
        let adapted = adapt(TestCaseKind::SingleTurn, &tc).unwrap();
        assert_eq!(adapted.input.as_deref(), Some(r#"{"q":1}"#));
        assert_eq!(adapted.actual_output.as_deref(), Some("7"));
        assert_eq!(adapted.context, vec!["single"]);
    }

    #[test]
    fn test_unsupported_kinds() {
        let tc = TestCase::new("q", "a");
        let err = adapt(TestCaseKind::Conversational, &tc).unwrap_err();
        assert_eq!(err, AdapterError::UnsupportedKind(TestCaseKind::Conversational));
        assert_eq!(
            err.to_string(),
            "ConversationalTestCase execution is not implemented in this version"
        );
        assert!(matches!(
            adapt(TestCaseKind::Arena, &tc),
            Err(AdapterError::UnsupportedKind(TestCaseKind::Arena))
        ));
    }

    #[test]
    fn test_malformed_tool_call_rejected() {
        let tc = case(json!({"input": "q", "tools_called": [{"arguments": {}}]}));
        assert!(matches!(
            adapt(TestCaseKind::SingleTurn, &tc),
            Err(AdapterError::InvalidField { field: "tools_called", .. })
        ));
    }
}
