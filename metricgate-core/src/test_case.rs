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

//! Loosely-typed test case record
//!
//! Every field is optional at the container level. Which fields a metric needs is
//! declared by its `MetricDefinition` and checked by the validation layer, never by
//! this type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Names accepted by [`TestCase::field`]
pub const TEST_CASE_FIELDS: &[&str] = &[
    "input",
    "actual_output",
    "expected_output",
    "context",
    "retrieval_context",
    "tools_called",
    "expected_tools",
    "image_inputs",
    "image_outputs",
    "mcp_servers",
    "mcp_tools_called",
    "mcp_resources_called",
    "mcp_prompts_called",
    "additional_metadata",
];

/// One (input, output, optional reference material) tuple to be scored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_context: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_called: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_tools: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_inputs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_outputs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_servers: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_tools_called: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_resources_called: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_prompts_called: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_metadata: Option<Value>,
}

impl TestCase {
    /// Convenience constructor for the common input/output pair
    pub fn new(input: impl Into<String>, actual_output: impl Into<String>) -> Self {
        Self {
            input: Some(Value::String(input.into())),
            actual_output: Some(Value::String(actual_output.into())),
            ..Default::default()
        }
    }

    /// Look up a field by its wire name
    ///
    /// Returns `None` for absent fields, explicit JSON nulls, and unknown names.
    pub fn field(&self, name: &str) -> Option<&Value> {
        let value = match name {
            "input" => self.input.as_ref(),
            "actual_output" => self.actual_output.as_ref(),
            "expected_output" => self.expected_output.as_ref(),
            "context" => self.context.as_ref(),
            "retrieval_context" => self.retrieval_context.as_ref(),
            "tools_called" => self.tools_called.as_ref(),
            "expected_tools" => self.expected_tools.as_ref(),
            "image_inputs" => self.image_inputs.as_ref(),
            "image_outputs" => self.image_outputs.as_ref(),
            "mcp_servers" => self.mcp_servers.as_ref(),
            "mcp_tools_called" => self.mcp_tools_called.as_ref(),
            "mcp_resources_called" => self.mcp_resources_called.as_ref(),
            "mcp_prompts_called" => self.mcp_prompts_called.as_ref(),
            "additional_metadata" => self.additional_metadata.as_ref(),
            _ => None,
        };
        value.filter(|v| !v.is_null())
    }

    /// True when `name` resolves to a non-null value
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Number of items in a list-valued field: absent counts as zero, a scalar as one
    pub fn item_count(&self, name: &str) -> usize {
        match self.field(name) {
            None => 0,
            Some(Value::Array(items)) => items.len(),
            Some(_) => 1,
        }
    }
}
