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

//! Validation layer
//!
//! Checks a metric selection against its catalogue definition before anything is
//! executed. Both checks collect every violation instead of stopping at the first.

use metricgate_core::{MetricDefinition, MetricSelection, TestCase, Violations};
use serde_json::{Map, Value};

/// Merge the selection's threshold override into its init params
///
/// An explicit `threshold` init param wins over the override.
pub fn merge_init_params(selection: &MetricSelection) -> Map<String, Value> {
    let mut params = selection.init_params.clone();
    if let Some(threshold) = selection.threshold {
        let slot = params.entry("threshold").or_insert(Value::Null);
        if slot.is_null() {
            *slot = Value::from(threshold);
        }
    }
    params
}

fn bracketed(names: &[&str]) -> String {
    format!("[{}]", names.join(", "))
}

/// Every required init param must hold a non-null value
pub fn validate_init_params(
    definition: &MetricDefinition,
    params: &Map<String, Value>,
) -> Result<(), Violations> {
    let missing: Vec<&str> = definition
        .required_init_params
        .iter()
        .map(String::as_str)
        .filter(|name| params.get(*name).map_or(true, Value::is_null))
        .collect();

    if missing.is_empty() {
        return Ok(());
    }
    let mut violations = Violations::new();
    violations.push(format!(
        "{}: missing required metric init params: {}",
        definition.metric_id,
        bracketed(&missing)
    ));
    Err(violations)
}

/// Required fields and constraints across every submitted test case
pub fn validate_test_cases(
    definition: &MetricDefinition,
    test_cases: &[TestCase],
) -> Result<(), Violations> {
    let mut violations = Violations::new();

    for (index, case) in test_cases.iter().enumerate() {
        let missing: Vec<&str> = definition
            .required_test_case_fields
            .iter()
            .map(String::as_str)
            .filter(|field| !case.has_field(field))
            .collect();
        if !missing.is_empty() {
            violations.push(format!(
                "{}: test case {}: missing required test-case fields: {}",
                definition.metric_id,
                index,
                bracketed(&missing)
            ));
        }

        for constraint in &definition.constraints {
            if let Some(v) = constraint.check(case) {
                violations.push(format!(
                    "{}: test case {}: constraint failed: {} (expected {}, got {})",
                    definition.metric_id, index, v.text, v.expected, v.actual
                ));
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Supplied params the scorer does not declare
pub fn undeclared_params<'a>(
    definition: &MetricDefinition,
    params: &'a Map<String, Value>,
) -> Vec<&'a str> {
    params
        .keys()
        .map(String::as_str)
        .filter(|name| !definition.accepts_param(name))
        .collect()
}
