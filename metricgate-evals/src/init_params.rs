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

//! Typed access to merged scorer init params

use crate::scorer::ScorerError;
use serde_json::{Map, Value};

/// Read-only view over a metric's merged init params
///
/// JSON nulls are treated as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitParams(Map<String, Value>);

impl InitParams {
    pub fn new(params: Map<String, Value>) -> Self {
        Self(params)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn require(&self, name: &str) -> Result<&Value, ScorerError> {
        self.get(name)
            .ok_or_else(|| ScorerError::MissingParam(name.to_string()))
    }

    pub fn require_str(&self, name: &str) -> Result<&str, ScorerError> {
        self.require(name)?
            .as_str()
            .ok_or_else(|| ScorerError::invalid_param(name, "expected a string"))
    }

    pub fn f64_opt(&self, name: &str) -> Result<Option<f64>, ScorerError> {
        match self.get(name) {
            None => Ok(None),
            Some(v) => v
                .as_f64()
                .map(Some)
                .ok_or_else(|| ScorerError::invalid_param(name, "expected a number")),
        }
    }

    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool, ScorerError> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => v
                .as_bool()
                .ok_or_else(|| ScorerError::invalid_param(name, "expected a boolean")),
        }
    }

    /// Threshold, if one was supplied; must lie in `[0, 1]`
    pub fn threshold(&self) -> Result<Option<f64>, ScorerError> {
        match self.f64_opt("threshold")? {
            Some(t) if !(0.0..=1.0).contains(&t) => Err(ScorerError::invalid_param(
                "threshold",
                format!("{} is outside [0, 1]", t),
            )),
            other => Ok(other),
        }
    }

    /// A string or a list of strings
    pub fn string_list(&self, name: &str) -> Result<Option<Vec<String>>, ScorerError> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(vec![s.clone()])),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(String::from).ok_or_else(|| {
                        ScorerError::invalid_param(name, "expected a list of strings")
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(_) => Err(ScorerError::invalid_param(
                name,
                "expected a string or list of strings",
            )),
        }
    }
}

impl From<Map<String, Value>> for InitParams {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
