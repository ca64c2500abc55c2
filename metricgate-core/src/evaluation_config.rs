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

//! Evaluation-config documents
//!
//! A goal-oriented JSON document that groups test cases under named metrics. The
//! evaluate-from-config path flattens it into plain test cases and metric selections.

use crate::catalogue::MetricCatalogue;
use crate::request::MetricSelection;
use crate::test_case::TestCase;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EvaluationConfigError {
    #[error("evaluation config not found: {0:?}")]
    NotFound(PathBuf),

    #[error("failed to read evaluation config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed evaluation config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default)]
    pub goals: Vec<GoalConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalConfig {
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub metrics: Vec<GoalMetricConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalMetricConfig {
    /// Human-readable metric label, resolved through the catalogue
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub test_cases: Vec<ConfigTestCase>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigTestCase {
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub actual_output: Option<Value>,
    #[serde(default)]
    pub expected_output: Option<Value>,
    #[serde(default)]
    pub retrieval_context: Option<Value>,
    #[serde(default)]
    pub context: Option<Value>,
}

impl From<&ConfigTestCase> for TestCase {
    fn from(tc: &ConfigTestCase) -> Self {
        TestCase {
            input: tc.input.clone(),
            actual_output: tc.actual_output.clone(),
            expected_output: tc.expected_output.clone(),
            retrieval_context: tc.retrieval_context.clone(),
            context: tc.context.clone(),
            ..Default::default()
        }
    }
}

/// Flattened output of [`EvaluationConfig::extract`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedEvaluation {
    pub test_cases: Vec<TestCase>,
    pub metrics: Vec<MetricSelection>,
}

impl EvaluationConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EvaluationConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EvaluationConfigError::NotFound(path.to_path_buf()));
        }
        let content =
            std::fs::read_to_string(path).map_err(|source| EvaluationConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Filter goals and metrics, resolve metric labels and flatten test cases
    ///
    /// Empty filters select everything. Labels that do not resolve are skipped.
    /// Selections are emitted once per metric id, in first-seen order.
    pub fn extract(
        &self,
        goals: &[String],
        metrics: &[String],
        catalogue: &MetricCatalogue,
        default_threshold: f64,
    ) -> ExtractedEvaluation {
        let goal_filter: HashSet<String> = goals.iter().map(|g| g.to_lowercase()).collect();
        let metric_filter: HashSet<String> = metrics.iter().map(|m| m.to_lowercase()).collect();

        let mut out = ExtractedEvaluation::default();
        let mut seen: HashSet<String> = HashSet::new();

        let selected_goals = self
            .goals
            .iter()
            .filter(|g| goal_filter.is_empty() || goal_filter.contains(&g.goal.to_lowercase()));

        for goal in selected_goals {
            let selected_metrics = goal.metrics.iter().filter(|m| {
                metric_filter.is_empty() || metric_filter.contains(&m.metric.to_lowercase())
            });

            for metric in selected_metrics {
                let Some(metric_id) = catalogue.resolve_name(&metric.metric) else {
                    debug!(goal = %goal.goal, metric = %metric.metric, "Skipping unresolved metric label");
                    continue;
                };

                out.test_cases
                    .extend(metric.test_cases.iter().map(TestCase::from));

                if seen.insert(metric_id.to_string()) {
                    out.metrics
                        .push(MetricSelection::new(metric_id).with_threshold(default_threshold));
                }
            }
        }

        out
    }
}

/// Split a comma-separated filter string, dropping blank entries
pub fn parse_filter_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
