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

//! Evaluation request and response contracts

use crate::test_case::TestCase;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStage {
    Dev,
    Staging,
    Prod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskClass {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserImpact {
    Internal,
    CustomerFacing,
    Regulated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Healthcare,
    Finance,
    Education,
    General,
}

/// Where and for whom the evaluated system is deployed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    pub deployment_stage: DeploymentStage,
    pub risk_class: RiskClass,
    pub user_impact: UserImpact,
    #[serde(default)]
    pub domain: Option<Domain>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    OneOff,
    Batch,
    Regression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEnvironment {
    Local,
    Ci,
    ProductionSample,
}

/// Spend limits; recorded with the run, not enforced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default)]
    pub max_tokens: Option<u64>,
    #[serde(default)]
    pub max_cost_usd: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub mode: RunMode,
    pub environment: RunEnvironment,
    #[serde(default)]
    pub baseline_run_id: Option<String>,
    #[serde(default)]
    pub budget: Option<Budget>,
}

/// A caller's request to run one catalogue metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSelection {
    pub metric_id: String,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub init_params: Map<String, Value>,
}

impl MetricSelection {
    pub fn new(metric_id: impl Into<String>) -> Self {
        Self {
            metric_id: metric_id.into(),
            threshold: None,
            init_params: Map::new(),
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.init_params.insert(name.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluateRequest {
    pub evaluation_object: String,
    pub use_case: String,
    pub context: EvaluationContext,
    pub run: RunConfig,
    pub metrics: Vec<MetricSelection>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

/// Whether a metric consumed a paid or judged resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostSignal {
    LlmBased,
    DeterministicOrUnknown,
}

/// Outcome of one metric selection within a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    pub metric_id: String,
    pub metric_name: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub threshold: Option<f64>,
    /// `None` when no threshold was configured
    #[serde(default)]
    pub passed: Option<bool>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub cost_signal: Option<CostSignal>,
}

impl MetricResult {
    /// Result entry for a selection that never produced a score
    pub fn failed(
        metric_id: impl Into<String>,
        metric_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            metric_id: metric_id.into(),
            metric_name: metric_name.into(),
            score: None,
            threshold: None,
            passed: None,
            reason: None,
            error: Some(error.into()),
            cost_signal: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Worst-signal-wins verdict over all metric results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallStatus {
    Pass,
    Warning,
    Fail,
}

impl OverallStatus {
    /// FAIL if any metric explicitly failed, else WARNING if any errored, else PASS
    pub fn from_results(results: &[MetricResult]) -> Self {
        if results.iter().any(|r| r.passed == Some(false)) {
            OverallStatus::Fail
        } else if results.iter().any(MetricResult::is_error) {
            OverallStatus::Warning
        } else {
            OverallStatus::Pass
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluateResponse {
    pub run_id: String,
    pub overall_status: OverallStatus,
    pub metric_results: Vec<MetricResult>,
    pub evidence_pointer: String,
}
