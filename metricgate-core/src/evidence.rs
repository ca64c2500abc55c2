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

//! Run evidence record
//!
//! One [`RunRecord`] is produced per evaluation request and written once through an
//! [`EvidenceSink`]. Records are never updated after persistence.

use crate::catalogue::TestCaseKind;
use crate::error::PersistenceError;
use crate::request::{
    EvaluationContext, MetricResult, MetricSelection, OverallStatus, RunConfig,
};
use crate::test_case::TestCase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of reasons kept per metric in the evidence
pub const MAX_EVIDENCE_REASONS: usize = 3;

/// Raw per-test-case output for one scored metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEvidence {
    pub metric_id: String,
    pub scorer_class: String,
    pub scores: Vec<f64>,
    pub reasons: Vec<String>,
    #[serde(default)]
    pub judge_cost_usd: Option<f64>,
}

impl MetricEvidence {
    pub fn new(
        metric_id: impl Into<String>,
        scorer_class: impl Into<String>,
        scores: Vec<f64>,
        reasons: &[String],
        judge_cost_usd: Option<f64>,
    ) -> Self {
        Self {
            metric_id: metric_id.into(),
            scorer_class: scorer_class.into(),
            scores,
            reasons: reasons.iter().take(MAX_EVIDENCE_REASONS).cloned().collect(),
            judge_cost_usd,
        }
    }
}

/// A capability the engine could not execute during the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub metric_id: String,
    pub test_case_kind: TestCaseKind,
    pub gap: String,
}

/// The persisted, immutable record of one evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub evaluation_object: String,
    pub use_case: String,
    pub context: EvaluationContext,
    pub run: RunConfig,
    /// Selections as submitted, before threshold merge or judge injection
    pub metrics: Vec<MetricSelection>,
    pub test_cases: Vec<TestCase>,
    pub metric_evidence: Vec<MetricEvidence>,
    pub gaps: Vec<Gap>,
    pub metric_results: Vec<MetricResult>,
    pub overall_status: OverallStatus,
}

/// Durable destination for run records
pub trait EvidenceSink: Send + Sync {
    /// Write the record and return a locator for later audit
    ///
    /// The write is all-or-nothing. Writing a `run_id` that already exists fails.
    fn persist(&self, record: &RunRecord) -> Result<String, PersistenceError>;
}
