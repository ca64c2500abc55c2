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

//! Metricgate Core
//!
//! Data model shared by the metricgate crates: the metric catalogue and its constraint
//! grammar, test cases, evaluation requests and results, run evidence, and the error
//! taxonomy.

pub mod aggregation;
pub mod catalogue;
pub mod constraint;
pub mod error;
pub mod evaluation_config;
pub mod evidence;
pub mod request;
pub mod test_case;

pub use aggregation::{AggregationPolicy, ReasonSelection, ScoreAggregation};
pub use catalogue::{MetricCatalogue, MetricDefinition, TestCaseKind, ThresholdSemantics};
pub use constraint::{Constraint, ConstraintViolation};
pub use error::{CatalogueError, MetricError, PersistenceError, Violations, MAX_REPORTED_VIOLATIONS};
pub use evaluation_config::{
    parse_filter_list, EvaluationConfig, EvaluationConfigError, ExtractedEvaluation,
};
pub use evidence::{EvidenceSink, Gap, MetricEvidence, RunRecord, MAX_EVIDENCE_REASONS};
pub use request::{
    Budget, CostSignal, DeploymentStage, Domain, EvaluateRequest, EvaluateResponse,
    EvaluationContext, MetricResult, MetricSelection, OverallStatus, RiskClass, RunConfig,
    RunEnvironment, RunMode, UserImpact,
};
pub use test_case::{TestCase, TEST_CASE_FIELDS};
