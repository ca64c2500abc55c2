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

use super::{ApiError, AppState};
use axum::{
    extract::{Path, State},
    Json,
};
use metricgate_core::{MetricDefinition, TestCaseKind, ThresholdSemantics};
use serde::Serialize;

/// Catalogue listing entry
#[derive(Debug, Serialize)]
pub struct MetricSummary {
    pub metric_id: String,
    pub metric_name: String,
    pub category: String,
    pub test_case_kind: TestCaseKind,
    pub threshold_semantics: ThresholdSemantics,
    pub required_test_case_fields: Vec<String>,
    pub required_init_params: Vec<String>,
}

impl From<&MetricDefinition> for MetricSummary {
    fn from(def: &MetricDefinition) -> Self {
        Self {
            metric_id: def.metric_id.clone(),
            metric_name: def.metric_name.clone(),
            category: def.category.clone(),
            test_case_kind: def.test_case_kind,
            threshold_semantics: def.threshold_semantics,
            required_test_case_fields: def.required_test_case_fields.clone(),
            required_init_params: def.required_init_params.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricListResponse {
    pub metrics: Vec<MetricSummary>,
    pub total: usize,
}

/// GET /v1/metrics
pub async fn list_metrics(State(state): State<AppState>) -> Json<MetricListResponse> {
    let metrics: Vec<MetricSummary> = state
        .service
        .catalogue()
        .iter()
        .map(MetricSummary::from)
        .collect();
    let total = metrics.len();
    Json(MetricListResponse { metrics, total })
}

/// GET /v1/metrics/:metric_id
pub async fn get_metric(
    State(state): State<AppState>,
    Path(metric_id): Path<String>,
) -> Result<Json<MetricDefinition>, ApiError> {
    state
        .service
        .catalogue()
        .get(&metric_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Metric '{}' is not in the catalogue", metric_id)))
}
