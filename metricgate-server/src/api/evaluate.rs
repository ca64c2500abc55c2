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

//! Evaluation endpoints
//!
//! Thin adapters from HTTP bodies to [`EvaluationService::evaluate`]; structural
//! validation of the request happens during JSON deserialization.
//!
//! [`EvaluationService::evaluate`]: metricgate_evals::EvaluationService::evaluate

use super::{ApiError, AppState};
use axum::{extract::State, Json};
use metricgate_core::{
    parse_filter_list, EvaluateRequest, EvaluateResponse, EvaluationConfig,
    EvaluationConfigError, EvaluationContext, RunConfig,
};
use serde::Deserialize;
use tracing::{debug, info};

/// POST /v1/evaluate
pub async fn evaluate(
    State(state): State<AppState>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    debug!(
        metrics = req.metrics.len(),
        test_cases = req.test_cases.len(),
        "Evaluate request received"
    );
    let response = state.service.evaluate(req).await?;
    Ok(Json(response))
}

/// Request to evaluate the test cases of an evaluation config
#[derive(Debug, Deserialize)]
pub struct EvaluateFromConfigRequest {
    pub evaluation_id: String,
    pub evaluation_name: String,
    /// Comma-separated goal labels; empty selects every goal
    #[serde(default)]
    pub goals: Option<String>,
    /// Comma-separated metric labels; empty selects every metric
    #[serde(default)]
    pub metrics: Option<String>,
    pub context: EvaluationContext,
    pub run: RunConfig,
    /// Inline config; the server's configured document is used when absent
    #[serde(default)]
    pub config: Option<EvaluationConfig>,
}

/// POST /v1/evaluate-from-config
pub async fn evaluate_from_config(
    State(state): State<AppState>,
    Json(req): Json<EvaluateFromConfigRequest>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    let config = match req.config {
        Some(config) => config,
        None => {
            let path = state.eval_config_path.as_ref().ok_or_else(|| {
                ApiError::BadRequest(
                    "No evaluation config supplied and none is configured".to_string(),
                )
            })?;
            EvaluationConfig::load(path).map_err(|e| match e {
                EvaluationConfigError::NotFound(_) | EvaluationConfigError::Parse(_) => {
                    ApiError::BadRequest(e.to_string())
                }
                EvaluationConfigError::Io { .. } => ApiError::Internal(e.to_string()),
            })?
        }
    };

    let goals = parse_filter_list(req.goals.as_deref());
    let metrics = parse_filter_list(req.metrics.as_deref());
    let extracted = config.extract(
        &goals,
        &metrics,
        state.service.catalogue(),
        state.default_threshold,
    );

    if extracted.metrics.is_empty() {
        return Err(ApiError::BadRequest(
            "No metrics matched the requested goals and metrics".to_string(),
        ));
    }
    info!(
        evaluation_id = %req.evaluation_id,
        metrics = extracted.metrics.len(),
        test_cases = extracted.test_cases.len(),
        "Evaluating from config"
    );

    let request = EvaluateRequest {
        evaluation_object: req.evaluation_name,
        use_case: req.evaluation_id,
        context: req.context,
        run: req.run,
        metrics: extracted.metrics,
        test_cases: extracted.test_cases,
    };
    let response = state.service.evaluate(request).await?;
    Ok(Json(response))
}
