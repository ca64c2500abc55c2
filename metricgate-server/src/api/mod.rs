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

pub mod evaluate;
pub mod evidence;
pub mod health;
pub mod metrics;

pub use evaluate::{evaluate, evaluate_from_config, EvaluateFromConfigRequest};
pub use evidence::get_evidence;
pub use health::health_check;
pub use metrics::{get_metric, list_metrics, MetricSummary};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metricgate_evals::{EvaluationService, ServiceError};
use metricgate_storage::FileEvidenceStore;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NoMetricsSelected => ApiError::BadRequest(err.to_string()),
            ServiceError::Persistence(_) => ApiError::Internal(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EvaluationService>,
    /// Read side of the evidence sink the service writes to
    pub store: Arc<FileEvidenceStore>,
    pub default_threshold: f64,
    pub eval_config_path: Option<PathBuf>,
}
