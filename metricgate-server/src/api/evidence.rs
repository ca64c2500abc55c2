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
use metricgate_core::{PersistenceError, RunRecord};

/// GET /v1/runs/:run_id/evidence
pub async fn get_evidence(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunRecord>, ApiError> {
    match state.store.load(&run_id) {
        Ok(record) => Ok(Json(record)),
        Err(e @ PersistenceError::NotFound(_)) => Err(ApiError::NotFound(e.to_string())),
        Err(e @ PersistenceError::InvalidRunId(_)) => Err(ApiError::BadRequest(e.to_string())),
        Err(e) => {
            tracing::error!(run_id = %run_id, error = %e, "Failed to load evidence");
            Err(ApiError::Internal(e.to_string()))
        }
    }
}
