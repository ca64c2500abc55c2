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

//! Request-level entry point
//!
//! Wraps the [`EvaluationRunner`] with run identity, status derivation and evidence
//! persistence. Only a persistence failure aborts a request.

use crate::runner::EvaluationRunner;
use chrono::Utc;
use metricgate_core::{
    EvaluateRequest, EvaluateResponse, EvidenceSink, MetricCatalogue, OverallStatus,
    PersistenceError, RunRecord,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("No metrics selected")]
    NoMetricsSelected,

    #[error("Evidence persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}

pub struct EvaluationService {
    runner: EvaluationRunner,
    sink: Arc<dyn EvidenceSink>,
}

impl EvaluationService {
    pub fn new(runner: EvaluationRunner, sink: Arc<dyn EvidenceSink>) -> Self {
        Self { runner, sink }
    }

    pub fn catalogue(&self) -> &Arc<MetricCatalogue> {
        self.runner.catalogue()
    }

    /// Run, record and summarise one evaluation request
    pub async fn evaluate(
        &self,
        request: EvaluateRequest,
    ) -> Result<EvaluateResponse, ServiceError> {
        if request.metrics.is_empty() {
            return Err(ServiceError::NoMetricsSelected);
        }

        let run_id = Uuid::new_v4().simple().to_string();
        let started_at = Utc::now();
        info!(
            run_id = %run_id,
            evaluation_object = %request.evaluation_object,
            use_case = %request.use_case,
            "Evaluation run started"
        );

        let outcome = self.runner.run(&request.metrics, &request.test_cases).await;
        let overall_status = OverallStatus::from_results(&outcome.metric_results);

        let EvaluateRequest {
            evaluation_object,
            use_case,
            context,
            run,
            metrics,
            test_cases,
        } = request;

        let record = RunRecord {
            run_id: run_id.clone(),
            started_at,
            finished_at: Utc::now(),
            evaluation_object,
            use_case,
            context,
            run,
            metrics,
            test_cases,
            metric_evidence: outcome.metric_evidence,
            gaps: outcome.gaps,
            metric_results: outcome.metric_results,
            overall_status,
        };

        let evidence_pointer = self.sink.persist(&record).map_err(|e| {
            error!(run_id = %run_id, error = %e, "Failed to persist evidence");
            e
        })?;

        info!(
            run_id = %run_id,
            status = ?overall_status,
            gaps = record.gaps.len(),
            "Evaluation run finished"
        );

        Ok(EvaluateResponse {
            run_id,
            overall_status,
            metric_results: record.metric_results,
            evidence_pointer,
        })
    }
}
