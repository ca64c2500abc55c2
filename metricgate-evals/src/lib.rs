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

//! # Metricgate Evaluation Engine
//!
//! Resolves catalogue metrics to scorers, validates requests against their
//! definitions, and runs them with per-metric failure isolation.
//!
//! ## Features
//!
//! - **Registered-factory resolver**: scorer classes are registered by name at startup
//! - **Built-in scorers**: exact match, pattern, JSON schema, tool correctness and
//!   LLM-as-judge rubrics
//! - **Validation layer**: required init params, required test-case fields, constraints
//! - **Runner**: one result per selection, no failure aborts the batch
//! - **Evidence**: every run is recorded through an [`EvidenceSink`](metricgate_core::EvidenceSink)
//!
//! ## Example
//!
//! ```rust,ignore
//! use metricgate_core::MetricCatalogue;
//! use metricgate_evals::{
//!     EvaluationRunner, EvaluationService, JudgeModelConfig, OpenAICompatibleConnector,
//!     ScorerLibrary,
//! };
//! use metricgate_storage::FileEvidenceStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let catalogue = Arc::new(MetricCatalogue::load("catalogue/metrics.schema.yaml")?);
//!     let judge = JudgeModelConfig::default();
//!     let library = Arc::new(ScorerLibrary::with_builtin(Arc::new(
//!         OpenAICompatibleConnector::new(judge.clone()),
//!     )));
//!
//!     let runner = EvaluationRunner::new(catalogue, library).with_judge_defaults(judge);
//!     let service = EvaluationService::new(runner, Arc::new(FileEvidenceStore::new("./artifacts")));
//!
//!     let request = serde_json::from_str(&std::fs::read_to_string("request.json")?)?;
//!     let response = service.evaluate(request).await?;
//!     println!("{:?}: {}", response.overall_status, response.evidence_pointer);
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod init_params;
pub mod judge;
pub mod llm_client;
pub mod resolver;
pub mod runner;
pub mod scorer;
pub mod scorers;
pub mod service;
pub mod validation;

pub use adapter::{adapt, AdapterError, LlmTestCase, ToolCall};
pub use init_params::InitParams;
pub use judge::{
    ask_judge, FixedClientConnector, JudgeConnector, JudgeModelConfig, JudgeVerdict,
    OpenAICompatibleConnector,
};
pub use llm_client::{LLMClient, LLMError, LLMResponse, OpenAIClient, TokenUsage};
pub use resolver::{DuplicateClass, ResolveError, ScorerFactory, ScorerLibrary};
pub use runner::{EvaluationRunner, MetricState, RunOutcome, MODEL_PARAM};
pub use scorer::{Measurement, Scorer, ScorerError};
pub use service::{EvaluationService, ServiceError};
pub use validation::{
    merge_init_params, undeclared_params, validate_init_params, validate_test_cases,
};
