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

pub mod api;
pub mod config;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use metricgate_core::MetricCatalogue;
use metricgate_evals::{
    EvaluationRunner, EvaluationService, OpenAICompatibleConnector, ScorerLibrary,
};
use metricgate_storage::FileEvidenceStore;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::{
    evaluate, evaluate_from_config, get_evidence, get_metric, health_check, list_metrics,
    AppState,
};
use config::ServerConfig;

/// Build the shared state: catalogue, scorer library, runner and evidence store
///
/// Fails if the catalogue cannot be loaded; no partial catalogue is ever served.
pub fn build_state(config: &ServerConfig) -> Result<AppState> {
    let catalogue = MetricCatalogue::load(&config.catalogue.path).with_context(|| {
        format!("failed to load metric catalogue {:?}", config.catalogue.path)
    })?;
    tracing::info!(
        metrics = catalogue.len(),
        path = ?config.catalogue.path,
        "Metric catalogue loaded"
    );

    let connector = Arc::new(OpenAICompatibleConnector::new(config.judge.clone()));
    let library = ScorerLibrary::with_builtin(connector);

    let unresolvable: Vec<&str> = catalogue
        .iter()
        .filter(|def| !library.contains(&def.scorer_class))
        .map(|def| def.metric_id.as_str())
        .collect();
    if !unresolvable.is_empty() {
        tracing::warn!(
            metrics = ?unresolvable,
            "Catalogue metrics without a registered scorer will fail at resolution"
        );
    }

    let runner = EvaluationRunner::new(Arc::new(catalogue), Arc::new(library))
        .with_judge_defaults(config.judge.clone())
        .with_policy(config.evaluation.policy());

    let store = Arc::new(FileEvidenceStore::new(config.storage.artifact_dir.clone()));
    let service = Arc::new(EvaluationService::new(runner, store.clone()));

    Ok(AppState {
        service,
        store,
        default_threshold: config.evaluation.default_threshold,
        eval_config_path: config.evaluation.config_path.clone(),
    })
}

/// Application router with tracing, timeout and optional CORS layers
pub fn build_router(state: AppState, request_timeout: Duration, enable_cors: bool) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/v1/evaluate", post(evaluate))
        .route("/v1/evaluate-from-config", post(evaluate_from_config))
        .route("/v1/metrics", get(list_metrics))
        .route("/v1/metrics/:metric_id", get(get_metric))
        .route("/v1/runs/:run_id/evidence", get(get_evidence))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout));

    let router = if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http())
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "metricgate_server=info,metricgate_evals=info,metricgate_storage=info,tower_http=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Metricgate Server");
    tracing::info!(
        listen_addr = %config.server.listen_addr,
        catalogue = ?config.catalogue.path,
        artifact_dir = ?config.storage.artifact_dir,
        judge_model = %config.judge.model,
        judge_base_url = %config.judge.base_url,
        "Configuration"
    );

    // Validate configuration
    config.validate()?;
    let addr = config.socket_addr()?;

    let state = build_state(&config)?;
    let app = build_router(state, config.request_timeout(), config.server.enable_cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
