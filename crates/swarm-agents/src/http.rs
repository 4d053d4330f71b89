//! Orchestrator HTTP surface: `/api/v1/bridge`, `/api/v1/bridge/multi`,
//! `/healthz`. Thin handlers — all pipeline logic lives in
//! `coordination::orchestrator`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use coordination::config::AwConfig;
use coordination::error::{InputError, PipelineError};
use coordination::gateway::AgentGateway;
use coordination::orchestrator::{self, MultiRequest};
use coordination::sandbox::{SandboxTestRunner, Tester};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub config: AwConfig,
    pub gateway: AgentGateway,
    pub tester: Arc<dyn Tester>,
}

impl AppState {
    pub fn new(config: AwConfig) -> Self {
        let gateway = AgentGateway::new(config.agent_timeout);
        let tester: Arc<dyn Tester> = Arc::new(SandboxTestRunner::new(&config));
        Self {
            config,
            gateway,
            tester,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/bridge", post(bridge_best_of_n))
        .route("/api/v1/bridge/multi", post(bridge_multi))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> Json<Healthz> {
    Json(Healthz { status: "ok" })
}

/// Errors mapped to HTTP responses. `AppError` is the single boundary
/// between the pipeline's Rust error types and the wire.
pub enum AppError {
    Input(InputError),
    Pipeline(PipelineError),
}

impl From<InputError> for AppError {
    fn from(e: InputError) -> Self {
        AppError::Input(e)
    }
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        AppError::Pipeline(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Input(e) => {
                (StatusCode::BAD_REQUEST, Json(serde_json::json!({"error": e.to_string()})))
                    .into_response()
            }
            AppError::Pipeline(e) => (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response(),
        }
    }
}

fn validate_urls<'a>(
    role: &'static str,
    requested: usize,
    configured: &'a [String],
) -> Result<&'a [String], InputError> {
    if requested > configured.len() {
        return Err(InputError::InsufficientUrls {
            role,
            requested,
            configured: configured.len(),
        });
    }
    Ok(&configured[..requested])
}

#[derive(Debug, Deserialize)]
pub struct BridgeRequest {
    pub task: String,
    pub builders: usize,
}

async fn bridge_best_of_n(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BridgeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.task.trim().is_empty() {
        return Err(InputError::EmptyTask.into());
    }
    if !(1..=8).contains(&req.builders) {
        return Err(InputError::BuildersOutOfRange(req.builders).into());
    }
    let builder_urls = validate_urls("builder", req.builders, &state.config.builder_urls)?;

    let result = orchestrator::best_of_n(
        &req.task,
        builder_urls,
        &state.gateway,
        &state.tester,
        state.config.str_parallelism,
    )
    .await?;

    Ok(Json(serde_json::json!({
        "candidate_diffs": result.candidate_diffs,
        "candidate_tests": result.candidate_tests,
        "winner_index": result.winner_index,
    })))
}

#[derive(Debug, Deserialize)]
pub struct MultiBridgeRequest {
    pub task: String,
    pub builders: usize,
    #[serde(default)]
    pub reviewers: usize,
    #[serde(default)]
    pub specialists: usize,
}

async fn bridge_multi(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MultiBridgeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.task.trim().is_empty() {
        return Err(InputError::EmptyTask.into());
    }
    if !(1..=8).contains(&req.builders) {
        return Err(InputError::BuildersOutOfRange(req.builders).into());
    }
    if req.reviewers > 8 {
        return Err(InputError::ReviewersOutOfRange(req.reviewers).into());
    }
    if req.specialists > 8 {
        return Err(InputError::SpecialistsOutOfRange(req.specialists).into());
    }
    if state.config.planner_urls.is_empty() {
        return Err(InputError::InsufficientUrls {
            role: "planner",
            requested: 1,
            configured: 0,
        }
        .into());
    }

    let builder_urls = validate_urls("builder", req.builders, &state.config.builder_urls)?;
    let review_urls = validate_urls("reviewer", req.reviewers, &state.config.reviewer_urls)?;

    let multi_req = MultiRequest {
        task: &req.task,
        plan_urls: &state.config.planner_urls[..1],
        builder_urls,
        review_urls,
        specialists_per_component: req.specialists,
    };

    let cancel = CancellationToken::new();
    let result = orchestrator::multi(
        multi_req,
        &state.gateway,
        &state.tester,
        state.config.str_parallelism,
        &cancel,
    )
    .await?;

    Ok(Json(serde_json::to_value(&result).unwrap_or_default()))
}

#[derive(Debug, Serialize)]
pub struct Healthz {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_urls_rejects_insufficient_pool() {
        let configured = vec!["http://a".to_string()];
        let err = validate_urls("builder", 2, &configured).unwrap_err();
        assert!(matches!(err, InputError::InsufficientUrls { requested: 2, configured: 1, .. }));
    }

    #[test]
    fn validate_urls_slices_to_requested_count() {
        let configured = vec!["http://a".to_string(), "http://b".to_string(), "http://c".to_string()];
        let slice = validate_urls("builder", 2, &configured).unwrap();
        assert_eq!(slice.len(), 2);
    }
}
