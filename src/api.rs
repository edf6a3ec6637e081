use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::{
    loader::LoadRole,
    models::JobKind,
    worker::submit_job,
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct LoadRequest {
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeChildRequest {
    pub parent_id: String,
    pub child_id: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/sync", post(trigger_sync))
        .route("/v1/load", post(trigger_load))
        .route("/v1/jobs/{job_id}", get(get_job))
        .route("/v1/graph/make-child", post(make_child))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": {
                "code": code,
                "message": message.into()
            }
        })),
    )
        .into_response()
}

pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "ok": !state.pool.is_closed(),
        "namespace": state.config.namespace,
        "timestamp": Utc::now()
    }))
}

pub async fn trigger_sync(State(state): State<AppState>) -> Response {
    enqueue(&state, JobKind::Sync, None).await
}

pub async fn trigger_load(
    State(state): State<AppState>,
    payload: Option<Json<LoadRequest>>,
) -> Response {
    let role = payload
        .and_then(|Json(req)| req.role)
        .map(|role| LoadRole::parse(&role));
    enqueue(&state, JobKind::Load, role).await
}

async fn enqueue(state: &AppState, kind: JobKind, role: Option<LoadRole>) -> Response {
    match submit_job(state, kind, role).await {
        Ok(record) => (StatusCode::ACCEPTED, Json(record.to_response())).into_response(),
        Err(err) => {
            warn!("Failed to queue job: {err:#}");
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "QUEUE_UNAVAILABLE",
                "Job queue is unavailable.",
            )
        }
    }
}

pub async fn get_job(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    let jobs = state.jobs.read().await;
    let Some(job) = jobs.get(&job_id) else {
        return error_response(StatusCode::NOT_FOUND, "JOB_NOT_FOUND", "Job not found.");
    };
    (StatusCode::OK, Json(job.to_response())).into_response()
}

/// Runs the panel merge for a detected parent/child pair.
pub async fn make_child(
    State(state): State<AppState>,
    Json(payload): Json<MakeChildRequest>,
) -> Response {
    if payload.parent_id.trim().is_empty() || payload.child_id.trim().is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_MAKE_CHILD_REQUEST",
            "parentId and childId are required.",
        );
    }
    match state
        .graph
        .make_child(&payload.parent_id, &payload.child_id)
        .await
    {
        Ok(changed) => (StatusCode::OK, Json(json!({ "changed": changed }))).into_response(),
        Err(err) => {
            warn!(parent = %payload.parent_id, child = %payload.child_id, "make_child failed: {err:#}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "GRAPH_UPDATE_FAILED",
                format!("{err:#}"),
            )
        }
    }
}
