//! Health and diagnostics endpoints.

use std::sync::Arc;

use axum::{Json, body::Body, extract::State, http::StatusCode, response::Response};
use soundry_api_models::{HealthMetrics, HealthResponse, MethodStatus};
use soundry_backends::RegisteredBackend;
use soundry_telemetry::build_sha;
use tracing::error;

use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let methods = state
        .dispatcher
        .registry()
        .iter()
        .map(method_status)
        .collect();
    let snapshot = state.telemetry.snapshot();

    Json(HealthResponse {
        status: "ok".to_string(),
        build: build_sha().to_string(),
        started_at: state.started_at,
        methods,
        metrics: HealthMetrics {
            processing_active_jobs: snapshot.processing_active_jobs,
            retention_files_removed_total: snapshot.retention_files_removed_total,
            retention_failures_total: snapshot.retention_failures_total,
            upload_bytes_total: snapshot.upload_bytes_total,
        },
    })
}

fn method_status(entry: &RegisteredBackend) -> MethodStatus {
    MethodStatus {
        name: entry.name().to_string(),
        aliases: entry
            .backend()
            .aliases()
            .iter()
            .map(ToString::to_string)
            .collect(),
        enabled: entry.is_enabled(),
    }
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.telemetry.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )
            .body(Body::from(body))
            .map_err(|err| {
                error!(error = %err, "failed to build metrics response");
                ApiError::internal("failed to build metrics response")
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            Err(ApiError::internal("failed to render metrics"))
        }
    }
}
