//! `GET /download/{name}`.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::Response,
};
use soundry_storage::StorageError;
use tracing::error;

use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn download_artifact(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let storage = state.dispatcher.storage();
    let artifact = storage.resolve_artifact(&name).await.map_err(|err| match err {
        StorageError::ArtifactNotFound { name } => {
            ApiError::not_found(format!("artifact '{name}' not found"))
        }
        other => {
            error!(error = %other, "failed to resolve artifact");
            ApiError::internal("failed to resolve artifact")
        }
    })?;
    let bytes = storage.read_artifact(&artifact).await.map_err(|err| {
        error!(error = %err, artifact = %artifact.file_name(), "failed to read artifact");
        ApiError::internal("failed to read artifact")
    })?;

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, artifact.content_type())
        .header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", artifact.file_name()),
        )
        .body(Body::from(bytes))
        .map_err(|err| {
            error!(error = %err, "failed to build download response");
            ApiError::internal("failed to build download response")
        })
}
