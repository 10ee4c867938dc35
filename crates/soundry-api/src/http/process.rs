//! `POST /process/{method}`.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use soundry_api_models::ProcessResponse;
use tracing::debug;

use crate::dispatch::DispatchError;
use crate::http::constants::FILE_FIELD;
use crate::http::errors::ApiError;
use crate::state::ApiState;

/// File part pulled out of a multipart body.
#[derive(Debug)]
struct FilePart {
    filename: String,
    bytes: Vec<u8>,
}

pub(crate) async fn process_audio(
    State(state): State<Arc<ApiState>>,
    Path(method): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let multipart = multipart.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let part = read_file_part(multipart)
        .await?
        .ok_or_else(|| ApiError::from(DispatchError::MissingFile))?;
    debug!(filename = %part.filename, bytes = part.bytes.len(), "upload received");

    let processed = state
        .dispatcher
        .process(&method, &part.filename, &part.bytes)
        .await?;

    let name = processed.artifact.file_name();
    Ok(Json(ProcessResponse::completed(
        processed.method,
        processed.upload.identity.token.to_string(),
        state.download_url(&name),
    )))
}

/// Pick the `file` field, else the first field carrying a filename.
async fn read_file_part(mut multipart: Multipart) -> Result<Option<FilePart>, ApiError> {
    let mut fallback = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let named_file = field.name() == Some(FILE_FIELD);
        if !named_file && (fallback.is_some() || field.file_name().is_none()) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
        let part = FilePart { filename, bytes };
        if named_file {
            return Ok(Some(part));
        }
        fallback = Some(part);
    }
    Ok(fallback)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("upload exceeds the configured size limit")
    } else {
        ApiError::bad_request(format!("malformed multipart body: {}", err.body_text()))
    }
}
