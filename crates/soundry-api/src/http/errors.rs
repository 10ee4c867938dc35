//! RFC9457-style API error wrapper.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use soundry_api_models::ProblemDetails;
use tracing::error;

use crate::dispatch::DispatchError;
use crate::http::constants::{
    PROBLEM_BAD_REQUEST, PROBLEM_INTERNAL, PROBLEM_NOT_FOUND, PROBLEM_PAYLOAD_TOO_LARGE,
    PROBLEM_PROCESSING_FAILED, PROBLEM_SERVICE_UNAVAILABLE,
};

/// Structured API error with optional RFC9457 fields.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) kind: &'static str,
    title: &'static str,
    detail: Option<String>,
}

impl ApiError {
    const fn new(status: StatusCode, kind: &'static str, title: &'static str) -> Self {
        Self {
            status,
            kind,
            title,
            detail: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_INTERNAL,
            "internal server error",
        )
        .with_detail(message)
    }

    pub(crate) fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, PROBLEM_BAD_REQUEST, "bad request").with_detail(detail)
    }

    pub(crate) fn not_found(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            PROBLEM_NOT_FOUND,
            "resource not found",
        )
        .with_detail(detail)
    }

    pub(crate) fn service_unavailable(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            PROBLEM_SERVICE_UNAVAILABLE,
            "service unavailable",
        )
        .with_detail(detail)
    }

    pub(crate) fn processing(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            PROBLEM_PROCESSING_FAILED,
            "processing failed",
        )
        .with_detail(detail)
    }

    pub(crate) fn payload_too_large(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            PROBLEM_PAYLOAD_TOO_LARGE,
            "payload too large",
        )
        .with_detail(detail)
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        let detail = err.detail();
        match err {
            DispatchError::UnsupportedFileType { .. }
            | DispatchError::UnknownMethod { .. }
            | DispatchError::MissingFile => Self::bad_request(detail),
            DispatchError::MethodDisabled { .. } => Self::service_unavailable(detail),
            DispatchError::Processing { .. } | DispatchError::TimedOut { .. } => {
                Self::processing(detail)
            }
            DispatchError::Storage { source } => {
                error!(error = %source, "failed to persist upload");
                Self::internal(detail)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ProblemDetails {
            kind: self.kind.to_string(),
            title: self.title.to_string(),
            status: self.status.as_u16(),
            detail: self.detail,
            invalid_params: None,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn dispatch_errors_map_to_statuses() {
        let cases = [
            (
                DispatchError::UnsupportedFileType {
                    value: Some("txt".into()),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                DispatchError::UnknownMethod {
                    method: "karaoke".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (DispatchError::MissingFile, StatusCode::BAD_REQUEST),
            (
                DispatchError::MethodDisabled { method: "spleeter" },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                DispatchError::TimedOut {
                    method: "separation",
                    limit: Duration::from_secs(1),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn processing_failure_embeds_backend_message() {
        let err = ApiError::from(DispatchError::Processing {
            method: "denoise",
            message: "input must be sampled at 48000 Hz, got 44100 Hz".into(),
        });
        assert_eq!(err.kind, PROBLEM_PROCESSING_FAILED);
        assert_eq!(
            err.detail.as_deref(),
            Some("input must be sampled at 48000 Hz, got 44100 Hz")
        );
    }
}
