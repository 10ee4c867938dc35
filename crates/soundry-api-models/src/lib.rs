#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links
)]
//! Shared HTTP DTOs for the Soundry API.
//!
//! Kept free of server dependencies so clients and tests can decode responses
//! with the same types the handlers encode.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// RFC9457-compatible problem document surfaced on validation/runtime errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    /// URI reference identifying the problem type.
    pub kind: String,
    /// Short, human-readable summary of the issue.
    pub title: String,
    /// HTTP status code associated with the error.
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Detailed diagnostic message when available.
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Parameters that failed validation, if applicable.
    pub invalid_params: Option<Vec<ProblemInvalidParam>>,
}

/// Invalid parameter pointer surfaced alongside a [`ProblemDetails`] payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemInvalidParam {
    /// JSON Pointer to the offending field.
    pub pointer: String,
    /// Human-readable description of the validation failure.
    pub message: String,
}

/// Body returned by `POST /process/{method}` on success.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessResponse {
    /// `<method> processing complete`.
    pub status: String,
    /// Canonical method that handled the request.
    pub method: String,
    /// Token shared by the upload and its artifact.
    pub token: String,
    /// Where the artifact can be fetched.
    pub download_url: String,
}

impl ProcessResponse {
    /// Build the success body for `method`.
    #[must_use]
    pub fn completed(method: &str, token: String, download_url: String) -> Self {
        Self {
            status: format!("{method} processing complete"),
            method: method.to_string(),
            token,
            download_url,
        }
    }
}

/// Registered method and whether it accepts requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MethodStatus {
    /// Canonical method name.
    pub name: String,
    /// Alternative names resolving to the method.
    pub aliases: Vec<String>,
    /// Whether requests are served.
    pub enabled: bool,
}

/// Counters surfaced on the health endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthMetrics {
    /// Backend invocations in flight.
    pub processing_active_jobs: i64,
    /// Files removed by retention sweeps.
    pub retention_files_removed_total: u64,
    /// Files retention sweeps failed to remove.
    pub retention_failures_total: u64,
    /// Upload bytes persisted.
    pub upload_bytes_total: u64,
}

/// Body returned by `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `ok` while the listener answers.
    pub status: String,
    /// Build identifier.
    pub build: String,
    /// When the service started.
    pub started_at: DateTime<Utc>,
    /// Registered methods in registration order.
    pub methods: Vec<MethodStatus>,
    /// Selected counters.
    pub metrics: HealthMetrics,
}
