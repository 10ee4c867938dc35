//! HTTP surface modules (router, handlers, problem errors, middleware).

/// Shared constants and header names.
pub mod constants;
/// Artifact download handler.
pub mod download;
/// Problem response helpers and error types.
pub mod errors;
/// Health and metrics endpoints.
pub mod health;
/// Upload processing handler.
pub mod process;
/// Router construction and server host.
pub mod router;
/// Metrics middleware for HTTP requests.
pub mod telemetry;
