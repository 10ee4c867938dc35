#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links
)]
#![allow(clippy::module_name_repetitions)]

//! Telemetry primitives shared across the Soundry workspace.
//!
//! Layout: `init.rs` (subscriber setup), `layers.rs` (request-id layers),
//! `context.rs` (task-local request context), `metrics.rs` (Prometheus
//! registry), `error.rs` (error types).

pub mod context;
pub mod error;
pub mod init;
pub mod layers;
pub mod metrics;

pub use context::{current_request_id, current_route, with_request_context};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
pub use layers::{propagate_request_id_layer, set_request_id_layer};
pub use metrics::{JobOutcome, Metrics, MetricsSnapshot};
