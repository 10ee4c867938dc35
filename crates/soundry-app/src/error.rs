//! # Design
//!
//! - Centralize application-level errors for bootstrap and serving.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration loading or validation failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: soundry_config::ConfigError,
    },
    /// Rendering the effective configuration failed.
    #[error("failed to render configuration")]
    RenderConfig {
        /// Source YAML error.
        source: serde_yaml::Error,
    },
    /// Telemetry setup failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: soundry_telemetry::TelemetryError,
    },
    /// Preparing storage areas failed.
    #[error("storage operation failed")]
    Storage {
        /// Operation identifier.
        operation: &'static str,
        /// Source storage error.
        source: soundry_storage::StorageError,
    },
    /// Building the backend registry failed.
    #[error("backend registry construction failed")]
    Registry {
        /// Source registry error.
        source: soundry_backends::RegistryError,
    },
    /// API server operations failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        source: soundry_api::ApiServerError,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: soundry_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: soundry_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn storage(
        operation: &'static str,
        source: soundry_storage::StorageError,
    ) -> Self {
        Self::Storage { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: soundry_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }
}
