//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid value for '{field}' in '{section}': {reason}")]
    InvalidField {
        /// Section that failed validation.
        section: &'static str,
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Reading the configuration file failed.
    #[error("failed to read configuration file")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// File involved in the failure.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The configuration document was not valid YAML for the schema.
    #[error("failed to parse configuration document")]
    Parse {
        /// File involved in the failure, when parsing from disk.
        path: Option<PathBuf>,
        /// Source YAML error.
        source: serde_yaml::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: &'static str,
        field: &'static str,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section,
            field,
            value,
            reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn invalid_field_message_names_field_and_reason() {
        let err = ConfigError::invalid(
            "storage",
            "retention_secs",
            Some("0".into()),
            "must_be_positive",
        );
        assert_eq!(
            err.to_string(),
            "invalid value for 'retention_secs' in 'storage': must_be_positive"
        );
        assert!(err.source().is_none());
    }

    #[test]
    fn io_error_preserves_source() {
        let err = ConfigError::Io {
            operation: "config.read",
            path: PathBuf::from("soundry.yaml"),
            source: io::Error::other("denied"),
        };
        assert_eq!(err.to_string(), "failed to read configuration file");
        assert!(err.source().is_some());
    }
}
