//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers; loading lives in `loader.rs`, checks in `validate.rs`.
//! - Every section is `#[serde(default)]` so a YAML file only lists overrides.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;

/// Root configuration object handed to the service at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Listener and browser-facing settings.
    pub server: ServerConfig,
    /// Upload/output areas and retention policy.
    pub storage: StorageConfig,
    /// Which registered methods answer requests.
    pub methods: MethodsConfig,
    /// Limits applied around every backend invocation.
    pub processing: ProcessingConfig,
    /// Demucs-backed separation settings.
    pub separation: SeparationConfig,
    /// Spleeter-backed separation settings.
    pub spleeter: SpleeterConfig,
    /// Voice-activity filtering settings.
    pub voice_activity: VoiceActivityConfig,
    /// Log output settings.
    pub logging: LoggingSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the API binds to.
    pub bind_addr: SocketAddr,
    /// Absolute base used to build download URLs; relative paths when unset.
    pub public_base_url: Option<String>,
    /// Browser origins allowed to call the API with credentials.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((defaults::BIND_IP, defaults::BIND_PORT)),
            public_base_url: None,
            cors_origins: vec![defaults::CORS_ORIGIN.to_string()],
        }
    }
}

/// Filesystem areas and the retention policy applied to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory receiving raw uploads.
    pub upload_dir: PathBuf,
    /// Directory holding produced artifacts.
    pub output_dir: PathBuf,
    /// Directory where external tools write intermediate stems.
    pub scratch_dir: PathBuf,
    /// Files older than this many seconds are swept.
    pub retention_secs: u64,
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: usize,
    /// Run the sweeper in the background every N seconds when set.
    pub sweep_interval_secs: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from(defaults::UPLOAD_DIR),
            output_dir: PathBuf::from(defaults::OUTPUT_DIR),
            scratch_dir: PathBuf::from(defaults::SCRATCH_DIR),
            retention_secs: defaults::RETENTION_SECS,
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
            sweep_interval_secs: None,
        }
    }
}

impl StorageConfig {
    /// Retention threshold as a [`Duration`].
    #[must_use]
    pub const fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Background sweep interval, if enabled.
    #[must_use]
    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs.map(Duration::from_secs)
    }
}

/// Method enablement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MethodsConfig {
    /// Canonical method names that accept requests; other registered
    /// methods answer `503`.
    pub enabled: Vec<String>,
}

impl Default for MethodsConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::ENABLED_METHODS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

impl MethodsConfig {
    /// Whether `name` is listed as enabled.
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.iter().any(|enabled| enabled == name)
    }
}

/// Limits applied around backend invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Upper bound for a single backend call, in seconds.
    pub timeout_secs: u64,
    /// Concurrent invocations permitted per backend.
    pub concurrency: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::PROCESSING_TIMEOUT_SECS,
            concurrency: defaults::BACKEND_CONCURRENCY,
        }
    }
}

impl ProcessingConfig {
    /// Backend timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Demucs invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeparationConfig {
    /// Program followed by leading arguments.
    pub command: Vec<String>,
    /// Model name passed with `-n`.
    pub model: String,
    /// Stem copied to the output area.
    pub stem: String,
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            command: defaults::DEMUCS_COMMAND
                .iter()
                .map(ToString::to_string)
                .collect(),
            model: defaults::DEMUCS_MODEL.to_string(),
            stem: defaults::STEM.to_string(),
        }
    }
}

/// Spleeter invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpleeterConfig {
    /// Program followed by leading arguments.
    pub command: Vec<String>,
    /// Model preset passed with `-p`.
    pub preset: String,
    /// Stem copied to the output area.
    pub stem: String,
}

impl Default for SpleeterConfig {
    fn default() -> Self {
        Self {
            command: defaults::SPLEETER_COMMAND
                .iter()
                .map(ToString::to_string)
                .collect(),
            preset: defaults::SPLEETER_PRESET.to_string(),
            stem: defaults::STEM.to_string(),
        }
    }
}

/// Voice-activity filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VoiceActivityConfig {
    /// Probability a frame must exceed to count as speech.
    pub threshold: f32,
}

impl Default for VoiceActivityConfig {
    fn default() -> Self {
        Self {
            threshold: defaults::VAD_THRESHOLD,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Level directive used when `RUST_LOG` is unset.
    pub level: String,
    /// `json` or `pretty`; inferred from the build profile when unset.
    pub format: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            format: None,
        }
    }
}
