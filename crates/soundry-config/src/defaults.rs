//! Built-in configuration values used when neither the YAML file nor the
//! environment provide one.

/// Default listener interface.
pub const BIND_IP: [u8; 4] = [127, 0, 0, 1];
/// Default listener port.
pub const BIND_PORT: u16 = 8000;
/// Default upload area.
pub const UPLOAD_DIR: &str = "uploads";
/// Default output area.
pub const OUTPUT_DIR: &str = "outputs";
/// Default scratch area for external separation tools.
pub const SCRATCH_DIR: &str = "separated";
/// Age after which uploads and outputs are swept (one hour).
pub const RETENTION_SECS: u64 = 60 * 60;
/// Largest accepted request body (100 MiB).
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
/// Methods served out of the box. `spleeter` is registered but stays off.
pub const ENABLED_METHODS: &[&str] = &["separation", "denoise", "voice-activity"];
/// Upper bound for one backend invocation.
pub const PROCESSING_TIMEOUT_SECS: u64 = 600;
/// Concurrent invocations allowed per backend.
pub const BACKEND_CONCURRENCY: usize = 1;
/// Separation tool invocation.
pub const DEMUCS_COMMAND: &[&str] = &["demucs"];
/// Demucs model name; also the first directory level of its output tree.
pub const DEMUCS_MODEL: &str = "htdemucs";
/// Spleeter invocation.
pub const SPLEETER_COMMAND: &[&str] = &["spleeter"];
/// Spleeter model preset.
pub const SPLEETER_PRESET: &str = "spleeter:2stems";
/// Stem relocated to the output area after separation.
pub const STEM: &str = "vocals";
/// Speech probability a frame must exceed to be kept.
pub const VAD_THRESHOLD: f32 = 0.5;
/// Browser origin allowed by default.
pub const CORS_ORIGIN: &str = "http://localhost:3000";
/// Default log level.
pub const LOG_LEVEL: &str = "info";
