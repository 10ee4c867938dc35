//! Validation helpers for loaded configuration.

use std::path::Path;

use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{ServerConfig, ServiceConfig, StorageConfig};

/// Check every section of `config`, returning the first violation.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] naming the section, field, and reason.
pub fn validate(config: &ServiceConfig) -> ConfigResult<()> {
    validate_server(&config.server)?;
    validate_storage(&config.storage)?;

    if config.methods.enabled.iter().any(|name| name.trim().is_empty()) {
        return Err(ConfigError::invalid(
            "methods",
            "enabled",
            None,
            "empty_method_name",
        ));
    }

    ensure_positive("processing", "timeout_secs", config.processing.timeout_secs)?;
    ensure_positive(
        "processing",
        "concurrency",
        u64::try_from(config.processing.concurrency).unwrap_or(u64::MAX),
    )?;

    ensure_command("separation", &config.separation.command)?;
    ensure_non_empty("separation", "model", &config.separation.model)?;
    ensure_non_empty("separation", "stem", &config.separation.stem)?;
    ensure_command("spleeter", &config.spleeter.command)?;
    ensure_non_empty("spleeter", "preset", &config.spleeter.preset)?;
    ensure_non_empty("spleeter", "stem", &config.spleeter.stem)?;

    let threshold = config.voice_activity.threshold;
    if !(threshold > 0.0 && threshold < 1.0) {
        return Err(ConfigError::invalid(
            "voice_activity",
            "threshold",
            Some(threshold.to_string()),
            "must_be_between_zero_and_one",
        ));
    }

    ensure_non_empty("logging", "level", &config.logging.level)?;
    if let Some(format) = config.logging.format.as_deref()
        && !matches!(format, "json" | "pretty")
    {
        return Err(ConfigError::invalid(
            "logging",
            "format",
            Some(format.to_string()),
            "unknown_format",
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> ConfigResult<()> {
    if let Some(base) = server.public_base_url.as_deref() {
        let parsed = Url::parse(base).map_err(|_| {
            ConfigError::invalid(
                "server",
                "public_base_url",
                Some(base.to_string()),
                "not_a_url",
            )
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "server",
                "public_base_url",
                Some(base.to_string()),
                "unsupported_scheme",
            ));
        }
    }

    for origin in &server.cors_origins {
        if !is_origin(origin) {
            return Err(ConfigError::invalid(
                "server",
                "cors_origins",
                Some(origin.clone()),
                "not_an_origin",
            ));
        }
    }
    Ok(())
}

fn validate_storage(storage: &StorageConfig) -> ConfigResult<()> {
    ensure_dir("upload_dir", &storage.upload_dir)?;
    ensure_dir("output_dir", &storage.output_dir)?;
    ensure_dir("scratch_dir", &storage.scratch_dir)?;
    if storage.upload_dir == storage.output_dir {
        return Err(ConfigError::invalid(
            "storage",
            "output_dir",
            Some(storage.output_dir.display().to_string()),
            "must_differ_from_upload_dir",
        ));
    }
    ensure_positive("storage", "retention_secs", storage.retention_secs)?;
    ensure_positive(
        "storage",
        "max_upload_bytes",
        u64::try_from(storage.max_upload_bytes).unwrap_or(u64::MAX),
    )?;
    if let Some(interval) = storage.sweep_interval_secs {
        ensure_positive("storage", "sweep_interval_secs", interval)?;
    }
    Ok(())
}

/// An origin is `scheme://host[:port]` with no path, query, or fragment.
fn is_origin(value: &str) -> bool {
    Url::parse(value).is_ok_and(|url| {
        matches!(url.scheme(), "http" | "https")
            && url.origin().ascii_serialization() == value
    })
}

fn ensure_dir(field: &'static str, path: &Path) -> ConfigResult<()> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::invalid("storage", field, None, "empty_path"));
    }
    Ok(())
}

fn ensure_positive(section: &'static str, field: &'static str, value: u64) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::invalid(
            section,
            field,
            Some(value.to_string()),
            "must_be_positive",
        ));
    }
    Ok(())
}

fn ensure_non_empty(section: &'static str, field: &'static str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(section, field, None, "empty_value"));
    }
    Ok(())
}

fn ensure_command(section: &'static str, command: &[String]) -> ConfigResult<()> {
    match command.first() {
        Some(program) if !program.trim().is_empty() => Ok(()),
        _ => Err(ConfigError::invalid(section, "command", None, "empty_command")),
    }
}
