//! Configuration loading: built-in defaults, then an optional YAML file, then
//! `SOUNDRY_*` environment overrides, then validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::ServiceConfig;
use crate::validate::validate;

/// Environment variable naming the YAML file when no path is passed.
pub const ENV_CONFIG_PATH: &str = "SOUNDRY_CONFIG";

const ENV_BIND_ADDR: &str = "SOUNDRY_BIND_ADDR";
const ENV_PUBLIC_BASE_URL: &str = "SOUNDRY_PUBLIC_BASE_URL";
const ENV_UPLOAD_DIR: &str = "SOUNDRY_UPLOAD_DIR";
const ENV_OUTPUT_DIR: &str = "SOUNDRY_OUTPUT_DIR";
const ENV_SCRATCH_DIR: &str = "SOUNDRY_SCRATCH_DIR";
const ENV_RETENTION_SECS: &str = "SOUNDRY_RETENTION_SECS";
const ENV_MAX_UPLOAD_BYTES: &str = "SOUNDRY_MAX_UPLOAD_BYTES";
const ENV_ENABLED_METHODS: &str = "SOUNDRY_ENABLED_METHODS";
const ENV_CORS_ORIGINS: &str = "SOUNDRY_CORS_ORIGINS";
const ENV_PROCESSING_TIMEOUT_SECS: &str = "SOUNDRY_PROCESSING_TIMEOUT_SECS";
const ENV_LOG_LEVEL: &str = "SOUNDRY_LOG_LEVEL";
const ENV_LOG_FORMAT: &str = "SOUNDRY_LOG_FORMAT";

/// Load configuration using the process environment.
///
/// `path` wins over `SOUNDRY_CONFIG`; with neither, only defaults and
/// environment overrides apply.
///
/// # Errors
///
/// Returns an error when the file cannot be read or parsed, an override
/// cannot be parsed, or the merged configuration fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<ServiceConfig> {
    load_with(path, |key| std::env::var(key).ok())
}

/// Load configuration with a caller-supplied environment lookup.
///
/// # Errors
///
/// See [`load`].
pub fn load_with<F>(path: Option<&Path>, env: F) -> ConfigResult<ServiceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let file = path
        .map(Path::to_path_buf)
        .or_else(|| env(ENV_CONFIG_PATH).map(PathBuf::from));

    let mut config = match file {
        Some(file) => {
            debug!(path = %file.display(), "loading configuration file");
            read_file(&file)?
        }
        None => ServiceConfig::default(),
    };

    apply_env(&mut config, &env)?;
    validate(&config)?;
    Ok(config)
}

/// Parse a YAML document into a configuration without validating it.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] when the document does not match the schema.
pub fn from_yaml_str(document: &str) -> ConfigResult<ServiceConfig> {
    parse_document(document, None)
}

fn read_file(path: &Path) -> ConfigResult<ServiceConfig> {
    let document = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "config.read",
        path: path.to_path_buf(),
        source,
    })?;
    parse_document(&document, Some(path))
}

fn parse_document(document: &str, path: Option<&Path>) -> ConfigResult<ServiceConfig> {
    if document.trim().is_empty() {
        return Ok(ServiceConfig::default());
    }
    serde_yaml::from_str(document).map_err(|source| ConfigError::Parse {
        path: path.map(Path::to_path_buf),
        source,
    })
}

fn apply_env<F>(config: &mut ServiceConfig, env: &F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = parsed(env, ENV_BIND_ADDR, "bind_addr")? {
        config.server.bind_addr = addr;
    }
    if let Some(url) = non_empty(env, ENV_PUBLIC_BASE_URL) {
        config.server.public_base_url = Some(url);
    }
    if let Some(origins) = non_empty(env, ENV_CORS_ORIGINS) {
        config.server.cors_origins = split_list(&origins);
    }
    if let Some(dir) = non_empty(env, ENV_UPLOAD_DIR) {
        config.storage.upload_dir = PathBuf::from(dir);
    }
    if let Some(dir) = non_empty(env, ENV_OUTPUT_DIR) {
        config.storage.output_dir = PathBuf::from(dir);
    }
    if let Some(dir) = non_empty(env, ENV_SCRATCH_DIR) {
        config.storage.scratch_dir = PathBuf::from(dir);
    }
    if let Some(secs) = parsed(env, ENV_RETENTION_SECS, "retention_secs")? {
        config.storage.retention_secs = secs;
    }
    if let Some(bytes) = parsed(env, ENV_MAX_UPLOAD_BYTES, "max_upload_bytes")? {
        config.storage.max_upload_bytes = bytes;
    }
    if let Some(methods) = env(ENV_ENABLED_METHODS) {
        config.methods.enabled = split_list(&methods);
    }
    if let Some(secs) = parsed(env, ENV_PROCESSING_TIMEOUT_SECS, "timeout_secs")? {
        config.processing.timeout_secs = secs;
    }
    if let Some(level) = non_empty(env, ENV_LOG_LEVEL) {
        config.logging.level = level;
    }
    if let Some(format) = non_empty(env, ENV_LOG_FORMAT) {
        config.logging.format = Some(format.to_ascii_lowercase());
    }
    Ok(())
}

fn non_empty<F>(env: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    env(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parsed<F, T>(env: &F, key: &str, field: &'static str) -> ConfigResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    non_empty(env, key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|_| ConfigError::invalid("env", field, Some(raw), "unparsable_value"))
        })
        .transpose()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn split_list_trims_and_drops_blanks() {
        assert_eq!(
            split_list(" denoise, ,voice-activity ,"),
            vec!["denoise".to_string(), "voice-activity".to_string()]
        );
    }

    #[test]
    fn empty_document_yields_defaults() -> ConfigResult<()> {
        assert_eq!(from_yaml_str("  \n")?, ServiceConfig::default());
        Ok(())
    }

    #[test]
    fn env_overrides_apply_over_defaults() -> ConfigResult<()> {
        let config = load_with(
            None,
            env_from(&[
                (ENV_BIND_ADDR, "0.0.0.0:9000"),
                (ENV_RETENTION_SECS, "120"),
                (ENV_ENABLED_METHODS, "denoise"),
                (ENV_CORS_ORIGINS, "http://a.test, https://b.test"),
                (ENV_LOG_FORMAT, "JSON"),
            ]),
        )?;
        assert_eq!(config.server.bind_addr.port(), 9000);
        assert_eq!(config.storage.retention_secs, 120);
        assert_eq!(config.methods.enabled, vec!["denoise".to_string()]);
        assert_eq!(config.server.cors_origins.len(), 2);
        assert_eq!(config.logging.format.as_deref(), Some("json"));
        Ok(())
    }

    #[test]
    fn empty_enabled_methods_disables_everything() -> ConfigResult<()> {
        let config = load_with(None, env_from(&[(ENV_ENABLED_METHODS, "")]))?;
        assert!(config.methods.enabled.is_empty());
        Ok(())
    }

    #[test]
    fn unparsable_override_is_reported() {
        let err = load_with(None, env_from(&[(ENV_RETENTION_SECS, "soon")]));
        assert!(matches!(
            err,
            Err(ConfigError::InvalidField {
                field: "retention_secs",
                reason: "unparsable_value",
                ..
            })
        ));
    }

    #[test]
    fn override_is_validated() {
        let err = load_with(None, env_from(&[(ENV_PROCESSING_TIMEOUT_SECS, "0")]));
        assert!(matches!(
            err,
            Err(ConfigError::InvalidField {
                field: "timeout_secs",
                reason: "must_be_positive",
                ..
            })
        ));
    }
}
