use std::fs;
use std::path::PathBuf;

use soundry_config::{ConfigError, ENV_CONFIG_PATH, load_with};

#[test]
fn yaml_file_then_env_overrides() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("soundry.yaml");
    fs::write(
        &path,
        r"
server:
  bind_addr: 0.0.0.0:8080
  public_base_url: https://audio.example.com
storage:
  upload_dir: /srv/soundry/in
  output_dir: /srv/soundry/out
  retention_secs: 7200
  sweep_interval_secs: 300
methods:
  enabled: [separation, denoise, voice-activity, spleeter]
voice_activity:
  threshold: 0.65
",
    )?;

    let config = load_with(Some(&path), |key| match key {
        "SOUNDRY_RETENTION_SECS" => Some("60".to_string()),
        _ => None,
    })?;

    assert_eq!(config.server.bind_addr.port(), 8080);
    assert_eq!(
        config.server.public_base_url.as_deref(),
        Some("https://audio.example.com")
    );
    assert_eq!(config.storage.upload_dir, PathBuf::from("/srv/soundry/in"));
    assert_eq!(config.storage.retention_secs, 60);
    assert_eq!(config.storage.sweep_interval_secs, Some(300));
    assert!(config.methods.is_enabled("spleeter"));
    assert!((config.voice_activity.threshold - 0.65).abs() < f32::EPSILON);
    assert_eq!(config.separation.model, "htdemucs");
    Ok(())
}

#[test]
fn config_path_can_come_from_environment() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("from-env.yaml");
    fs::write(&path, "processing:\n  timeout_secs: 30\n")?;
    let path_str = path.display().to_string();

    let config = load_with(None, |key| {
        (key == ENV_CONFIG_PATH).then(|| path_str.clone())
    })?;
    assert_eq!(config.processing.timeout_secs, 30);
    Ok(())
}

#[test]
fn unknown_fields_are_rejected() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("typo.yaml");
    fs::write(&path, "storage:\n  retention_sec: 10\n")?;

    let err = load_with(Some(&path), |_| None);
    assert!(matches!(err, Err(ConfigError::Parse { path: Some(_), .. })));
    Ok(())
}

#[test]
fn missing_file_reports_io_error() {
    let err = load_with(Some(PathBuf::from("/nonexistent/soundry.yaml").as_path()), |_| None);
    assert!(matches!(
        err,
        Err(ConfigError::Io {
            operation: "config.read",
            ..
        })
    ));
}
