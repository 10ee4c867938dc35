//! Boot sequence: configuration, logging, storage, backends, API.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use soundry_api::{ApiServer, Dispatcher};
use soundry_backends::BackendRegistry;
use soundry_config::ServiceConfig;
use soundry_storage::{RetentionSweeper, StorageLayout};
use soundry_telemetry::{LogFormat, LoggingConfig, Metrics, init_logging};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::cli::Cli;
use crate::error::{AppError, AppResult};

const ENV_BUILD_SHA: &str = "SOUNDRY_BUILD_SHA";

/// Parse the command line and run until shutdown.
///
/// # Errors
///
/// Returns an error if configuration, startup, or serving fails.
pub async fn run_app() -> AppResult<()> {
    run_with(Cli::parse()).await
}

/// Boot sequence driven by already-parsed flags.
///
/// # Errors
///
/// Returns an error if configuration, startup, or serving fails.
pub async fn run_with(cli: Cli) -> AppResult<()> {
    let config = soundry_config::load(cli.config.as_deref())
        .map_err(|err| AppError::config("config.load", err))?;

    if cli.print_config {
        let rendered =
            serde_yaml::to_string(&config).map_err(|source| AppError::RenderConfig { source })?;
        print!("{rendered}");
        return Ok(());
    }

    let build_sha = resolve_build_sha();
    init_logging(&LoggingConfig {
        level: &config.logging.level,
        format: LogFormat::from_name(config.logging.format.as_deref()),
        build_sha: &build_sha,
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    info!(build = %build_sha, "soundry bootstrap starting");

    let telemetry = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let dispatcher = Arc::new(build_dispatcher(&config, telemetry.clone())?);
    for entry in dispatcher.registry().iter() {
        info!(
            method = entry.name(),
            enabled = entry.is_enabled(),
            "backend registered"
        );
    }

    let sweeper = config
        .storage
        .sweep_interval()
        .map(|every| spawn_sweeper(Arc::clone(&dispatcher), every));

    let api = ApiServer::new(
        Arc::clone(&dispatcher),
        telemetry,
        &config.server,
        config.storage.max_upload_bytes,
    )
    .map_err(|err| AppError::api_server("api_server.new", err))?;

    let addr = config.server.bind_addr;
    info!(addr = %addr, "launching api listener");
    let served = api
        .serve(addr, shutdown_signal())
        .await
        .map_err(|err| AppError::api_server("api_server.serve", err));

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    info!("soundry stopped");
    served
}

/// Prepare storage areas and backends for `config`.
///
/// # Errors
///
/// Fails when a storage directory cannot be created or the enabled method
/// list names an unregistered method.
pub fn build_dispatcher(config: &ServiceConfig, telemetry: Metrics) -> AppResult<Dispatcher> {
    let storage = StorageLayout::new(
        config.storage.upload_dir.clone(),
        config.storage.output_dir.clone(),
        config.storage.scratch_dir.clone(),
    );
    storage
        .ensure_directories()
        .map_err(|err| AppError::storage("storage.ensure_directories", err))?;
    let registry =
        BackendRegistry::from_config(config).map_err(|source| AppError::Registry { source })?;

    Ok(Dispatcher::new(
        Arc::new(registry),
        storage,
        RetentionSweeper::new(config.storage.retention()),
        config.processing.timeout(),
        telemetry,
    ))
}

/// Sweep both storage areas every `every`, starting one interval from now.
fn spawn_sweeper(dispatcher: Arc<Dispatcher>, every: Duration) -> JoinHandle<()> {
    info!(interval_secs = every.as_secs(), "background retention sweep enabled");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            dispatcher.sweep().await;
        }
    })
}

fn resolve_build_sha() -> String {
    std::env::var(ENV_BUILD_SHA)
        .ok()
        .filter(|value| !value.is_empty())
        .or_else(|| option_env!("SOUNDRY_BUILD_SHA").map(str::to_string))
        .unwrap_or_else(|| "dev".to_string())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown signal received, draining requests");
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::path::Path;
    use std::time::SystemTime;

    use soundry_backends::RegistryError;

    use super::*;

    fn config_in(root: &Path) -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config.storage.upload_dir = root.join("uploads");
        config.storage.output_dir = root.join("outputs");
        config.storage.scratch_dir = root.join("separated");
        config
    }

    #[test]
    fn dispatcher_creates_storage_and_registers_backends() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let config = config_in(temp.path());

        let dispatcher = build_dispatcher(&config, Metrics::new()?)?;

        assert!(temp.path().join("uploads").is_dir());
        assert!(temp.path().join("outputs").is_dir());
        assert!(temp.path().join("separated").is_dir());
        let enabled: Vec<_> = dispatcher
            .registry()
            .iter()
            .filter(|entry| entry.is_enabled())
            .map(|entry| entry.name())
            .collect();
        assert_eq!(enabled, ["separation", "denoise", "voice-activity"]);
        Ok(())
    }

    #[test]
    fn unknown_enabled_method_fails_startup() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut config = config_in(temp.path());
        config.methods.enabled = vec!["karaoke".to_string()];

        let result = build_dispatcher(&config, Metrics::new()?);

        assert!(matches!(
            result,
            Err(AppError::Registry {
                source: RegistryError::UnknownEnabled { .. }
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn background_sweeper_removes_expired_files() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let config = config_in(temp.path());
        let dispatcher = Arc::new(build_dispatcher(&config, Metrics::new()?)?);

        let stale = temp.path().join("outputs").join("stale.wav");
        File::create(&stale)?.set_modified(SystemTime::now() - Duration::from_secs(7_200))?;

        let handle = spawn_sweeper(Arc::clone(&dispatcher), Duration::from_millis(20));
        let mut waited = Duration::ZERO;
        while stale.exists() && waited < Duration::from_secs(5) {
            tokio::time::sleep(Duration::from_millis(20)).await;
            waited += Duration::from_millis(20);
        }
        handle.abort();

        assert!(!stale.exists());
        Ok(())
    }

    #[tokio::test]
    async fn print_config_exits_without_serving() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("soundry.yaml");
        std::fs::write(&path, "processing:\n  timeout_secs: 42\n")?;

        run_with(Cli {
            config: Some(path),
            print_config: true,
        })
        .await?;
        Ok(())
    }
}
