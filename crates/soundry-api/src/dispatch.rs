//! Upload dispatch: validate, sweep, persist, process, confirm.
//!
//! # Design
//! - Every failure after persistence cancels the backend job and removes the
//!   partial artifact through a drop guard, so dropped requests are covered
//!   as well.
//! - The concurrency permit travels with the job and is released only when
//!   the backend's last worker lets go of it, even after a timeout.
//! - The `dispatch.process` span carries the request id and route of the HTTP
//!   request that triggered it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use soundry_backends::{BackendRegistry, Job, Lookup};
use soundry_storage::{
    AudioExtension, FileIdentity, OutputArtifact, RetentionSweeper, StorageError, StorageLayout,
    SweepReport, Upload,
};
use soundry_telemetry::{JobOutcome, Metrics, current_request_id, current_route};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Failures surfaced to the HTTP layer.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The filename extension is outside the allow-list.
    #[error("unsupported file type")]
    UnsupportedFileType {
        /// Extension found, if any.
        value: Option<String>,
    },
    /// No backend answers to the selector.
    #[error("unknown processing method")]
    UnknownMethod {
        /// Selector from the request.
        method: String,
    },
    /// The backend is registered but not enabled.
    #[error("processing method disabled")]
    MethodDisabled {
        /// Canonical method name.
        method: &'static str,
    },
    /// The request carried no file.
    #[error("missing file upload")]
    MissingFile,
    /// The backend failed or produced nothing.
    #[error("processing failed")]
    Processing {
        /// Canonical method name.
        method: &'static str,
        /// Backend failure description.
        message: String,
    },
    /// The backend did not finish within the time limit.
    #[error("processing timed out")]
    TimedOut {
        /// Canonical method name.
        method: &'static str,
        /// Limit in effect.
        limit: Duration,
    },
    /// Persisting the upload failed.
    #[error("failed to store upload")]
    Storage {
        /// Underlying storage error.
        source: StorageError,
    },
}

impl DispatchError {
    /// Client-facing description embedded in problem documents.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::UnsupportedFileType { value } => {
                let supported = AudioExtension::ALL.map(AudioExtension::as_str).join(", ");
                match value {
                    Some(ext) => format!("unsupported file type '.{ext}'; expected one of {supported}"),
                    None => format!("file has no extension; expected one of {supported}"),
                }
            }
            Self::UnknownMethod { method } => format!("unknown processing method '{method}'"),
            Self::MethodDisabled { method } => {
                format!("processing method '{method}' is currently disabled")
            }
            Self::MissingFile => "request carries no file field".to_string(),
            Self::Processing { message, .. } => message.clone(),
            Self::TimedOut { limit, .. } => {
                format!("processing exceeded the {} s time limit", limit.as_secs())
            }
            Self::Storage { .. } => "failed to store upload".to_string(),
        }
    }
}

/// Successful dispatch.
#[derive(Debug, Clone)]
pub struct ProcessedUpload {
    /// Canonical method that ran.
    pub method: &'static str,
    /// Persisted input.
    pub upload: Upload,
    /// Confirmed output.
    pub artifact: OutputArtifact,
}

/// Routes uploads to backends and owns the storage areas they touch.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<BackendRegistry>,
    storage: StorageLayout,
    sweeper: RetentionSweeper,
    timeout: Duration,
    telemetry: Metrics,
}

impl Dispatcher {
    /// Assemble a dispatcher.
    #[must_use]
    pub const fn new(
        registry: Arc<BackendRegistry>,
        storage: StorageLayout,
        sweeper: RetentionSweeper,
        timeout: Duration,
        telemetry: Metrics,
    ) -> Self {
        Self {
            registry,
            storage,
            sweeper,
            timeout,
            telemetry,
        }
    }

    /// Backend registry.
    #[must_use]
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Storage areas.
    #[must_use]
    pub const fn storage(&self) -> &StorageLayout {
        &self.storage
    }

    /// Sweep the upload and output areas on the blocking pool.
    pub async fn sweep(&self) -> SweepReport {
        let sweeper = self.sweeper;
        let uploads = self.storage.upload_dir().to_path_buf();
        let outputs = self.storage.output_dir().to_path_buf();
        let report = match tokio::task::spawn_blocking(move || {
            sweeper.sweep_all(&[uploads.as_path(), outputs.as_path()])
        })
        .await
        {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "retention sweep task failed");
                SweepReport::default()
            }
        };

        self.telemetry
            .record_retention_sweep(report.removed, report.failed);
        if report.removed > 0 || report.failed > 0 {
            info!(
                scanned = report.scanned,
                removed = report.removed,
                failed = report.failed,
                "retention sweep finished"
            );
        } else {
            debug!(scanned = report.scanned, "retention sweep found nothing to remove");
        }
        report
    }

    /// Run `method` on an uploaded payload.
    ///
    /// # Errors
    ///
    /// See [`DispatchError`]; any error after persistence leaves no artifact.
    #[instrument(
        name = "dispatch.process",
        skip(self, payload),
        fields(
            bytes = payload.len(),
            request_id = %current_request_id().unwrap_or_default(),
            route = %current_route().unwrap_or_default()
        )
    )]
    pub async fn process(
        &self,
        method: &str,
        filename: &str,
        payload: &[u8],
    ) -> Result<ProcessedUpload, DispatchError> {
        let extension = AudioExtension::from_filename(filename).map_err(|err| match err {
            StorageError::UnsupportedFileType { value } => {
                DispatchError::UnsupportedFileType { value }
            }
            source => DispatchError::Storage { source },
        })?;

        let entry = match self.registry.lookup(method) {
            Lookup::Ready(entry) => entry,
            Lookup::Disabled(entry) => {
                return Err(DispatchError::MethodDisabled {
                    method: entry.name(),
                });
            }
            Lookup::Unknown => {
                return Err(DispatchError::UnknownMethod {
                    method: method.to_string(),
                });
            }
        };
        let backend = entry.backend();
        let method = entry.name();

        let identity = FileIdentity::new_upload(extension);
        let output_identity =
            identity.with_extension(backend.output_extension().unwrap_or(extension));

        self.sweep().await;
        let upload = self
            .storage
            .persist_upload(identity, payload)
            .await
            .map_err(|source| DispatchError::Storage { source })?;
        self.telemetry.add_upload_bytes(upload.size);

        let token = identity.token.to_string();
        let job = entry.acquire().await.map_err(|err| DispatchError::Processing {
            method,
            message: err.to_string(),
        })?;
        let mut guard = PartialOutput::new(self.storage.output_path(&output_identity), job.clone());

        info!(method, token = %token, "processing started");
        let started = Instant::now();
        let result = {
            let _active = ActiveJob::start(&self.telemetry);
            tokio::time::timeout(
                self.timeout,
                backend.process(&upload.path, guard.path(), &job),
            )
            .await
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let failure = match result {
            Ok(Ok(_)) => match self.storage.confirm_output(output_identity).await {
                Ok(artifact) => {
                    guard.keep();
                    self.telemetry
                        .inc_processing_job(method, JobOutcome::Succeeded);
                    info!(method, token = %token, elapsed_ms, "processing completed");
                    return Ok(ProcessedUpload {
                        method,
                        upload,
                        artifact,
                    });
                }
                Err(err) => DispatchError::Processing {
                    method,
                    message: format!("{method} reported success but produced no output ({err})"),
                },
            },
            Ok(Err(err)) => DispatchError::Processing {
                method,
                message: err.to_string(),
            },
            Err(_) => DispatchError::TimedOut {
                method,
                limit: self.timeout,
            },
        };

        let outcome = if matches!(failure, DispatchError::TimedOut { .. }) {
            JobOutcome::TimedOut
        } else {
            JobOutcome::Failed
        };
        self.telemetry.inc_processing_job(method, outcome);
        warn!(
            method,
            token = %token,
            elapsed_ms,
            outcome = outcome.as_str(),
            detail = %failure.detail(),
            "processing failed"
        );
        Err(failure)
    }
}

/// Holds the active-job gauge up for its lifetime.
struct ActiveJob<'a>(&'a Metrics);

impl<'a> ActiveJob<'a> {
    fn start(metrics: &'a Metrics) -> Self {
        metrics.job_started();
        Self(metrics)
    }
}

impl Drop for ActiveJob<'_> {
    fn drop(&mut self) {
        self.0.job_finished();
    }
}

/// Cancels the job and removes the artifact path on drop unless
/// [`PartialOutput::keep`] was called.
struct PartialOutput {
    path: PathBuf,
    job: Job,
    keep: bool,
}

impl PartialOutput {
    const fn new(path: PathBuf, job: Job) -> Self {
        Self {
            path,
            job,
            keep: false,
        }
    }

    fn path(&self) -> &std::path::Path {
        &self.path
    }

    const fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        // Cancel first: a worker still running cannot publish afterwards.
        self.job.cancel();
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed partial artifact"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                error = %err,
                path = %self.path.display(),
                "failed to remove partial artifact"
            ),
        }
    }
}
