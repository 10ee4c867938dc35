//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters/gauges the upload, processing, and retention paths need.

use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Outcome label recorded for a processing job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The backend produced an artifact.
    Succeeded,
    /// The backend reported an error.
    Failed,
    /// The backend exceeded the configured time limit.
    TimedOut,
}

impl JobOutcome {
    /// Label value used in the `outcome` dimension.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    processing_jobs_total: IntCounterVec,
    processing_active_jobs: IntGauge,
    retention_files_removed_total: IntCounter,
    retention_failures_total: IntCounter,
    upload_bytes_total: IntCounter,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Backend invocations currently in flight.
    pub processing_active_jobs: i64,
    /// Files removed by the retention sweeper since start.
    pub retention_files_removed_total: u64,
    /// Files the retention sweeper failed to remove since start.
    pub retention_failures_total: u64,
    /// Total upload payload bytes persisted since start.
    pub upload_bytes_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests received"),
            &["route", "code"],
        )
        .map_err(collector_error("http_requests_total"))?;
        let processing_jobs_total = IntCounterVec::new(
            Opts::new(
                "processing_jobs_total",
                "Processing backend invocations by method and outcome",
            ),
            &["method", "outcome"],
        )
        .map_err(collector_error("processing_jobs_total"))?;
        let processing_active_jobs = IntGauge::with_opts(Opts::new(
            "processing_active_jobs",
            "Processing backend invocations currently running",
        ))
        .map_err(collector_error("processing_active_jobs"))?;
        let retention_files_removed_total = IntCounter::with_opts(Opts::new(
            "retention_files_removed_total",
            "Files removed by the retention sweeper",
        ))
        .map_err(collector_error("retention_files_removed_total"))?;
        let retention_failures_total = IntCounter::with_opts(Opts::new(
            "retention_failures_total",
            "Files the retention sweeper failed to remove",
        ))
        .map_err(collector_error("retention_failures_total"))?;
        let upload_bytes_total = IntCounter::with_opts(Opts::new(
            "upload_bytes_total",
            "Upload payload bytes persisted",
        ))
        .map_err(collector_error("upload_bytes_total"))?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(&registry, "processing_jobs_total", &processing_jobs_total)?;
        register(&registry, "processing_active_jobs", &processing_active_jobs)?;
        register(
            &registry,
            "retention_files_removed_total",
            &retention_files_removed_total,
        )?;
        register(&registry, "retention_failures_total", &retention_failures_total)?;
        register(&registry, "upload_bytes_total", &upload_bytes_total)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                processing_jobs_total,
                processing_active_jobs,
                retention_files_removed_total,
                retention_failures_total,
                upload_bytes_total,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        let code = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[route, code.as_str()])
            .inc();
    }

    /// Record a finished processing job.
    pub fn inc_processing_job(&self, method: &str, outcome: JobOutcome) {
        self.inner
            .processing_jobs_total
            .with_label_values(&[method, outcome.as_str()])
            .inc();
    }

    /// Mark a backend invocation as started.
    pub fn job_started(&self) {
        self.inner.processing_active_jobs.inc();
    }

    /// Mark a backend invocation as finished, whatever its outcome.
    pub fn job_finished(&self) {
        self.inner.processing_active_jobs.dec();
    }

    /// Record the result of one retention sweep.
    pub fn record_retention_sweep(&self, removed: u64, failed: u64) {
        self.inner.retention_files_removed_total.inc_by(removed);
        self.inner.retention_failures_total.inc_by(failed);
    }

    /// Record persisted upload bytes.
    pub fn add_upload_bytes(&self, bytes: u64) {
        self.inner.upload_bytes_total.inc_by(bytes);
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            processing_active_jobs: self.inner.processing_active_jobs.get(),
            retention_files_removed_total: self.inner.retention_files_removed_total.get(),
            retention_failures_total: self.inner.retention_failures_total.get(),
            upload_bytes_total: self.inner.upload_bytes_total.get(),
        }
    }
}

fn collector_error(name: &'static str) -> impl FnOnce(prometheus::Error) -> TelemetryError {
    move |source| TelemetryError::MetricsCollector { name, source }
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
