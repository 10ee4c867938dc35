//! Age-based cleanup of the upload and output areas.
//!
//! The sweep is synchronous and best-effort: every removal failure is logged
//! and counted, and the remaining entries are still visited. Callers on an
//! async runtime run it through `spawn_blocking`.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Counters describing one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Regular files inspected.
    pub scanned: u64,
    /// Files deleted because they exceeded the age threshold.
    pub removed: u64,
    /// Files that could not be inspected or deleted.
    pub failed: u64,
}

impl SweepReport {
    /// Combine two reports.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            scanned: self.scanned + other.scanned,
            removed: self.removed + other.removed,
            failed: self.failed + other.failed,
        }
    }
}

/// Deletes regular files older than a fixed age.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionSweeper {
    max_age: Duration,
}

impl RetentionSweeper {
    /// Sweeper removing files whose mtime is more than `max_age` in the past.
    #[must_use]
    pub const fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    /// Configured age threshold.
    #[must_use]
    pub const fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Sweep each directory in turn and return the combined report.
    #[must_use]
    pub fn sweep_all(&self, dirs: &[&Path]) -> SweepReport {
        let now = SystemTime::now();
        dirs.iter()
            .map(|dir| self.sweep_at(dir, now))
            .fold(SweepReport::default(), SweepReport::merge)
    }

    /// Sweep the top level of `dir`. A missing directory yields an empty report.
    #[must_use]
    pub fn sweep(&self, dir: &Path) -> SweepReport {
        self.sweep_at(dir, SystemTime::now())
    }

    fn sweep_at(&self, dir: &Path, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();
        if !dir.is_dir() {
            debug!(path = %dir.display(), "retention sweep skipped missing directory");
            return report;
        }

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(
                        error = %err,
                        path = %dir.display(),
                        "failed to traverse retention directory"
                    );
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            report.scanned += 1;

            let modified = match entry.metadata().map(|meta| meta.modified()) {
                Ok(Ok(modified)) => modified,
                Ok(Err(err)) => {
                    warn!(error = %err, path = %entry.path().display(), "failed to read file mtime");
                    report.failed += 1;
                    continue;
                }
                Err(err) => {
                    warn!(error = %err, path = %entry.path().display(), "failed to read file metadata");
                    report.failed += 1;
                    continue;
                }
            };

            // Future mtimes produce an error here and are kept.
            let Ok(age) = now.duration_since(modified) else {
                continue;
            };
            if age <= self.max_age {
                continue;
            }

            match fs::remove_file(entry.path()) {
                Ok(()) => {
                    debug!(path = %entry.path().display(), age_secs = age.as_secs(), "expired file removed");
                    report.removed += 1;
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        path = %entry.path().display(),
                        "failed to remove expired file"
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }
}
