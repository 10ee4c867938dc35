//! Trait implemented by every processing backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use soundry_storage::AudioExtension;

use crate::error::BackendResult;
use crate::job::Job;

/// One audio processing operation: read `input`, write `output`.
///
/// Subprocess-driven and in-process implementations share this contract. A
/// backend must not leave a file at `output` when it returns an error, but
/// callers still clean up after failures.
#[async_trait]
pub trait ProcessingBackend: Send + Sync {
    /// Canonical method name used in request paths and metrics.
    fn name(&self) -> &'static str;

    /// Additional names resolving to this backend.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Container the backend always encodes, if fixed; otherwise the upload's
    /// extension is kept.
    fn output_extension(&self) -> Option<AudioExtension> {
        None
    }

    /// Process `input` and write the result to `output`, returning the path
    /// actually written.
    ///
    /// Work that can outlive the returned future (blocking-pool tasks) must
    /// hold a clone of `job` until it ends and publish `output` through
    /// [`Job::commit`].
    async fn process(&self, input: &Path, output: &Path, job: &Job) -> BackendResult<PathBuf>;
}
