//! Per-invocation handle shared between the dispatcher and a running backend.
//!
//! # Design
//! - The concurrency permit lives inside the handle, so work that outlives the
//!   caller (blocking-pool tasks keep running after a timeout) keeps its slot
//!   until it actually finishes.
//! - Cancellation and publishing the output are serialized: once
//!   [`Job::cancel`] returns, no later [`Job::commit`] runs its closure.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OwnedSemaphorePermit;

use crate::error::{BackendError, BackendResult};

/// Handle to one backend invocation; clones share state.
#[derive(Debug, Clone)]
pub struct Job {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    _permit: Option<OwnedSemaphorePermit>,
    cancelled: Mutex<bool>,
}

impl Job {
    /// Job holding `permit` until the last clone drops.
    #[must_use]
    pub fn new(permit: OwnedSemaphorePermit) -> Self {
        Self::with_permit(Some(permit))
    }

    /// Job outside any concurrency gate.
    #[must_use]
    pub fn detached() -> Self {
        Self::with_permit(None)
    }

    fn with_permit(permit: Option<OwnedSemaphorePermit>) -> Self {
        Self {
            shared: Arc::new(Shared {
                _permit: permit,
                cancelled: Mutex::new(false),
            }),
        }
    }

    /// Mark the job abandoned. Pending commits are refused afterwards.
    pub fn cancel(&self) {
        *self.flag() = true;
    }

    /// Whether [`Job::cancel`] has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.flag()
    }

    /// Fail fast when the job was abandoned.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Cancelled`] after [`Job::cancel`].
    pub fn ensure_active(&self) -> BackendResult<()> {
        if self.is_cancelled() {
            return Err(BackendError::Cancelled);
        }
        Ok(())
    }

    /// Run `publish` unless the job was cancelled; cancellation waits for a
    /// running `publish` to finish.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Cancelled`] without running `publish` after
    /// [`Job::cancel`], otherwise whatever `publish` returns.
    pub fn commit<T>(&self, publish: impl FnOnce() -> BackendResult<T>) -> BackendResult<T> {
        let cancelled = self.flag();
        if *cancelled {
            return Err(BackendError::Cancelled);
        }
        publish()
    }

    fn flag(&self) -> MutexGuard<'_, bool> {
        self.shared
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::Semaphore;

    use super::*;

    #[tokio::test]
    async fn permit_is_held_until_last_clone_drops() -> Result<(), Box<dyn std::error::Error>> {
        let gate = Arc::new(Semaphore::new(1));
        let job = Job::new(Arc::clone(&gate).acquire_owned().await?);
        let worker = job.clone();

        drop(job);
        assert_eq!(gate.available_permits(), 0);
        drop(worker);
        assert_eq!(gate.available_permits(), 1);
        Ok(())
    }

    #[test]
    fn commit_after_cancel_does_not_publish() {
        let job = Job::detached();
        let worker = job.clone();
        job.cancel();

        let mut published = false;
        let result = worker.commit(|| {
            published = true;
            Ok(())
        });

        assert!(matches!(result, Err(BackendError::Cancelled)));
        assert!(!published);
        assert!(worker.ensure_active().is_err());
    }

    #[test]
    fn commit_runs_while_active() -> BackendResult<()> {
        let job = Job::detached();
        assert_eq!(job.commit(|| Ok(7))?, 7);
        assert!(!job.is_cancelled());
        Ok(())
    }
}
