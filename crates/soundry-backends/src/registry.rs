//! Name-to-backend lookup with per-backend enablement and concurrency gates.

use std::collections::HashMap;
use std::sync::Arc;

use soundry_config::ServiceConfig;
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::backend::ProcessingBackend;
use crate::denoise::DenoiseBackend;
use crate::error::{BackendError, BackendResult};
use crate::job::Job;
use crate::separation::SeparationBackend;
use crate::voice_activity::VoiceActivityBackend;

/// Result alias for registry construction.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registry construction failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two backends claimed the same name or alias.
    #[error("method name registered twice")]
    DuplicateName {
        /// Name claimed twice.
        name: &'static str,
    },
    /// The enabled list names a method nobody registered.
    #[error("enabled method is not registered")]
    UnknownEnabled {
        /// Name from the enabled list.
        name: String,
    },
    /// A backend was registered with zero permits.
    #[error("backend concurrency must be positive")]
    ZeroConcurrency {
        /// Backend name.
        name: &'static str,
    },
}

/// A backend plus its enablement flag and concurrency gate.
pub struct RegisteredBackend {
    backend: Arc<dyn ProcessingBackend>,
    enabled: bool,
    permits: Arc<Semaphore>,
}

impl RegisteredBackend {
    /// Canonical method name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.backend.name()
    }

    /// Whether requests for this method are served.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The backend implementation.
    #[must_use]
    pub fn backend(&self) -> &dyn ProcessingBackend {
        self.backend.as_ref()
    }

    /// Wait for a concurrency permit and wrap it in a [`Job`]. The permit is
    /// released once every clone of the job, including ones handed to
    /// blocking workers, has dropped.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unavailable`] if the gate has been closed.
    pub async fn acquire(&self) -> BackendResult<Job> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map(Job::new)
            .map_err(|_| BackendError::Unavailable {
                backend: self.name(),
            })
    }

    /// Permits not currently held.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

impl std::fmt::Debug for RegisteredBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredBackend")
            .field("name", &self.name())
            .field("enabled", &self.enabled)
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}

/// Outcome of resolving a method selector.
#[derive(Debug)]
pub enum Lookup<'a> {
    /// Registered and enabled.
    Ready(&'a RegisteredBackend),
    /// Registered but not enabled.
    Disabled(&'a RegisteredBackend),
    /// Neither a method name nor an alias.
    Unknown,
}

/// Every registered backend, addressable by name or alias.
#[derive(Debug)]
pub struct BackendRegistry {
    entries: Vec<RegisteredBackend>,
    index: HashMap<&'static str, usize>,
}

impl BackendRegistry {
    /// Start an empty registry.
    #[must_use]
    pub fn builder() -> BackendRegistryBuilder {
        BackendRegistryBuilder::default()
    }

    /// Register the built-in backends and enable the configured methods.
    ///
    /// # Errors
    ///
    /// Fails when the enabled list names an unknown method.
    pub fn from_config(config: &ServiceConfig) -> RegistryResult<Self> {
        let scratch = &config.storage.scratch_dir;
        let concurrency = config.processing.concurrency;
        Self::builder()
            .register(
                Arc::new(SeparationBackend::demucs(&config.separation, scratch)),
                concurrency,
            )
            .register(Arc::new(DenoiseBackend::new()), concurrency)
            .register(
                Arc::new(VoiceActivityBackend::new(config.voice_activity.threshold)),
                concurrency,
            )
            .register(
                Arc::new(SeparationBackend::spleeter(&config.spleeter, scratch)),
                concurrency,
            )
            .build(&config.methods.enabled)
    }

    /// Resolve a method name or alias.
    #[must_use]
    pub fn lookup(&self, method: &str) -> Lookup<'_> {
        match self.index.get(method).map(|&slot| &self.entries[slot]) {
            Some(entry) if entry.enabled => Lookup::Ready(entry),
            Some(entry) => Lookup::Disabled(entry),
            None => Lookup::Unknown,
        }
    }

    /// Registered backends in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredBackend> {
        self.entries.iter()
    }
}

/// Collects backends before the enabled set is applied.
#[derive(Default)]
pub struct BackendRegistryBuilder {
    pending: Vec<(Arc<dyn ProcessingBackend>, usize)>,
}

impl BackendRegistryBuilder {
    /// Add `backend` allowing `concurrency` simultaneous invocations.
    #[must_use]
    pub fn register(mut self, backend: Arc<dyn ProcessingBackend>, concurrency: usize) -> Self {
        self.pending.push((backend, concurrency));
        self
    }

    /// Finish the registry, enabling the methods named in `enabled`.
    /// Aliases are accepted in `enabled`.
    ///
    /// # Errors
    ///
    /// Fails on duplicate names or aliases, zero concurrency, or an enabled
    /// name that resolves to nothing.
    pub fn build(self, enabled: &[String]) -> RegistryResult<BackendRegistry> {
        let mut index = HashMap::new();
        let mut entries = Vec::with_capacity(self.pending.len());

        for (slot, (backend, concurrency)) in self.pending.into_iter().enumerate() {
            if concurrency == 0 {
                return Err(RegistryError::ZeroConcurrency {
                    name: backend.name(),
                });
            }
            for name in std::iter::once(backend.name()).chain(backend.aliases().iter().copied()) {
                if index.insert(name, slot).is_some() {
                    return Err(RegistryError::DuplicateName { name });
                }
            }
            entries.push(RegisteredBackend {
                backend,
                enabled: false,
                permits: Arc::new(Semaphore::new(concurrency)),
            });
        }

        for name in enabled {
            let slot = index
                .get(name.as_str())
                .copied()
                .ok_or_else(|| RegistryError::UnknownEnabled { name: name.clone() })?;
            entries[slot].enabled = true;
        }

        Ok(BackendRegistry { entries, index })
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use async_trait::async_trait;

    use super::*;

    struct Named(&'static str, &'static [&'static str]);

    #[async_trait]
    impl ProcessingBackend for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn aliases(&self) -> &'static [&'static str] {
            self.1
        }

        async fn process(
            &self,
            _input: &Path,
            output: &Path,
            _job: &Job,
        ) -> BackendResult<PathBuf> {
            Ok(output.to_path_buf())
        }
    }

    fn enabled(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn lookup_distinguishes_ready_disabled_and_unknown() -> RegistryResult<()> {
        let registry = BackendRegistry::builder()
            .register(Arc::new(Named("denoise", &["rnnoise"])), 1)
            .register(Arc::new(Named("spleeter", &[])), 1)
            .build(&enabled(&["denoise"]))?;

        assert!(matches!(registry.lookup("denoise"), Lookup::Ready(_)));
        assert!(matches!(
            registry.lookup("rnnoise"),
            Lookup::Ready(entry) if entry.name() == "denoise"
        ));
        assert!(matches!(registry.lookup("spleeter"), Lookup::Disabled(_)));
        assert!(matches!(registry.lookup("karaoke"), Lookup::Unknown));
        Ok(())
    }

    #[test]
    fn duplicate_alias_is_rejected() {
        let result = BackendRegistry::builder()
            .register(Arc::new(Named("separation", &["demucs"])), 1)
            .register(Arc::new(Named("demucs", &[])), 1)
            .build(&[]);
        assert!(matches!(
            result,
            Err(RegistryError::DuplicateName { name: "demucs" })
        ));
    }

    #[test]
    fn unknown_enabled_method_is_rejected() {
        let result = BackendRegistry::builder()
            .register(Arc::new(Named("denoise", &[])), 1)
            .build(&enabled(&["karaoke"]));
        assert!(matches!(
            result,
            Err(RegistryError::UnknownEnabled { ref name }) if name == "karaoke"
        ));
    }

    #[test]
    fn enabled_list_accepts_aliases() -> RegistryResult<()> {
        let registry = BackendRegistry::builder()
            .register(Arc::new(Named("voice-activity", &["silero"])), 1)
            .build(&enabled(&["silero"]))?;
        assert!(matches!(registry.lookup("voice-activity"), Lookup::Ready(_)));
        Ok(())
    }

    #[tokio::test]
    async fn permit_outlives_caller_while_a_worker_holds_the_job()
    -> Result<(), Box<dyn std::error::Error>> {
        let registry = BackendRegistry::builder()
            .register(Arc::new(Named("denoise", &[])), 1)
            .build(&enabled(&["denoise"]))?;
        let Lookup::Ready(entry) = registry.lookup("denoise") else {
            return Err("denoise should be ready".into());
        };

        let job = entry.acquire().await?;
        let worker = job.clone();
        assert_eq!(entry.available_permits(), 0);
        drop(job);
        assert_eq!(entry.available_permits(), 0);
        drop(worker);
        assert_eq!(entry.available_permits(), 1);
        Ok(())
    }

    #[test]
    fn default_config_registers_builtins() -> RegistryResult<()> {
        let registry = BackendRegistry::from_config(&ServiceConfig::default())?;
        let names: Vec<_> = registry.iter().map(RegisteredBackend::name).collect();
        assert_eq!(names, ["separation", "denoise", "voice-activity", "spleeter"]);
        assert!(matches!(registry.lookup("demucs"), Lookup::Ready(_)));
        assert!(matches!(registry.lookup("silero"), Lookup::Ready(_)));
        assert!(matches!(registry.lookup("spleeter"), Lookup::Disabled(_)));
        Ok(())
    }
}
