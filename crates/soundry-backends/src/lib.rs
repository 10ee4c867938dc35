//! Audio processing backends and the registry the dispatcher selects them from.
#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links
)]
#![allow(clippy::module_name_repetitions)]

pub mod audio;
pub mod backend;
pub mod denoise;
pub mod error;
pub mod job;
pub mod registry;
pub mod separation;
pub mod voice_activity;

pub use backend::ProcessingBackend;
pub use denoise::DenoiseBackend;
pub use error::{BackendError, BackendResult};
pub use job::Job;
pub use registry::{
    BackendRegistry, BackendRegistryBuilder, Lookup, RegisteredBackend, RegistryError,
    RegistryResult,
};
pub use separation::{SeparationBackend, SeparationTool};
pub use voice_activity::VoiceActivityBackend;
