#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links
)]
#![allow(clippy::module_name_repetitions)]

//! Typed service configuration for Soundry.
//!
//! Layout: `model.rs` (typed sections), `defaults.rs` (built-in values),
//! `loader.rs` (YAML file + environment overrides), `validate.rs`
//! (field validation), `error.rs` (error types).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ENV_CONFIG_PATH, from_yaml_str, load, load_with};
pub use model::{
    LoggingSettings, MethodsConfig, ProcessingConfig, SeparationConfig, ServerConfig,
    ServiceConfig, SpleeterConfig, StorageConfig, VoiceActivityConfig,
};
pub use validate::validate;
