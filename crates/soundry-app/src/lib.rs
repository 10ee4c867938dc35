#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links
)]
#![allow(clippy::module_name_repetitions)]

//! Soundry application bootstrap wiring.
//!
//! Layout: `cli.rs` (command-line flags), `bootstrap.rs` (service wiring,
//! background sweeping, shutdown), `error.rs` (error types).

/// Service wiring and the boot sequence.
pub mod bootstrap;
/// Command-line flags.
pub mod cli;
/// Application error types.
pub mod error;

pub use bootstrap::{build_dispatcher, run_app, run_with};
pub use cli::Cli;
pub use error::{AppError, AppResult};
