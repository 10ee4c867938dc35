//! Upload and output areas, file identities, and the retention sweeper.
#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links
)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod identity;
pub mod layout;
pub mod sweeper;

pub use error::{StorageError, StorageResult};
pub use identity::{AudioExtension, FileIdentity, UploadToken, parse_artifact_name};
pub use layout::{OutputArtifact, StorageLayout, Upload};
pub use sweeper::{RetentionSweeper, SweepReport};
