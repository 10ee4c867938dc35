#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links
)]

//! `soundry` binary: loads configuration and serves the API until shutdown.

use soundry_app::{AppResult, run_app};

/// Boots Soundry and blocks until shutdown.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
