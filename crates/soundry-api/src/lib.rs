#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links
)]
#![allow(clippy::module_name_repetitions)]

//! HTTP surface for Soundry: upload dispatch, artifact downloads, health and
//! metrics.
//!
//! Layout: `dispatch.rs` (upload to backend to artifact), `http/` (router,
//! handlers, problem errors, middleware), `state.rs` (shared handler state),
//! `error.rs` (server lifecycle errors).

pub mod dispatch;
pub mod error;
pub mod http;
pub(crate) mod state;

pub use dispatch::{DispatchError, Dispatcher, ProcessedUpload};
pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;
