//! Shared state handed to every handler.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use soundry_telemetry::Metrics;

use crate::dispatch::Dispatcher;

/// Handler state; cheap to clone behind an [`Arc`].
#[derive(Debug)]
pub(crate) struct ApiState {
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) telemetry: Metrics,
    public_base_url: Option<String>,
    pub(crate) started_at: DateTime<Utc>,
}

impl ApiState {
    pub(crate) fn new(
        dispatcher: Arc<Dispatcher>,
        telemetry: Metrics,
        public_base_url: Option<String>,
    ) -> Self {
        Self {
            dispatcher,
            telemetry,
            public_base_url,
            started_at: Utc::now(),
        }
    }

    /// Download URL for `name`: relative unless a public base URL is configured.
    pub(crate) fn download_url(&self, name: &str) -> String {
        match self.public_base_url.as_deref() {
            Some(base) => format!("{}/download/{name}", base.trim_end_matches('/')),
            None => format!("/download/{name}"),
        }
    }
}
