//! Router construction and server host for the API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, Request, header::CONTENT_TYPE},
    routing::{get, post},
};
use soundry_config::ServerConfig;
use soundry_telemetry::{Metrics, build_sha};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Span, info};

use crate::dispatch::Dispatcher;
use crate::error::{ApiServerError, ApiServerResult};
use crate::http::constants::HEADER_REQUEST_ID;
use crate::http::download::download_artifact;
use crate::http::health::{health, metrics};
use crate::http::process::process_audio;
use crate::http::telemetry::HttpMetricsLayer;
use crate::state::ApiState;

/// Axum router wrapper that hosts the Soundry API.
#[derive(Debug)]
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Wire the dispatcher and telemetry into a router.
    ///
    /// `max_upload_bytes` caps request bodies; larger uploads answer `413`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError::InvalidCorsOrigin`] when a configured origin
    /// is not a valid header value.
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        telemetry: Metrics,
        server: &ServerConfig,
        max_upload_bytes: usize,
    ) -> ApiServerResult<Self> {
        let state = Arc::new(ApiState::new(
            dispatcher,
            telemetry.clone(),
            server.public_base_url.clone(),
        ));
        let cors_layer = Self::cors_layer(&server.cors_origins)?;
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();

                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    route = tracing::field::Empty,
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(soundry_telemetry::propagate_request_id_layer())
            .layer(soundry_telemetry::set_request_id_layer())
            .layer(trace_layer);

        let router = Router::new()
            .route("/process/{method}", post(process_audio))
            .route("/download/{name}", get(download_artifact))
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route_layer(HttpMetricsLayer::new(telemetry))
            .layer(DefaultBodyLimit::max(max_upload_bytes))
            .layer(cors_layer)
            .layer(layered)
            .with_state(state);

        Ok(Self { router })
    }

    fn cors_layer(origins: &[String]) -> ApiServerResult<CorsLayer> {
        let origins = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|_| ApiServerError::InvalidCorsOrigin {
                    origin: origin.clone(),
                })
            })
            .collect::<ApiServerResult<Vec<_>>>()?;

        Ok(CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE, HeaderName::from_static(HEADER_REQUEST_ID)])
            .expose_headers([HeaderName::from_static(HEADER_REQUEST_ID)]))
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve<F>(self, addr: SocketAddr, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        info!(%addr, "api listening");
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }

    #[cfg(test)]
    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }
}
