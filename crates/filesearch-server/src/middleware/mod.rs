//! Middleware for the filesearch server
//!
//! - CORS (Cross-Origin Resource Sharing)
//! - Request logging with tracing
//! - Request body limits sized to the upload limit

use axum::http::{header, Method};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::{CorsConfig, UploadLimits};

/// Room for multipart boundaries and the small text fields.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Create CORS layer from configuration
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(3600));

    if config.allowed_origins.is_empty() || config.allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    if config.allow_credentials {
        cors = cors.allow_credentials(true);
    }

    cors
}

/// Create tracing/logging layer
pub fn tracing_layer(
) -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>>
{
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(tower_http::LatencyUnit::Micros),
        )
}

/// Hard cap on request bodies; the upload route enforces the exact file
/// size itself.
pub fn body_limit_layer(limits: &UploadLimits) -> RequestBodyLimitLayer {
    let limit = limits.max_upload_size.saturating_add(MULTIPART_OVERHEAD);
    RequestBodyLimitLayer::new(usize::try_from(limit).unwrap_or(usize::MAX))
}
