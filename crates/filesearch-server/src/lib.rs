//! filesearch server library
//!
//! HTTP front end for ingesting documents into File Search stores.
//!
//! # Overview
//!
//! - **Upload**: multipart uploads are spooled to a temp file, then pushed
//!   through the resumable upload protocol and imported into a store
//! - **Operations**: import progress, optionally waiting server-side
//! - **Stores**: store and document management passthrough
//! - **Middleware**: CORS, request tracing and body limits
//!
//! Every in-flight ingestion listens on one shared cancellation token that
//! is cancelled when the server shuts down.
//!
//! # Example
//!
//! ```no_run
//! use filesearch_server::{config::Config, create_router, features::AppState};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let state = AppState::new(&config, CancellationToken::new())?;
//!     let app = create_router(state, &config);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod middleware;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod testing;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::future::{Future, IntoFuture};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use features::AppState;

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", features::router(state))
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Serve `app` until `signal` resolves.
///
/// The signal cancels `shutdown`, which stops in-flight ingestions, and the
/// listener stops accepting at once. Connections still open after
/// `drain_timeout` are abandoned.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    signal: impl Future<Output = ()> + Send + 'static,
    shutdown: CancellationToken,
    drain_timeout: Duration,
) -> std::io::Result<()> {
    let token = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            token.cancel();
        })
        .into_future();

    let drain_deadline = async {
        shutdown.cancelled().await;
        tracing::info!("Waiting up to {:?} for connections to close", drain_timeout);
        tokio::time::sleep(drain_timeout).await;
    };

    tokio::select! {
        served = server => {
            served?;
            tracing::info!("Server shut down gracefully");
        }
        _ = drain_deadline => {
            tracing::warn!("Connections still open after {:?}, exiting", drain_timeout);
        }
    }
    Ok(())
}

/// Liveness only; the provider is not contacted.
async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::UploadLimits;
    use crate::testing::{test_config, test_state};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = test_config("http://127.0.0.1:9", UploadLimits::default());
        create_router(test_state("http://127.0.0.1:9", UploadLimits::default()), &config)
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
    }

    async fn bound() -> (TcpListener, std::net::SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr)
    }

    #[tokio::test]
    async fn test_serve_stops_accepting_as_soon_as_signalled() {
        let (listener, addr) = bound().await;
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let shutdown = CancellationToken::new();

        let started = std::time::Instant::now();
        let server = tokio::spawn(serve(
            listener,
            app(),
            async move {
                let _ = rx.await;
            },
            shutdown.clone(),
            Duration::from_secs(30),
        ));

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();

        assert!(shutdown.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_serve_abandons_connections_after_drain_timeout() {
        use tokio::io::AsyncWriteExt;

        let (listener, addr) = bound().await;
        let stuck = Router::new().route("/stuck", get(|| std::future::pending::<&'static str>()));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let shutdown = CancellationToken::new();

        let server = tokio::spawn(serve(
            listener,
            stuck,
            async move {
                let _ = rx.await;
            },
            shutdown.clone(),
            Duration::from_millis(200),
        ));

        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /stuck HTTP/1.1\r\nhost: localhost\r\n\r\n")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server kept waiting on the open connection")
            .unwrap()
            .unwrap();
        assert!(shutdown.is_cancelled());
        drop(client);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = app()
            .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_store_id_is_bad_request() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/stores/bad%20id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
