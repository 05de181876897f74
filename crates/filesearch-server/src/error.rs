//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use filesearch_common::FileSearchError;
use filesearch_ingest::IngestError;
use serde_json::json;
use thiserror::Error;

use crate::api::response::{ApiResponse, ErrorResponse};

/// Non-standard "client closed request" status.
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<FileSearchError> for AppError {
    fn from(err: FileSearchError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::Validation(format!("Malformed multipart body: {}", err.body_text()))
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Ingest(err) => return ingest_response(err),
            AppError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", message),
            ),
            AppError::PayloadTooLarge { limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorResponse::with_details(
                    "PAYLOAD_TOO_LARGE",
                    format!("Upload exceeds the {limit} byte limit"),
                    json!({ "max_upload_size": limit }),
                ),
            ),
            AppError::Io(ref e) => {
                tracing::error!("IO error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("INTERNAL_ERROR", "An IO error occurred"),
                )
            }
            AppError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("INTERNAL_ERROR", message),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Maps the ingestion taxonomy onto HTTP.
///
/// A polling timeout is not a failure: the caller gets `202` and the last
/// descriptor seen so it can poll again.
fn ingest_response(err: IngestError) -> Response {
    let message = err.to_string();
    let details = json!({
        "phase": err.phase().map(|p| p.to_string()),
        "attempts": err.attempts(),
        "last_status": err.last_status(),
    });

    let (status, code) = match err {
        IngestError::PollingTimeout { operation, last, elapsed, .. } => {
            let data = match last {
                Some(op) => json!(op),
                None => json!({ "name": operation, "done": false }),
            };
            let meta = json!({
                "still_running": true,
                "elapsed_ms": elapsed.as_millis() as u64,
                "message": message,
            });
            return (StatusCode::ACCEPTED, Json(ApiResponse::success_with_meta(data, meta)))
                .into_response();
        }
        IngestError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        IngestError::SessionNegotiation { .. }
        | IngestError::Transfer { .. }
        | IngestError::ImportRejected { .. }
        | IngestError::ApiRejected { .. }
        | IngestError::UnexpectedStatus { .. } => {
            if err.last_status() == Some(404) {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            } else {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_REJECTED")
            }
        }
        IngestError::Decode { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_INVALID_RESPONSE"),
        IngestError::RetriesExhausted { .. } | IngestError::Transport { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_UNAVAILABLE")
        }
        IngestError::IndexingFailed { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "INDEXING_FAILED"),
        IngestError::SearchBlocked { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "SEARCH_BLOCKED"),
        IngestError::DeadlineExceeded { .. } => (StatusCode::GATEWAY_TIMEOUT, "DEADLINE_EXCEEDED"),
        IngestError::Cancelled => {
            tracing::info!("Request cancelled before completion");
            (
                StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_REQUEST),
                "CANCELLED",
            )
        }
        IngestError::Source(ref e) => {
            tracing::error!("Upload source error: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
        IngestError::Config(ref e) => {
            tracing::error!("Configuration error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        }
    };

    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), error = %message, "Provider call failed");
    }

    (status, Json(ErrorResponse::with_details(code, message, details))).into_response()
}
