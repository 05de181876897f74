use crate::api::response::ApiResponse;
use crate::error::AppResult;
use crate::features::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use filesearch_common::types::{Operation, OperationName};
use filesearch_ingest::IngestError;
use serde::Deserialize;
use std::time::Duration;

/// Longest a single request may hold the connection waiting.
pub const MAX_WAIT_SECS: u64 = 600;

pub fn operations_routes() -> Router<AppState> {
    Router::new().route("/*name", get(get_operation))
}

#[derive(Debug, Default, Deserialize)]
pub struct OperationQuery {
    /// Poll until done or this many seconds pass
    pub wait_secs: Option<u64>,
}

/// `200` when done, `202` while still running, `422` when indexing failed.
#[tracing::instrument(skip(state, query), fields(operation = %name))]
async fn get_operation(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<OperationQuery>,
) -> AppResult<Response> {
    let operation = OperationName::parse(&name)?;

    let op = match query.wait_secs {
        Some(secs) => {
            let timeout = Duration::from_secs(secs.min(MAX_WAIT_SECS));
            let cancel = state.shutdown.child_token();
            state
                .orchestrator
                .wait(&operation, Some(timeout), &cancel)
                .await?
        }
        None => settle(state.stores.get_operation(&operation).await?)?,
    };

    let status = if op.done {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    Ok(ApiResponse::success(op).with_status(status))
}

/// A single fetch reports failure the same way a wait does.
fn settle(op: Operation) -> Result<Operation, IngestError> {
    match op.failure() {
        Some(failure) => Err(IngestError::IndexingFailed {
            operation: op.name.clone(),
            code: failure.code,
            message: failure.message.clone(),
        }),
        None => Ok(op),
    }
}
