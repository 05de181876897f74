//! Feature modules implementing the filesearch API
//!
//! Each feature is a vertical slice with its own `routes.rs`:
//!
//! - **media**: multipart upload and import-by-name into a store
//! - **operations**: status of long-running import operations
//! - **search**: grounded questions over stores, and the models that answer them
//! - **stores**: store and document management

pub mod media;
pub mod operations;
pub mod search;
pub mod stores;

use axum::Router;
use filesearch_ingest::{ApiClient, IngestError, IngestionOrchestrator, SearchClient, StoreClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, UploadLimits};

/// Shared state for all feature routes
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: IngestionOrchestrator,
    pub stores: StoreClient,
    pub search: SearchClient,
    pub limits: Arc<UploadLimits>,
    /// Cancelled when the server starts shutting down
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: &Config, shutdown: CancellationToken) -> Result<Self, IngestError> {
        let api = ApiClient::from_config(&config.client)?;
        Ok(Self {
            orchestrator: IngestionOrchestrator::new(api.clone(), &config.client),
            stores: StoreClient::new(api.clone()),
            search: SearchClient::new(api),
            limits: Arc::new(config.upload.clone()),
            shutdown,
        })
    }
}

/// Creates the API router with all feature routes mounted
///
/// - `/stores` - store and document management, upload and import
/// - `/operations` - operation status
/// - `/search`, `/models` - grounded search
pub fn router(state: AppState) -> Router<()> {
    let limits = state.limits.clone();
    Router::new()
        .nest(
            "/stores",
            stores::stores_routes().merge(media::media_routes(&limits)),
        )
        .nest("/operations", operations::operations_routes())
        .merge(search::search_routes())
        .with_state(state)
}
