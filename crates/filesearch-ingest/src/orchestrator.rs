//! Ingestion entry point: upload, then import
//!
//! [`IngestionOrchestrator::ingest`] returns the import operation as soon as
//! the provider accepts it. Waiting for indexing is a separate call,
//! [`IngestionOrchestrator::wait`], that holds no upload slot.

use filesearch_common::types::{FileResource, Operation, OperationName, StoreName};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::IngestError;
use crate::import::{ImportClient, ImportOptions};
use crate::poller::OperationPoller;
use crate::retry::deadline_after;
use crate::upload::{ResumableUploadClient, UploadRequest};

#[derive(Debug, Clone)]
pub struct IngestionOrchestrator {
    uploader: ResumableUploadClient,
    importer: ImportClient,
    poller: OperationPoller,
    limiter: Arc<Semaphore>,
    upload_timeout: Duration,
    poll_timeout: Duration,
}

impl IngestionOrchestrator {
    pub fn new(api: ApiClient, config: &ClientConfig) -> Self {
        Self {
            uploader: ResumableUploadClient::new(api.clone(), config.upload.clone()),
            importer: ImportClient::new(api.clone()),
            poller: OperationPoller::new(api, config.poll.clone()),
            limiter: Arc::new(Semaphore::new(config.upload.max_concurrent_uploads)),
            upload_timeout: config.upload.upload_timeout,
            poll_timeout: config.poll.default_timeout,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, IngestError> {
        Ok(Self::new(ApiClient::from_config(config)?, config))
    }

    pub fn poller(&self) -> &OperationPoller {
        &self.poller
    }

    pub fn importer(&self) -> &ImportClient {
        &self.importer
    }

    /// Upload slots currently free
    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }

    /// Upload `request` and import it into `store`.
    ///
    /// The returned operation is usually still running. If the upload
    /// fails, import is never attempted; if import fails, the uploaded file
    /// is left for the provider to expire.
    #[tracing::instrument(
        skip(self, request, options, cancel),
        fields(store = %store, bytes = request.content_length)
    )]
    pub async fn ingest(
        &self,
        store: &StoreName,
        request: UploadRequest,
        options: &ImportOptions,
        cancel: &CancellationToken,
    ) -> Result<Operation, IngestError> {
        request.validate()?;
        options.validate()?;

        let file = self.upload(request, cancel).await?;

        let imported = tokio::select! {
            _ = cancel.cancelled() => return Err(IngestError::Cancelled),
            imported = self.importer.import(store, &file, options) => imported,
        };
        let operation =
            imported.inspect_err(|e| warn!(file = %file.name, error = %e, "Import failed after upload"))?;

        info!(file = %file.name, operation = %operation.name, "Ingestion accepted");
        Ok(operation)
    }

    /// Upload only, under the concurrency limit and upload deadline.
    pub async fn upload(
        &self,
        request: UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<FileResource, IngestError> {
        let permit = self.acquire(cancel).await?;
        let deadline = deadline_after(self.upload_timeout);

        let uploaded = tokio::select! {
            _ = cancel.cancelled() => Err(IngestError::Cancelled),
            uploaded = self.uploader.upload(request, deadline) => uploaded,
        };
        drop(permit);
        uploaded
    }

    /// Wait for an operation to finish; `timeout` defaults to the poll
    /// configuration's.
    pub async fn wait(
        &self,
        operation: &OperationName,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<Operation, IngestError> {
        let deadline = deadline_after(timeout.unwrap_or(self.poll_timeout));
        self.poller.wait(operation, deadline, cancel).await
    }

    async fn acquire(&self, cancel: &CancellationToken) -> Result<OwnedSemaphorePermit, IngestError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(IngestError::Cancelled),
            // the limiter is never closed while the orchestrator lives
            permit = self.limiter.clone().acquire_owned() => permit.map_err(|_| IngestError::Cancelled),
        }
    }
}
