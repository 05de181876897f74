//! Store import: attaches an uploaded file to a store for indexing
//!
//! Returns the long-running operation as soon as the provider accepts the
//! request. Retries cover the request only; whether indexing succeeds is
//! for the poller to observe.

use filesearch_common::types::{
    validate_custom_metadata, ChunkingConfig, CustomMetadata, FileName, FileResource, Operation,
    StoreName,
};
use reqwest::Method;
use serde::Serialize;
use tracing::info;

use crate::client::{decode, ApiClient};
use crate::endpoints;
use crate::error::{IngestError, Phase};

/// Per-document import options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOptions {
    /// `None` leaves chunking to the provider's defaults
    pub chunking: Option<ChunkingConfig>,
    pub custom_metadata: Vec<CustomMetadata>,
}

impl ImportOptions {
    pub fn with_chunking(chunking: ChunkingConfig) -> Self {
        Self {
            chunking: Some(chunking),
            custom_metadata: Vec::new(),
        }
    }

    pub fn metadata(mut self, entry: CustomMetadata) -> Self {
        self.custom_metadata.push(entry);
        self
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if let Some(chunking) = &self.chunking {
            chunking.validate()?;
        }
        validate_custom_metadata(&self.custom_metadata)?;
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportFileBody<'a> {
    file_name: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    custom_metadata: &'a Vec<CustomMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunking_config: Option<ChunkingBody>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChunkingBody {
    white_space_config: ChunkingConfig,
}

#[derive(Debug, Clone)]
pub struct ImportClient {
    api: ApiClient,
}

impl ImportClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Import a freshly uploaded file.
    pub async fn import(
        &self,
        store: &StoreName,
        file: &FileResource,
        options: &ImportOptions,
    ) -> Result<Operation, IngestError> {
        let file_name = FileName::parse(&file.name)?;
        self.import_file_name(store, &file_name, options).await
    }

    /// Import by file name, for files uploaded earlier.
    #[tracing::instrument(skip(self, options), fields(store = %store, file = %file_name))]
    pub async fn import_file_name(
        &self,
        store: &StoreName,
        file_name: &FileName,
        options: &ImportOptions,
    ) -> Result<Operation, IngestError> {
        options.validate()?;

        let body = ImportFileBody {
            file_name: file_name.as_str(),
            custom_metadata: &options.custom_metadata,
            chunking_config: options.chunking.map(|c| ChunkingBody {
                white_space_config: c,
            }),
        };
        let request = self
            .api
            .request(Method::POST, endpoints::import_file_url(self.api.base_url(), store))
            .json(&body)
            .map_err(|e| IngestError::invalid(format!("cannot encode import body: {e}")))?;

        let finished = self.api.execute(Phase::Import, || request.clone()).await?;
        let response = finished.response;
        if !response.is_success() {
            return Err(IngestError::ImportRejected {
                store: store.to_string(),
                status: response.status,
                attempts: finished.state.attempts,
                body: response.body_snippet(),
            });
        }

        let operation: Operation = decode(Phase::Import, &response)?;
        info!(
            operation = %operation.name,
            done = operation.done,
            attempts = finished.state.attempts,
            "Import accepted"
        );
        Ok(operation)
    }
}
