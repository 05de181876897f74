//! filesearch ingestion core
//!
//! Registers documents in a managed File Search store by composing three
//! provider primitives:
//!
//! - **Upload**: two-phase resumable upload of the bytes ([`upload`])
//! - **Import**: attach the uploaded file to a store ([`import`])
//! - **Poll**: follow the long-running indexing operation ([`poller`])
//!
//! [`IngestionOrchestrator`] sequences upload and import under a shared
//! concurrency limit and hands back the operation immediately. Waiting for
//! indexing is a separate call.
//!
//! # Example
//!
//! ```no_run
//! use filesearch_common::types::{ChunkingConfig, StoreName};
//! use filesearch_ingest::{ClientConfig, ImportOptions, IngestionOrchestrator, UploadRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let orchestrator = IngestionOrchestrator::from_config(&config)?;
//! let cancel = CancellationToken::new();
//!
//! let request = UploadRequest::from_file("guide.md", "text/markdown").await?;
//! let options = ImportOptions::with_chunking(ChunkingConfig::default());
//! let op = orchestrator
//!     .ingest(&StoreName::parse("docs")?, request, &options, &cancel)
//!     .await?;
//! let done = orchestrator.wait(&op.name.parse()?, None, &cancel).await?;
//! println!("{}", done.done);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod cli;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod import;
pub mod orchestrator;
pub mod poller;
pub mod progress;
pub mod retry;
pub mod search;
pub mod stores;
pub mod transport;
pub mod upload;

#[cfg(test)]
mod testing;

pub use client::ApiClient;
pub use config::{ClientConfig, PollConfig, RetryConfig, UploadConfig};
pub use error::{IngestError, Phase};
pub use import::{ImportClient, ImportOptions};
pub use orchestrator::IngestionOrchestrator;
pub use poller::OperationPoller;
pub use retry::{Action, RetryPolicy};
pub use search::{SearchClient, SearchRequest};
pub use stores::StoreClient;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
pub use upload::{ByteSource, ResumableUploadClient, UploadRequest};
