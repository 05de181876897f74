//! filesearch common library
//!
//! Shared types, logging, and error handling for the filesearch workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the base error type for name and payload validation
//! - **Logging**: tracing subscriber setup shared by the CLI and the server
//! - **Types**: provider wire types (stores, documents, files, operations) and
//!   normalized resource names
//!
//! # Example
//!
//! ```no_run
//! use filesearch_common::types::{ChunkingConfig, StoreName};
//!
//! fn target() -> filesearch_common::Result<StoreName> {
//!     ChunkingConfig::default().validate()?;
//!     StoreName::parse("my-store-123")
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{FileSearchError, Result};
