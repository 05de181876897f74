use crate::error::{FileSearchError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metadata::CustomMetadata;

pub const DEFAULT_MAX_TOKENS_PER_CHUNK: u32 = 200;
pub const DEFAULT_MAX_OVERLAP_TOKENS: u32 = 20;

/// Chunking parameters forwarded to the provider on import.
///
/// Only positivity is checked locally; what the values mean is up to the
/// provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkingConfig {
    pub max_tokens_per_chunk: u32,
    pub max_overlap_tokens: u32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_chunk: DEFAULT_MAX_TOKENS_PER_CHUNK,
            max_overlap_tokens: DEFAULT_MAX_OVERLAP_TOKENS,
        }
    }
}

impl ChunkingConfig {
    pub fn new(max_tokens_per_chunk: u32, max_overlap_tokens: u32) -> Self {
        Self {
            max_tokens_per_chunk,
            max_overlap_tokens,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tokens_per_chunk == 0 {
            return Err(FileSearchError::InvalidChunking(
                "max_tokens_per_chunk must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// A completed upload. Immutable; its `name` is what import consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::int64::option"
    )]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
}

/// File Search Store resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(default, with = "super::int64")]
    pub active_documents_count: u64,
    #[serde(default, with = "super::int64")]
    pub pending_documents_count: u64,
    #[serde(default, with = "super::int64")]
    pub failed_documents_count: u64,
    #[serde(default, with = "super::int64")]
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreList {
    #[serde(default)]
    pub file_search_stores: Vec<Store>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Document lifecycle as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentState {
    #[default]
    StateUnspecified,
    StatePending,
    StateActive,
    StateFailed,
}

impl DocumentState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentState::StateActive | DocumentState::StateFailed)
    }
}

impl std::fmt::Display for DocumentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DocumentState::StateUnspecified => "STATE_UNSPECIFIED",
            DocumentState::StatePending => "STATE_PENDING",
            DocumentState::StateActive => "STATE_ACTIVE",
            DocumentState::StateFailed => "STATE_FAILED",
        };
        f.write_str(name)
    }
}

/// Document resource in a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_metadata: Vec<CustomMetadata>,
    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub state: DocumentState,
    #[serde(default, with = "super::int64")]
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentList {
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}
