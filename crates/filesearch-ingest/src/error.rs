//! Error taxonomy for the ingestion pipeline
//!
//! Transient causes (transport failures, 429, 5xx) never surface on their
//! own: they are retried and, once the attempt budget is spent, come back
//! wrapped in [`IngestError::RetriesExhausted`]. Every other variant is
//! permanent for the call that produced it.

use filesearch_common::types::Operation;
use filesearch_common::FileSearchError;
use std::time::Duration;
use thiserror::Error;

use crate::transport::TransportError;

/// Which request family an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Upload session negotiation
    Start,
    /// Byte transfer to the session URL
    Transfer,
    /// Store import call
    Import,
    /// Operation or document status fetch
    Poll,
    /// Store and document management calls
    Store,
    /// Grounded generation and model listing
    Search,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Start => "upload-start",
            Phase::Transfer => "upload-transfer",
            Phase::Import => "import",
            Phase::Poll => "poll",
            Phase::Store => "store",
            Phase::Search => "search",
        };
        f.write_str(name)
    }
}

/// Why session negotiation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFailure {
    /// The provider refused the start request
    Rejected,
    /// Start succeeded but carried no `X-Goog-Upload-URL` header
    NoUploadSession,
}

/// Why a byte transfer failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferFailure {
    /// The provider refused a segment
    Rejected,
    /// The provider acknowledged a different offset than the one tracked locally
    OffsetMismatch { acknowledged: u64 },
    /// The source did not yield exactly the declared number of bytes
    LengthMismatch { declared: u64, actual: u64 },
    /// The session URL was rejected and the upload could not be restarted
    SessionExpired,
}

impl std::fmt::Display for TransferFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferFailure::Rejected => f.write_str("segment rejected"),
            TransferFailure::OffsetMismatch { acknowledged } => {
                write!(f, "provider acknowledged offset {acknowledged}")
            }
            TransferFailure::LengthMismatch { declared, actual } => {
                write!(f, "declared {declared} bytes but source yielded {actual}")
            }
            TransferFailure::SessionExpired => f.write_str("upload session expired"),
        }
    }
}

fn status_text(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{phase}: no response from provider: {source}")]
    Transport {
        phase: Phase,
        #[source]
        source: TransportError,
    },

    #[error("{phase}: provider answered HTTP {status}: {body}")]
    UnexpectedStatus {
        phase: Phase,
        status: u16,
        body: String,
    },

    #[error("upload session negotiation failed ({kind:?}, status {}) after {attempts} attempt(s): {detail}", status_text(.status))]
    SessionNegotiation {
        kind: SessionFailure,
        status: Option<u16>,
        attempts: u32,
        detail: String,
    },

    #[error("upload transfer failed at offset {offset} ({kind}, status {}) after {attempts} attempt(s): {detail}", status_text(.status))]
    Transfer {
        kind: TransferFailure,
        offset: u64,
        status: Option<u16>,
        attempts: u32,
        detail: String,
    },

    #[error("import into {store} rejected with HTTP {status} after {attempts} attempt(s): {body}")]
    ImportRejected {
        store: String,
        status: u16,
        attempts: u32,
        body: String,
    },

    #[error("{phase}: request rejected with HTTP {status}: {body}")]
    ApiRejected {
        phase: Phase,
        status: u16,
        attempts: u32,
        body: String,
    },

    #[error("indexing of {operation} failed (code {code}): {message}")]
    IndexingFailed {
        operation: String,
        code: i32,
        message: String,
    },

    #[error("{operation} still running after {elapsed:?} ({polls} status fetches); poll again later")]
    PollingTimeout {
        operation: String,
        elapsed: Duration,
        polls: u32,
        last: Option<Box<Operation>>,
    },

    #[error("{phase}: gave up after {attempts} attempt(s) over {elapsed:?}")]
    RetriesExhausted {
        phase: Phase,
        attempts: u32,
        elapsed: Duration,
        last_status: Option<u16>,
        #[source]
        cause: Box<IngestError>,
    },

    #[error("{phase}: could not decode provider response: {message}")]
    Decode { phase: Phase, message: String },

    #[error("{phase}: deadline exceeded after {elapsed:?}")]
    DeadlineExceeded { phase: Phase, elapsed: Duration },

    #[error("search prompt blocked by the provider: {reason}")]
    SearchBlocked { reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to read upload source: {0}")]
    Source(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("ingestion cancelled")]
    Cancelled,
}

impl From<FileSearchError> for IngestError {
    fn from(err: FileSearchError) -> Self {
        IngestError::InvalidRequest(err.to_string())
    }
}

impl IngestError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The phase the error was raised in, where one applies.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            IngestError::Transport { phase, .. }
            | IngestError::UnexpectedStatus { phase, .. }
            | IngestError::ApiRejected { phase, .. }
            | IngestError::RetriesExhausted { phase, .. }
            | IngestError::Decode { phase, .. }
            | IngestError::DeadlineExceeded { phase, .. } => Some(*phase),
            IngestError::SessionNegotiation { .. } => Some(Phase::Start),
            IngestError::Transfer { .. } => Some(Phase::Transfer),
            IngestError::ImportRejected { .. } => Some(Phase::Import),
            IngestError::IndexingFailed { .. } | IngestError::PollingTimeout { .. } => {
                Some(Phase::Poll)
            }
            IngestError::SearchBlocked { .. } => Some(Phase::Search),
            _ => None,
        }
    }

    /// Requests issued before the error surfaced.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            IngestError::SessionNegotiation { attempts, .. }
            | IngestError::Transfer { attempts, .. }
            | IngestError::ImportRejected { attempts, .. }
            | IngestError::ApiRejected { attempts, .. }
            | IngestError::RetriesExhausted { attempts, .. } => Some(*attempts),
            IngestError::PollingTimeout { polls, .. } => Some(*polls),
            _ => None,
        }
    }

    /// Last HTTP status observed from the provider.
    pub fn last_status(&self) -> Option<u16> {
        match self {
            IngestError::UnexpectedStatus { status, .. }
            | IngestError::ImportRejected { status, .. }
            | IngestError::ApiRejected { status, .. } => Some(*status),
            IngestError::SessionNegotiation { status, .. }
            | IngestError::Transfer { status, .. } => *status,
            IngestError::RetriesExhausted { last_status, .. } => *last_status,
            _ => None,
        }
    }

    /// True for [`IngestError::PollingTimeout`]: the work is still running
    /// and the caller should poll again rather than report a failure.
    pub fn is_still_running(&self) -> bool {
        matches!(self, IngestError::PollingTimeout { .. })
    }

    /// True when the upload start never yielded a session URL.
    pub fn is_no_upload_session(&self) -> bool {
        matches!(
            self,
            IngestError::SessionNegotiation {
                kind: SessionFailure::NoUploadSession,
                ..
            }
        )
    }
}
