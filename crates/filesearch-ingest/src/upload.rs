//! Resumable upload client
//!
//! Two phases, always in this order:
//!
//! 1. **Start**: `POST /upload/v1beta/files` declaring length, MIME type and
//!    display name in headers and a JSON body. The provider answers with
//!    the session URL in `X-Goog-Upload-URL`.
//! 2. **Transfer**: one or more `POST`s to the session URL, each carrying
//!    `X-Goog-Upload-Offset` and `X-Goog-Upload-Command` (`upload`, or
//!    `upload, finalize` on the last segment). The finalize response holds
//!    the file resource.
//!
//! Each phase retries on its own. A transient transfer failure retries the
//! same segment at the same offset; only a rejected session URL (404/410)
//! sends the upload back to phase 1, and only when the source can be read
//! again from the start.

use bytes::{Bytes, BytesMut};
use filesearch_common::types::FileResource;
use reqwest::header::{HeaderName, HeaderValue, CONTENT_LENGTH};
use reqwest::Method;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::{decode, ApiClient};
use crate::config::UploadConfig;
use crate::endpoints;
use crate::error::{IngestError, Phase, SessionFailure, TransferFailure};

const UPLOAD_PROTOCOL: HeaderName = HeaderName::from_static("x-goog-upload-protocol");
const UPLOAD_COMMAND: HeaderName = HeaderName::from_static("x-goog-upload-command");
const UPLOAD_OFFSET: HeaderName = HeaderName::from_static("x-goog-upload-offset");
const UPLOAD_HEADER_CONTENT_LENGTH: HeaderName =
    HeaderName::from_static("x-goog-upload-header-content-length");
const UPLOAD_HEADER_CONTENT_TYPE: HeaderName =
    HeaderName::from_static("x-goog-upload-header-content-type");
const UPLOAD_URL: &str = "x-goog-upload-url";
const UPLOAD_CHUNK_GRANULARITY: &str = "x-goog-upload-chunk-granularity";
const UPLOAD_SIZE_RECEIVED: &str = "x-goog-upload-size-received";

const MAX_DISPLAY_NAME_CHARS: usize = 512;

/// Where the payload bytes come from
pub enum ByteSource {
    /// In memory; segments are zero-copy slices
    Memory(Bytes),
    /// On disk; reopened if the upload has to restart
    File(PathBuf),
    /// Read once, cannot be rewound
    Stream(Box<dyn AsyncRead + Send + Sync + Unpin>),
}

impl std::fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ByteSource::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            ByteSource::File(path) => write!(f, "File({})", path.display()),
            ByteSource::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl ByteSource {
    pub fn is_rewindable(&self) -> bool {
        !matches!(self, ByteSource::Stream(_))
    }
}

/// One document to upload
#[derive(Debug)]
pub struct UploadRequest {
    pub source: ByteSource,
    /// Must equal the number of bytes the source yields
    pub content_length: u64,
    pub mime_type: String,
    pub display_name: Option<String>,
}

impl UploadRequest {
    pub fn from_bytes(bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        let bytes = bytes.into();
        Self {
            content_length: bytes.len() as u64,
            source: ByteSource::Memory(bytes),
            mime_type: mime_type.into(),
            display_name: None,
        }
    }

    /// Length is taken from the file's metadata at call time.
    pub async fn from_file(path: impl AsRef<Path>, mime_type: impl Into<String>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        Ok(Self {
            content_length: metadata.len(),
            source: ByteSource::File(path),
            mime_type: mime_type.into(),
            display_name: None,
        })
    }

    pub fn from_reader(
        reader: impl AsyncRead + Send + Sync + Unpin + 'static,
        content_length: u64,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            source: ByteSource::Stream(Box::new(reader)),
            content_length,
            mime_type: mime_type.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        self.mime_type
            .parse::<mime::Mime>()
            .map_err(|e| IngestError::invalid(format!("invalid MIME type '{}': {}", self.mime_type, e)))?;
        if let Some(name) = &self.display_name {
            if name.chars().count() > MAX_DISPLAY_NAME_CHARS {
                return Err(IngestError::invalid(format!(
                    "display name exceeds {MAX_DISPLAY_NAME_CHARS} characters"
                )));
            }
        }
        if self.content_length > i64::MAX as u64 {
            return Err(IngestError::invalid("content length exceeds int64 range"));
        }
        Ok(())
    }
}

/// MIME type for common document extensions, `None` when unknown.
pub fn guess_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => return None,
    };
    Some(mime)
}

/// Provider-issued session, owned by one upload call
pub struct UploadSession {
    url: String,
    offset: u64,
    finalized: bool,
    granularity: Option<u64>,
}

impl std::fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // the URL embeds the upload id
        f.debug_struct("UploadSession")
            .field("offset", &self.offset)
            .field("finalized", &self.finalized)
            .field("granularity", &self.granularity)
            .finish_non_exhaustive()
    }
}

impl UploadSession {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Bytes per transfer segment for a payload of `declared` bytes.
    fn segment_size(&self, chunk_size: Option<u64>, declared: u64) -> u64 {
        let Some(chunk) = chunk_size else {
            return declared;
        };
        match self.granularity.filter(|g| *g > 0) {
            Some(g) => (chunk / g).max(1) * g,
            None => chunk.max(1),
        }
    }
}

/// Sequential reader over a [`ByteSource`]. Owns the open file or stream so
/// it is released on every exit path.
enum SegmentReader {
    Memory { bytes: Bytes, position: usize },
    Reader(Box<dyn AsyncRead + Send + Sync + Unpin>),
}

impl SegmentReader {
    async fn open(source: &mut ByteSource) -> Result<Self, IngestError> {
        match source {
            ByteSource::Memory(bytes) => Ok(SegmentReader::Memory {
                bytes: bytes.clone(),
                position: 0,
            }),
            ByteSource::File(path) => {
                let file = tokio::fs::File::open(path.as_path()).await?;
                Ok(SegmentReader::Reader(Box::new(file)))
            }
            ByteSource::Stream(reader) => {
                // a stream is read at most once; leave an empty reader behind
                let reader = std::mem::replace(reader, Box::new(tokio::io::empty()));
                Ok(SegmentReader::Reader(reader))
            }
        }
    }

    /// Up to `max` bytes; fewer only at end of input.
    async fn next_segment(&mut self, max: u64) -> Result<Bytes, IngestError> {
        match self {
            SegmentReader::Memory { bytes, position } => {
                let end = bytes.len().min(position.saturating_add(max as usize));
                let segment = bytes.slice(*position..end);
                *position = end;
                Ok(segment)
            }
            SegmentReader::Reader(reader) => {
                let mut buffer = BytesMut::with_capacity(max.min(8 * 1024 * 1024) as usize);
                let mut limited = reader.take(max);
                loop {
                    let read = limited.read_buf(&mut buffer).await?;
                    if read == 0 {
                        break;
                    }
                }
                Ok(buffer.freeze())
            }
        }
    }

    async fn is_exhausted(&mut self) -> Result<bool, IngestError> {
        match self {
            SegmentReader::Memory { bytes, position } => Ok(*position >= bytes.len()),
            SegmentReader::Reader(reader) => {
                let mut peek = [0u8; 1];
                Ok(reader.read(&mut peek).await? == 0)
            }
        }
    }
}

/// Finalize bodies come wrapped (`{"file": {...}}`) or bare.
#[derive(Deserialize)]
#[serde(untagged)]
enum FinalizeBody {
    Wrapped { file: FileResource },
    Bare(FileResource),
}

enum Transferred {
    Complete(FileResource),
    SessionLost { status: u16, offset: u64, attempts: u32 },
}

#[derive(Debug, Clone)]
pub struct ResumableUploadClient {
    api: ApiClient,
    config: UploadConfig,
}

impl ResumableUploadClient {
    pub fn new(api: ApiClient, config: UploadConfig) -> Self {
        Self { api, config }
    }

    /// Upload `request` and return the provider's file resource.
    ///
    /// `deadline` bounds both phases together, retries included.
    #[tracing::instrument(
        skip(self, request),
        fields(bytes = request.content_length, mime = %request.mime_type)
    )]
    pub async fn upload(
        &self,
        mut request: UploadRequest,
        deadline: Instant,
    ) -> Result<FileResource, IngestError> {
        request.validate()?;
        let started = Instant::now();
        let mut restarts = 0u32;

        loop {
            let session = tokio::time::timeout_at(deadline, self.start(&request))
                .await
                .map_err(|_| IngestError::DeadlineExceeded {
                    phase: Phase::Start,
                    elapsed: started.elapsed(),
                })??;

            let transferred = tokio::time::timeout_at(
                deadline,
                self.transfer(session, &mut request.source, request.content_length),
            )
            .await
            .map_err(|_| IngestError::DeadlineExceeded {
                phase: Phase::Transfer,
                elapsed: started.elapsed(),
            })??;

            match transferred {
                Transferred::Complete(file) => {
                    info!(
                        file = %file.name,
                        bytes = request.content_length,
                        restarts,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Upload finalized"
                    );
                    return Ok(file);
                }
                Transferred::SessionLost {
                    status,
                    offset,
                    attempts,
                } => {
                    let lost = |detail: &str| IngestError::Transfer {
                        kind: TransferFailure::SessionExpired,
                        offset,
                        status: Some(status),
                        attempts,
                        detail: detail.to_string(),
                    };
                    if !request.source.is_rewindable() {
                        return Err(lost("session rejected and the source cannot be rewound"));
                    }
                    if restarts >= self.config.max_session_restarts {
                        return Err(lost("session rejected and restart budget is spent"));
                    }
                    restarts += 1;
                    warn!(status, offset, restarts, "Upload session rejected, negotiating a new one");
                }
            }
        }
    }

    async fn start(&self, request: &UploadRequest) -> Result<UploadSession, IngestError> {
        let url = endpoints::upload_start_url(self.api.base_url());
        let content_type = HeaderValue::from_str(&request.mime_type)
            .map_err(|_| IngestError::invalid("MIME type is not a valid header value"))?;
        let body = serde_json::json!({
            "file": match &request.display_name {
                Some(name) => serde_json::json!({ "displayName": name }),
                None => serde_json::json!({}),
            }
        });
        let start = self
            .api
            .request(Method::POST, url)
            .header(UPLOAD_PROTOCOL, HeaderValue::from_static("resumable"))
            .header(UPLOAD_COMMAND, HeaderValue::from_static("start"))
            .header(UPLOAD_HEADER_CONTENT_LENGTH, HeaderValue::from(request.content_length))
            .header(UPLOAD_HEADER_CONTENT_TYPE, content_type)
            .json(&body)
            .map_err(|e| IngestError::invalid(format!("cannot encode start body: {e}")))?;

        let finished = self.api.execute(Phase::Start, || start.clone()).await?;
        let response = finished.response;
        let attempts = finished.state.attempts;

        if !response.is_success() {
            return Err(IngestError::SessionNegotiation {
                kind: SessionFailure::Rejected,
                status: Some(response.status),
                attempts,
                detail: response.body_snippet(),
            });
        }

        let url = response
            .header_str(UPLOAD_URL)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| IngestError::SessionNegotiation {
                kind: SessionFailure::NoUploadSession,
                status: Some(response.status),
                attempts,
                detail: "response carried no X-Goog-Upload-URL header".to_string(),
            })?
            .to_string();
        let granularity = response
            .header_str(UPLOAD_CHUNK_GRANULARITY)
            .and_then(|g| g.trim().parse().ok());

        debug!(attempts, granularity, "Upload session negotiated");
        Ok(UploadSession {
            url,
            offset: 0,
            finalized: false,
            granularity,
        })
    }

    async fn transfer(
        &self,
        mut session: UploadSession,
        source: &mut ByteSource,
        declared: u64,
    ) -> Result<Transferred, IngestError> {
        let segment_size = session.segment_size(self.config.chunk_size, declared);
        let mut reader = SegmentReader::open(source).await?;
        let mut total_attempts = 0u32;

        loop {
            let offset = session.offset;
            let want = segment_size.min(declared - offset);
            let segment = reader.next_segment(want).await?;
            let len = segment.len() as u64;

            if len < want {
                return Err(length_mismatch(declared, offset + len, offset, total_attempts));
            }
            let last = offset + len == declared;
            if last && !reader.is_exhausted().await? {
                return Err(length_mismatch(declared, declared + 1, offset, total_attempts));
            }

            let command = if last { "upload, finalize" } else { "upload" };
            let write = self
                .api
                .bare_request(Method::POST, session.url.clone())
                .header(UPLOAD_COMMAND, HeaderValue::from_static(command))
                .header(UPLOAD_OFFSET, HeaderValue::from(offset))
                .header(CONTENT_LENGTH, HeaderValue::from(len))
                .body(segment);

            let finished = self.api.execute(Phase::Transfer, || write.clone()).await?;
            let response = finished.response;
            total_attempts += finished.state.attempts;

            if matches!(response.status, 404 | 410) {
                return Ok(Transferred::SessionLost {
                    status: response.status,
                    offset,
                    attempts: total_attempts,
                });
            }
            if !response.is_success() {
                return Err(IngestError::Transfer {
                    kind: TransferFailure::Rejected,
                    offset,
                    status: Some(response.status),
                    attempts: total_attempts,
                    detail: response.body_snippet(),
                });
            }

            if let Some(acknowledged) = response
                .header_str(UPLOAD_SIZE_RECEIVED)
                .and_then(|v| v.trim().parse::<u64>().ok())
            {
                if acknowledged != offset + len {
                    return Err(IngestError::Transfer {
                        kind: TransferFailure::OffsetMismatch { acknowledged },
                        offset,
                        status: Some(response.status),
                        attempts: total_attempts,
                        detail: format!("expected {} bytes acknowledged", offset + len),
                    });
                }
            }
            session.offset += len;

            if last {
                session.finalized = true;
                let body: FinalizeBody = decode(Phase::Transfer, &response)?;
                let file = match body {
                    FinalizeBody::Wrapped { file } | FinalizeBody::Bare(file) => file,
                };
                return Ok(Transferred::Complete(file));
            }
            debug!(offset = session.offset, declared, "Segment acknowledged");
        }
    }
}

fn length_mismatch(declared: u64, actual: u64, offset: u64, attempts: u32) -> IngestError {
    IngestError::Transfer {
        kind: TransferFailure::LengthMismatch { declared, actual },
        offset,
        status: None,
        attempts,
        detail: "source length differs from declared content length; not finalized".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::testing::{response, test_config, with_header, ScriptedTransport};
    use std::sync::Arc;
    use std::time::Duration;

    const SESSION: &str = "http://provider.test/upload/session/abc";

    fn started() -> crate::transport::HttpResponse {
        with_header(response(200, ""), "x-goog-upload-url", SESSION)
    }

    fn finalized(name: &str) -> crate::transport::HttpResponse {
        response(200, &format!(r#"{{"file":{{"name":"{name}","sizeBytes":"11"}}}}"#))
    }

    fn client(transport: Arc<ScriptedTransport>, config: UploadConfig) -> ResumableUploadClient {
        ResumableUploadClient::new(ApiClient::new(transport, &test_config()).unwrap(), config)
    }

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_segment_upload_headers() {
        let transport = ScriptedTransport::new(vec![Ok(started()), Ok(finalized("files/f1"))]);
        let uploader = client(transport.clone(), UploadConfig::default());

        let request = UploadRequest::from_bytes("hello world", "text/plain").with_display_name("greeting");
        let file = uploader.upload(request, deadline()).await.unwrap();
        assert_eq!(file.name, "files/f1");
        assert_eq!(file.size_bytes, Some(11));

        let sent = transport.requests();
        assert_eq!(sent.len(), 2);

        let start = &sent[0];
        assert_eq!(start.url, "http://provider.test/upload/v1beta/files");
        assert!(!start.url.contains('?'));
        assert_eq!(start.header_str("x-goog-upload-protocol"), Some("resumable"));
        assert_eq!(start.header_str("x-goog-upload-command"), Some("start"));
        assert_eq!(start.header_str("x-goog-upload-header-content-length"), Some("11"));
        assert_eq!(start.header_str("x-goog-upload-header-content-type"), Some("text/plain"));
        assert_eq!(start.header_str("x-goog-api-key"), Some("test-key"));
        let body: serde_json::Value = serde_json::from_slice(&start.body).unwrap();
        assert_eq!(body, serde_json::json!({"file": {"displayName": "greeting"}}));

        let write = &sent[1];
        assert_eq!(write.url, SESSION);
        assert_eq!(write.header_str("x-goog-upload-command"), Some("upload, finalize"));
        assert_eq!(write.header_str("x-goog-upload-offset"), Some("0"));
        assert_eq!(write.header_str("content-length"), Some("11"));
        assert_eq!(&write.body[..], b"hello world");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_session_header_is_permanent() {
        let transport = ScriptedTransport::new(vec![Ok(response(200, "{}"))]);
        let uploader = client(transport.clone(), UploadConfig::default());

        let err = uploader
            .upload(UploadRequest::from_bytes("x", "text/plain"), deadline())
            .await
            .unwrap_err();
        assert!(err.is_no_upload_session());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_400_single_attempt() {
        let transport = ScriptedTransport::new(vec![Ok(response(400, "bad header"))]);
        let uploader = client(transport.clone(), UploadConfig::default());

        let err = uploader
            .upload(UploadRequest::from_bytes("x", "text/plain"), deadline())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::SessionNegotiation {
                kind: SessionFailure::Rejected,
                status: Some(400),
                attempts: 1,
                ..
            }
        ));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transfer_retry_does_not_restart_session() {
        let transport = ScriptedTransport::new(vec![
            Ok(started()),
            Ok(response(503, "busy")),
            Ok(finalized("files/f2")),
        ]);
        let uploader = client(transport.clone(), UploadConfig::default());

        let file = uploader
            .upload(UploadRequest::from_bytes("abc", "text/plain"), deadline())
            .await
            .unwrap();
        assert_eq!(file.name, "files/f2");

        let sent = transport.requests();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1].url, SESSION);
        assert_eq!(sent[2].url, SESSION);
        assert_eq!(sent[2].header_str("x-goog-upload-offset"), Some("0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_session_restarts_from_start() {
        let transport = ScriptedTransport::new(vec![
            Ok(started()),
            Ok(response(404, "no such session")),
            Ok(started()),
            Ok(finalized("files/f3")),
        ]);
        let uploader = client(transport.clone(), UploadConfig::default());

        let file = uploader
            .upload(UploadRequest::from_bytes("abc", "text/plain"), deadline())
            .await
            .unwrap();
        assert_eq!(file.name, "files/f3");

        let commands: Vec<_> = transport
            .requests()
            .iter()
            .map(|r| r.header_str("x-goog-upload-command").unwrap().to_string())
            .collect();
        assert_eq!(commands, ["start", "upload, finalize", "start", "upload, finalize"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_session_with_stream_source_fails() {
        let transport = ScriptedTransport::new(vec![Ok(started()), Ok(response(410, "gone"))]);
        let uploader = client(transport.clone(), UploadConfig::default());

        let request = UploadRequest::from_reader(std::io::Cursor::new(b"abc".to_vec()), 3, "text/plain");
        let err = uploader.upload(request, deadline()).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::Transfer {
                kind: TransferFailure::SessionExpired,
                status: Some(410),
                ..
            }
        ));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunked_segments_track_offsets() {
        let mid = with_header(response(200, ""), "x-goog-upload-size-received", "4");
        let mid2 = with_header(response(200, ""), "x-goog-upload-size-received", "8");
        let transport = ScriptedTransport::new(vec![
            Ok(started()),
            Ok(mid),
            Ok(mid2),
            Ok(finalized("files/f4")),
        ]);
        let config = UploadConfig {
            chunk_size: Some(4),
            ..UploadConfig::default()
        };
        let uploader = client(transport.clone(), config);

        uploader
            .upload(UploadRequest::from_bytes("0123456789", "text/plain"), deadline())
            .await
            .unwrap();

        let writes: Vec<_> = transport.requests().into_iter().skip(1).collect();
        let summary: Vec<_> = writes
            .iter()
            .map(|w| {
                (
                    w.header_str("x-goog-upload-offset").unwrap().to_string(),
                    w.header_str("x-goog-upload-command").unwrap().to_string(),
                    w.body.len(),
                )
            })
            .collect();
        assert_eq!(
            summary,
            [
                ("0".to_string(), "upload".to_string(), 4),
                ("4".to_string(), "upload".to_string(), 4),
                ("8".to_string(), "upload, finalize".to_string(), 2),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_granularity_rounds_chunk_size() {
        let granular = with_header(started(), "x-goog-upload-chunk-granularity", "3");
        let transport = ScriptedTransport::new(vec![
            Ok(granular),
            Ok(response(200, "")),
            Ok(finalized("files/f5")),
        ]);
        let config = UploadConfig {
            chunk_size: Some(5),
            ..UploadConfig::default()
        };
        let uploader = client(transport.clone(), config);

        uploader
            .upload(UploadRequest::from_bytes("abcdef", "text/plain"), deadline())
            .await
            .unwrap();
        let sizes: Vec<_> = transport.requests().iter().skip(1).map(|r| r.body.len()).collect();
        assert_eq!(sizes, [3, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offset_mismatch_is_transfer_error() {
        let bad_ack = with_header(response(200, ""), "x-goog-upload-size-received", "2");
        let transport = ScriptedTransport::new(vec![Ok(started()), Ok(bad_ack)]);
        let config = UploadConfig {
            chunk_size: Some(4),
            ..UploadConfig::default()
        };
        let uploader = client(transport, config);

        let err = uploader
            .upload(UploadRequest::from_bytes("01234567", "text/plain"), deadline())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::Transfer {
                kind: TransferFailure::OffsetMismatch { acknowledged: 2 },
                offset: 0,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_source_never_finalizes() {
        let transport = ScriptedTransport::new(vec![Ok(started())]);
        let uploader = client(transport.clone(), UploadConfig::default());

        let request = UploadRequest::from_reader(std::io::Cursor::new(b"abc".to_vec()), 10, "text/plain");
        let err = uploader.upload(request, deadline()).await.unwrap_err();

        assert!(matches!(
            err,
            IngestError::Transfer {
                kind: TransferFailure::LengthMismatch { declared: 10, actual: 3 },
                ..
            }
        ));
        // only the start request went out
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_source_never_finalizes() {
        let transport = ScriptedTransport::new(vec![Ok(started()), Ok(response(200, ""))]);
        let config = UploadConfig {
            chunk_size: Some(2),
            ..UploadConfig::default()
        };
        let uploader = client(transport.clone(), config);

        let request = UploadRequest::from_reader(std::io::Cursor::new(b"abcdef".to_vec()), 4, "text/plain");
        let err = uploader.upload(request, deadline()).await.unwrap_err();

        assert!(matches!(
            err,
            IngestError::Transfer {
                kind: TransferFailure::LengthMismatch { declared: 4, .. },
                offset: 2,
                ..
            }
        ));
        let sent = transport.requests();
        assert_eq!(sent.len(), 2);
        assert!(sent
            .iter()
            .all(|r| r.header_str("x-goog-upload-command") != Some("upload, finalize")));
    }

    #[tokio::test]
    async fn test_file_source_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        tokio::fs::write(&path, b"# title\n").await.unwrap();

        let transport = ScriptedTransport::new(vec![
            Ok(started()),
            Ok(response(200, r#"{"name":"files/bare"}"#)),
        ]);
        let uploader = client(transport.clone(), UploadConfig::default());

        let request = UploadRequest::from_file(&path, "text/markdown").await.unwrap();
        assert_eq!(request.content_length, 8);
        let file = uploader.upload(request, deadline()).await.unwrap();
        assert_eq!(file.name, "files/bare");
        assert_eq!(&transport.requests()[1].body[..], b"# title\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_request_sends_nothing() {
        let transport = ScriptedTransport::new(vec![]);
        let uploader = client(transport.clone(), UploadConfig::default());

        let err = uploader
            .upload(UploadRequest::from_bytes("x", "not a mime"), deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::InvalidRequest(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_guess_mime_type() {
        assert_eq!(guess_mime_type(Path::new("a/b/notes.MD")), Some("text/markdown"));
        assert_eq!(guess_mime_type(Path::new("report.pdf")), Some("application/pdf"));
        assert_eq!(guess_mime_type(Path::new("data.json")), Some("application/json"));
        assert_eq!(guess_mime_type(Path::new("archive.tar.gz")), None);
        assert_eq!(guess_mime_type(Path::new("README")), None);
    }

    #[test]
    fn test_session_debug_hides_url() {
        let session = UploadSession {
            url: SESSION.to_string(),
            offset: 3,
            finalized: false,
            granularity: None,
        };
        let printed = format!("{session:?}");
        assert!(!printed.contains("session/abc"));
        assert!(printed.contains("offset: 3"));
    }
}
