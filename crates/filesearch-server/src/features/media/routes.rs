use crate::api::response::ApiResponse;
use crate::config::UploadLimits;
use crate::error::{AppError, AppResult};
use crate::features::AppState;
use crate::middleware::body_limit_layer;
use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::Response,
    routing::post,
    Json, Router,
};
use filesearch_common::types::{ChunkingConfig, CustomMetadata, FileName, StoreName};
use filesearch_ingest::upload::guess_mime_type;
use filesearch_ingest::{ImportOptions, UploadRequest};
use serde::Deserialize;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

/// Content type browsers send when they know nothing better.
const GENERIC_CONTENT_TYPE: &str = "application/octet-stream";

pub fn media_routes(limits: &UploadLimits) -> Router<AppState> {
    // the spool enforces the exact limit; the layer only stops runaway bodies
    let upload = Router::new()
        .route("/:store_id/upload", post(upload_document))
        .layer(DefaultBodyLimit::disable())
        .layer(body_limit_layer(limits));

    Router::new()
        .route("/:store_id/import", post(import_file))
        .merge(upload)
}

/// Upload spooled to disk; the file is removed when this is dropped.
struct SpooledFile {
    temp: NamedTempFile,
    filename: String,
    content_type: Option<String>,
    size: u64,
}

#[derive(Default)]
struct UploadForm {
    file: Option<SpooledFile>,
    display_name: Option<String>,
    mime_type: Option<String>,
    max_tokens_per_chunk: Option<u32>,
    max_overlap_tokens: Option<u32>,
}

#[tracing::instrument(skip(state, multipart), fields(store = %store_id))]
async fn upload_document(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let store = StoreName::parse(&store_id)?;

    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => form.file = Some(spool(field, &state.limits).await?),
            "display_name" => form.display_name = non_empty(field.text().await?),
            "mime_type" => form.mime_type = non_empty(field.text().await?),
            "max_tokens_per_chunk" => {
                form.max_tokens_per_chunk = Some(parse_number(&name, &field.text().await?)?)
            }
            "max_overlap_tokens" => {
                form.max_overlap_tokens = Some(parse_number(&name, &field.text().await?)?)
            }
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    let spooled = form
        .file
        .ok_or_else(|| AppError::Validation("Multipart body has no 'file' field".to_string()))?;
    if spooled.size == 0 {
        return Err(AppError::Validation(format!("{} is empty", spooled.filename)));
    }

    let mime_type = form
        .mime_type
        .or_else(|| {
            spooled
                .content_type
                .clone()
                .filter(|ct| ct != GENERIC_CONTENT_TYPE)
        })
        .or_else(|| guess_mime_type(std::path::Path::new(&spooled.filename)).map(str::to_string))
        .ok_or_else(|| {
            AppError::Validation(format!("Cannot determine MIME type of {}", spooled.filename))
        })?;

    let defaults = ChunkingConfig::default();
    let options = ImportOptions::with_chunking(ChunkingConfig::new(
        form.max_tokens_per_chunk.unwrap_or(defaults.max_tokens_per_chunk),
        form.max_overlap_tokens.unwrap_or(defaults.max_overlap_tokens),
    ));

    let request = UploadRequest::from_file(spooled.temp.path(), mime_type)
        .await?
        .with_display_name(form.display_name.unwrap_or_else(|| spooled.filename.clone()));

    let cancel = state.shutdown.child_token();
    let operation = state
        .orchestrator
        .ingest(&store, request, &options, &cancel)
        .await?;

    tracing::info!(
        operation = %operation.name,
        filename = %spooled.filename,
        size = spooled.size,
        "Upload accepted for indexing"
    );

    Ok(ApiResponse::success(operation).with_status(StatusCode::ACCEPTED))
}

/// Streams one multipart field into a temp file, enforcing the upload
/// limits as bytes arrive.
async fn spool(mut field: Field<'_>, limits: &UploadLimits) -> AppResult<SpooledFile> {
    let filename = field
        .file_name()
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("'file' field has no filename".to_string()))?;
    if !limits.allows(&filename) {
        return Err(AppError::Validation(format!(
            "File type of {filename} is not allowed; accepted: {}",
            limits.allowed_extensions.join(", ")
        )));
    }
    let content_type = field.content_type().map(str::to_string);

    let temp = tempfile::Builder::new().prefix("filesearch-upload-").tempfile()?;
    let mut out = tokio::fs::File::from_std(temp.as_file().try_clone()?);

    let mut size: u64 = 0;
    while let Some(chunk) = field.chunk().await? {
        size += chunk.len() as u64;
        if size > limits.max_upload_size {
            return Err(AppError::PayloadTooLarge {
                limit: limits.max_upload_size,
            });
        }
        out.write_all(&chunk).await?;
    }
    out.flush().await?;

    Ok(SpooledFile {
        temp,
        filename,
        content_type,
        size,
    })
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_number(field: &str, value: &str) -> AppResult<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("{field} must be a non-negative integer, got '{value}'")))
}

#[derive(Debug, Deserialize)]
pub struct ImportFileRequest {
    pub file_name: String,
    pub max_tokens_per_chunk: Option<u32>,
    pub max_overlap_tokens: Option<u32>,
    #[serde(default)]
    pub custom_metadata: Vec<CustomMetadata>,
}

impl ImportFileRequest {
    fn options(&self) -> ImportOptions {
        let chunking = match (self.max_tokens_per_chunk, self.max_overlap_tokens) {
            (None, None) => None,
            (tokens, overlap) => {
                let defaults = ChunkingConfig::default();
                Some(ChunkingConfig::new(
                    tokens.unwrap_or(defaults.max_tokens_per_chunk),
                    overlap.unwrap_or(defaults.max_overlap_tokens),
                ))
            }
        };
        ImportOptions {
            chunking,
            custom_metadata: self.custom_metadata.clone(),
        }
    }
}

#[tracing::instrument(skip(state, body), fields(store = %store_id, file = %body.file_name))]
async fn import_file(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    Json(body): Json<ImportFileRequest>,
) -> AppResult<Response> {
    let store = StoreName::parse(&store_id)?;
    let file_name = FileName::parse(&body.file_name)?;
    let options = body.options();

    let operation = tokio::select! {
        _ = state.shutdown.cancelled() => return Err(filesearch_ingest::IngestError::Cancelled.into()),
        imported = state.orchestrator.importer().import_file_name(&store, &file_name, &options) => imported?,
    };

    Ok(ApiResponse::success(operation).with_status(StatusCode::ACCEPTED))
}
