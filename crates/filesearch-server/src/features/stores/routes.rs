use crate::api::response::ApiResponse;
use crate::error::AppResult;
use crate::features::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use filesearch_common::types::StoreName;
use filesearch_ingest::stores::MAX_PAGE_SIZE;
use serde::Deserialize;
use serde_json::json;

pub fn stores_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_stores).post(create_store))
        .route("/:store_id", get(get_store).delete(delete_store))
        .route("/:store_id/documents", get(list_documents))
        .route(
            "/:store_id/documents/:document_id",
            get(get_document).delete(delete_document),
        )
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
}

impl PageQuery {
    fn size(&self) -> u32 {
        self.page_size.unwrap_or(MAX_PAGE_SIZE)
    }

    fn token(&self) -> Option<&str> {
        self.page_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateStoreRequest {
    pub display_name: Option<String>,
}

async fn list_stores(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> AppResult<Response> {
    let stores = state.stores.list_stores(page.size(), page.token()).await?;
    Ok(ApiResponse::success(stores).into_response())
}

#[tracing::instrument(skip(state, body))]
async fn create_store(
    State(state): State<AppState>,
    body: Option<Json<CreateStoreRequest>>,
) -> AppResult<Response> {
    let display_name = body.and_then(|Json(b)| b.display_name);
    let store = state.stores.create_store(display_name.as_deref()).await?;
    Ok(ApiResponse::success(store).with_status(StatusCode::CREATED))
}

async fn get_store(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> AppResult<Response> {
    let store = state.stores.get_store(&StoreName::parse(&store_id)?).await?;
    Ok(ApiResponse::success(store).into_response())
}

#[tracing::instrument(skip(state, query), fields(store = %store_id, force = query.force))]
async fn delete_store(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<Response> {
    let store = StoreName::parse(&store_id)?;
    state.stores.delete_store(&store, query.force).await?;
    Ok(ApiResponse::success(json!({ "deleted": store })).into_response())
}

async fn list_documents(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> AppResult<Response> {
    let store = StoreName::parse(&store_id)?;
    let documents = state
        .stores
        .list_documents(&store, page.size(), page.token())
        .await?;
    Ok(ApiResponse::success(documents).into_response())
}

async fn get_document(
    State(state): State<AppState>,
    Path((store_id, document_id)): Path<(String, String)>,
) -> AppResult<Response> {
    let document = StoreName::parse(&store_id)?.document(&document_id)?;
    let document = state.stores.get_document(&document).await?;
    Ok(ApiResponse::success(document).into_response())
}

#[tracing::instrument(skip(state, query), fields(store = %store_id, document = %document_id))]
async fn delete_document(
    State(state): State<AppState>,
    Path((store_id, document_id)): Path<(String, String)>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<Response> {
    let document = StoreName::parse(&store_id)?.document(&document_id)?;
    state.stores.delete_document(&document, query.force).await?;
    Ok(ApiResponse::success(json!({ "deleted": document })).into_response())
}
