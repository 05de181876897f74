use crate::api::response::ApiResponse;
use crate::error::AppResult;
use crate::features::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use filesearch_common::types::{ModelName, StoreName, DEFAULT_SEARCH_MODEL};
use filesearch_ingest::{IngestError, SearchRequest};
use serde::Deserialize;

pub fn search_routes() -> Router<AppState> {
    Router::new()
        .route("/search", post(search))
        .route("/models", get(list_models))
}

/// Accepts the browser client's camelCase keys as well.
#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub query: String,
    #[serde(alias = "storeIds")]
    pub store_ids: Vec<String>,
    #[serde(default, alias = "metadataFilter")]
    pub metadata_filter: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl SearchBody {
    fn into_request(self) -> AppResult<SearchRequest> {
        let stores = self
            .store_ids
            .iter()
            .map(|id| StoreName::parse(id))
            .collect::<Result<Vec<_>, _>>()?;
        let model = ModelName::parse(self.model.as_deref().unwrap_or(DEFAULT_SEARCH_MODEL))?;

        let mut request = SearchRequest::new(self.query, stores)?.with_model(model);
        if let Some(filter) = self.metadata_filter {
            request = request.with_metadata_filter(filter);
        }
        Ok(request)
    }
}

#[tracing::instrument(skip(state, body), fields(stores = body.store_ids.len()))]
async fn search(State(state): State<AppState>, Json(body): Json<SearchBody>) -> AppResult<Response> {
    let request = body.into_request()?;

    let answer = tokio::select! {
        _ = state.shutdown.cancelled() => return Err(IngestError::Cancelled.into()),
        answer = state.search.search(&request) => answer?,
    };
    Ok(ApiResponse::success(answer).into_response())
}

async fn list_models(State(state): State<AppState>) -> AppResult<Response> {
    let models = state.search.list_models().await?;
    Ok(ApiResponse::success(models).into_response())
}
