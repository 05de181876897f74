//! Grounded search over File Search stores
//!
//! A search is one `generateContent` call with the `file_search` tool
//! pointed at the given stores. Ranking and retrieval stay with the
//! provider; this side only shapes the request and reads back the answer
//! and its grounding. Calls retry under [`Phase::Search`].

use filesearch_common::types::{
    GenerateContentResponse, ModelList, ModelName, ModelSummary, SearchAnswer, StoreName,
    DEFAULT_SEARCH_MODEL,
};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::endpoints;
use crate::error::{IngestError, Phase};

/// Provider cap on `pageSize` for model listings
const MODEL_PAGE_SIZE: u32 = 1000;

/// Listings stop after this many pages even if the provider keeps paging
const MAX_MODEL_PAGES: usize = 20;

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub stores: Vec<StoreName>,
    pub model: ModelName,
    /// Provider filter expression over custom metadata, e.g. `author = "kim"`
    pub metadata_filter: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, stores: Vec<StoreName>) -> Result<Self, IngestError> {
        Ok(Self {
            query: query.into(),
            stores,
            model: ModelName::parse(DEFAULT_SEARCH_MODEL)?,
            metadata_filter: None,
        })
    }

    pub fn with_model(mut self, model: ModelName) -> Self {
        self.model = model;
        self
    }

    pub fn with_metadata_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into();
        self.metadata_filter = (!filter.trim().is_empty()).then_some(filter);
        self
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.query.trim().is_empty() {
            return Err(IngestError::invalid("search query is empty"));
        }
        if self.stores.is_empty() {
            return Err(IngestError::invalid("search needs at least one store"));
        }
        Ok(())
    }

    fn body(&self) -> Value {
        let mut file_search = json!({ "file_search_store_names": self.stores });
        if let Some(filter) = &self.metadata_filter {
            file_search["metadata_filter"] = json!(filter);
        }
        json!({
            "contents": [{ "parts": [{ "text": self.query }] }],
            "tools": [{ "file_search": file_search }],
        })
    }
}

#[derive(Debug, Clone)]
pub struct SearchClient {
    api: ApiClient,
}

impl SearchClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Ask `request.model` the query, grounded on the request's stores.
    #[tracing::instrument(
        skip(self, request),
        fields(model = %request.model, stores = request.stores.len())
    )]
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchAnswer, IngestError> {
        request.validate()?;

        let url = endpoints::generate_content_url(self.api.base_url(), &request.model);
        // generation runs longer than resource lookups
        let prepared = self
            .api
            .request(Method::POST, url)
            .timeout(self.api.request_timeout() * 2)
            .json(&request.body())
            .map_err(|e| IngestError::invalid(format!("cannot encode search body: {e}")))?;

        let response: GenerateContentResponse = self
            .api
            .execute_json(Phase::Search, || prepared.clone())
            .await?;

        if let Some(error) = &response.error {
            return Err(IngestError::UnexpectedStatus {
                phase: Phase::Search,
                status: u16::try_from(error.code).ok().filter(|c| *c >= 400).unwrap_or(500),
                body: error.message.clone(),
            });
        }
        if let Some(reason) = response.block_reason() {
            warn!(reason, "Search prompt blocked");
            return Err(IngestError::SearchBlocked {
                reason: reason.to_string(),
            });
        }
        if response.candidates.is_empty() {
            debug!("Search returned no candidates");
        }

        let answer = response.answer();
        info!(
            answer_chars = answer.answer.chars().count(),
            sources = answer.sources.len(),
            "Search completed"
        );
        Ok(answer)
    }

    /// Models that can serve a search, i.e. support `generateContent`.
    pub async fn list_models(&self) -> Result<Vec<ModelSummary>, IngestError> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_MODEL_PAGES {
            let url = endpoints::list_models_url(
                self.api.base_url(),
                MODEL_PAGE_SIZE,
                page_token.as_deref(),
            );
            let page: ModelList = self
                .api
                .execute_json(Phase::Search, || self.api.request(Method::GET, url.clone()))
                .await?;

            models.extend(
                page.models
                    .iter()
                    .filter(|m| m.supports_generate_content())
                    .map(|m| m.summary()),
            );

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(count = models.len(), "Listed models supporting generateContent");
        Ok(models)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::testing::{response, test_config, ScriptedTransport};
    use std::sync::Arc;

    fn client(transport: Arc<ScriptedTransport>) -> SearchClient {
        SearchClient::new(ApiClient::new(transport, &test_config()).unwrap())
    }

    fn request() -> SearchRequest {
        SearchRequest::new(
            "what torque?",
            vec![StoreName::parse("manuals").unwrap(), StoreName::parse("errata").unwrap()],
        )
        .unwrap()
    }

    const ANSWER: &str = r#"{"candidates":[{"content":{"parts":[{"text":"12 Nm"}]},
        "groundingMetadata":{"groundingChunks":[{"retrievedContext":{"uri":"manual.pdf"}}]}}]}"#;

    #[tokio::test(start_paused = true)]
    async fn test_search_request_shape() {
        let transport = ScriptedTransport::new(vec![Ok(response(200, ANSWER))]);
        let search = client(transport.clone());

        let answer = search
            .search(&request().with_metadata_filter("year > 2020"))
            .await
            .unwrap();
        assert_eq!(answer.answer, "12 Nm");
        assert_eq!(answer.sources, ["manual.pdf"]);

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::POST);
        assert_eq!(
            sent.url,
            "http://provider.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(sent.header_str("x-goog-api-key"), Some("test-key"));
        assert!(sent.timeout.unwrap() > test_config().api.request_timeout);

        let body: Value = serde_json::from_slice(&sent.body).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "what torque?");
        assert_eq!(
            body["tools"][0]["file_search"],
            json!({
                "file_search_store_names": ["fileSearchStores/manuals", "fileSearchStores/errata"],
                "metadata_filter": "year > 2020",
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_retries_unavailable() {
        let transport = ScriptedTransport::new(vec![
            Ok(response(503, "busy")),
            Ok(response(429, "slow down")),
            Ok(response(200, ANSWER)),
        ]);
        let answer = client(transport.clone()).search(&request()).await.unwrap();
        assert_eq!(answer.answer, "12 Nm");
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_rejected_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Ok(response(400, "bad filter"))]);
        let err = client(transport.clone()).search(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            IngestError::ApiRejected { phase: Phase::Search, status: 400, .. }
        ));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_prompt() {
        let transport = ScriptedTransport::new(vec![Ok(response(
            200,
            r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#,
        ))]);
        let err = client(transport).search(&request()).await.unwrap_err();
        assert!(matches!(err, IngestError::SearchBlocked { ref reason } if reason == "SAFETY"));
        assert_eq!(err.phase(), Some(Phase::Search));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_inside_success_body() {
        let transport = ScriptedTransport::new(vec![Ok(response(
            200,
            r#"{"error":{"code":429,"message":"quota exceeded"}}"#,
        ))]);
        let err = client(transport).search(&request()).await.unwrap_err();
        assert_eq!(err.last_status(), Some(429));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_search_sends_nothing() {
        let transport = ScriptedTransport::new(vec![]);
        let search = client(transport.clone());

        let empty_query = SearchRequest::new("  ", vec![StoreName::parse("s").unwrap()]).unwrap();
        assert!(matches!(
            search.search(&empty_query).await,
            Err(IngestError::InvalidRequest(_))
        ));
        let no_stores = SearchRequest::new("q", Vec::new()).unwrap();
        assert!(matches!(
            search.search(&no_stores).await,
            Err(IngestError::InvalidRequest(_))
        ));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_models_filters_and_pages() {
        let transport = ScriptedTransport::new(vec![
            Ok(response(
                200,
                r#"{"models":[
                    {"name":"models/gemini-2.5-flash","supportedGenerationMethods":["generateContent"]},
                    {"name":"models/embedding-001","supportedGenerationMethods":["embedContent"]}
                ],"nextPageToken":"p2"}"#,
            )),
            Ok(response(
                200,
                r#"{"models":[{"name":"models/gemini-2.5-pro","displayName":"Pro",
                    "supportedGenerationMethods":["countTokens","generateContent"]}]}"#,
            )),
        ]);
        let models = client(transport.clone()).list_models().await.unwrap();

        let names: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["gemini-2.5-flash", "gemini-2.5-pro"]);
        assert_eq!(models[1].display_name, "Pro");

        let urls: Vec<_> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            [
                "http://provider.test/v1beta/models?pageSize=1000",
                "http://provider.test/v1beta/models?pageSize=1000&pageToken=p2",
            ]
        );
    }

    #[test]
    fn test_blank_metadata_filter_is_dropped() {
        let request = request().with_metadata_filter("   ");
        assert!(request.metadata_filter.is_none());
        assert!(request.body()["tools"][0]["file_search"]
            .get("metadata_filter")
            .is_none());
    }
}
