//! Store, document and operation lookups
//!
//! Thin CRUD over the provider's resource endpoints. Every call goes through
//! the shared retry policy under [`Phase::Store`].

use filesearch_common::types::{
    Document, DocumentList, DocumentName, Operation, OperationName, Store, StoreList, StoreName,
};
use reqwest::Method;
use serde_json::json;
use tracing::info;

use crate::client::ApiClient;
use crate::endpoints;
use crate::error::{IngestError, Phase};

/// Provider cap on `pageSize` for store and document listings
pub const MAX_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone)]
pub struct StoreClient {
    api: ApiClient,
}

impl StoreClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn create_store(&self, display_name: Option<&str>) -> Result<Store, IngestError> {
        let body = match display_name {
            Some(name) => json!({ "displayName": name }),
            None => json!({}),
        };
        let request = self
            .api
            .request(Method::POST, endpoints::stores_url(self.api.base_url()))
            .json(&body)
            .map_err(|e| IngestError::invalid(format!("cannot encode store body: {e}")))?;

        let store: Store = self.api.execute_json(Phase::Store, || request.clone()).await?;
        info!(store = %store.name, "Store created");
        Ok(store)
    }

    pub async fn list_stores(
        &self,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<StoreList, IngestError> {
        let url = endpoints::list_stores_url(self.api.base_url(), clamp_page(page_size), page_token);
        self.get(url).await
    }

    pub async fn get_store(&self, store: &StoreName) -> Result<Store, IngestError> {
        self.get(endpoints::resource_url(self.api.base_url(), store.as_str()))
            .await
    }

    /// `force` also deletes the store's documents.
    pub async fn delete_store(&self, store: &StoreName, force: bool) -> Result<(), IngestError> {
        self.delete(store.as_str(), force).await?;
        info!(store = %store, force, "Store deleted");
        Ok(())
    }

    pub async fn list_documents(
        &self,
        store: &StoreName,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<DocumentList, IngestError> {
        let url = endpoints::list_documents_url(
            self.api.base_url(),
            store,
            clamp_page(page_size),
            page_token,
        );
        self.get(url).await
    }

    pub async fn get_document(&self, document: &DocumentName) -> Result<Document, IngestError> {
        self.get(endpoints::resource_url(self.api.base_url(), document.as_str()))
            .await
    }

    pub async fn delete_document(&self, document: &DocumentName, force: bool) -> Result<(), IngestError> {
        self.delete(document.as_str(), force).await?;
        info!(document = %document, force, "Document deleted");
        Ok(())
    }

    pub async fn get_operation(&self, operation: &OperationName) -> Result<Operation, IngestError> {
        self.get(endpoints::resource_url(self.api.base_url(), operation.as_str()))
            .await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, IngestError> {
        self.api
            .execute_json(Phase::Store, || self.api.request(Method::GET, url.clone()))
            .await
    }

    async fn delete(&self, name: &str, force: bool) -> Result<(), IngestError> {
        let url = endpoints::delete_url(self.api.base_url(), name, force);
        self.api
            .execute_empty(Phase::Store, || self.api.request(Method::DELETE, url.clone()))
            .await
    }
}

fn clamp_page(page_size: u32) -> u32 {
    page_size.clamp(1, MAX_PAGE_SIZE)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::testing::{response, test_config, ScriptedTransport};
    use filesearch_common::types::DocumentState;
    use std::sync::Arc;

    fn client(transport: Arc<ScriptedTransport>) -> StoreClient {
        StoreClient::new(ApiClient::new(transport, &test_config()).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_store_body() {
        let transport = ScriptedTransport::new(vec![Ok(response(
            200,
            r#"{"name":"fileSearchStores/new-store","displayName":"Manuals"}"#,
        ))]);
        let stores = client(transport.clone());

        let store = stores.create_store(Some("Manuals")).await.unwrap();
        assert_eq!(store.name, "fileSearchStores/new-store");

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.url, "http://provider.test/v1beta/fileSearchStores");
        let body: serde_json::Value = serde_json::from_slice(&sent.body).unwrap();
        assert_eq!(body, json!({"displayName": "Manuals"}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_clamps_page_size() {
        let transport = ScriptedTransport::new(vec![
            Ok(response(200, r#"{"fileSearchStores":[{"name":"fileSearchStores/a"}],"nextPageToken":"t/2"}"#)),
            Ok(response(200, "{}")),
        ]);
        let stores = client(transport.clone());

        let page = stores.list_stores(100, None).await.unwrap();
        assert_eq!(page.file_search_stores.len(), 1);
        assert_eq!(page.next_page_token.as_deref(), Some("t/2"));

        let empty = stores
            .list_documents(&StoreName::parse("a").unwrap(), 5, Some("t/2"))
            .await
            .unwrap();
        assert!(empty.documents.is_empty());

        let urls: Vec<_> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            [
                "http://provider.test/v1beta/fileSearchStores?pageSize=20",
                "http://provider.test/v1beta/fileSearchStores/a/documents?pageSize=5&pageToken=t%2F2",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_and_delete_document() {
        let transport = ScriptedTransport::new(vec![
            Ok(response(
                200,
                r#"{"name":"fileSearchStores/a/documents/d","state":"STATE_ACTIVE","sizeBytes":"42"}"#,
            )),
            Ok(response(200, "{}")),
        ]);
        let stores = client(transport.clone());
        let name = DocumentName::parse("fileSearchStores/a/documents/d").unwrap();

        let doc = stores.get_document(&name).await.unwrap();
        assert_eq!(doc.state, DocumentState::StateActive);
        assert_eq!(doc.size_bytes, 42);

        stores.delete_document(&name, true).await.unwrap();
        let sent = &transport.requests()[1];
        assert_eq!(sent.method, Method::DELETE);
        assert_eq!(sent.url, "http://provider.test/v1beta/fileSearchStores/a/documents/d?force=true");
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_rejected_once() {
        let transport = ScriptedTransport::new(vec![Ok(response(404, "missing"))]);
        let stores = client(transport.clone());

        let err = stores
            .get_store(&StoreName::parse("gone").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IngestError::ApiRejected { phase: Phase::Store, status: 404, attempts: 1, .. }
        ));
        assert_eq!(transport.request_count(), 1);
    }
}
