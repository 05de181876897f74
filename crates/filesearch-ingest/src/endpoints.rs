//! Provider endpoint URL builders
//!
//! `base_url` never carries a trailing slash; resource names are already
//! validated by the `filesearch_common::types` name parsers.

use filesearch_common::types::{ModelName, StoreName};

const API_VERSION: &str = "v1beta";

/// Upload session negotiation endpoint
pub fn upload_start_url(base_url: &str) -> String {
    format!("{}/upload/{}/files", base_url, API_VERSION)
}

/// Per-store import endpoint
pub fn import_file_url(base_url: &str, store: &StoreName) -> String {
    format!("{}/{}/{}:importFile", base_url, API_VERSION, store)
}

/// Any named resource: store, document, operation
pub fn resource_url(base_url: &str, name: &str) -> String {
    format!("{}/{}/{}", base_url, API_VERSION, name)
}

/// Named resource deletion, `force` also removes dependent resources
pub fn delete_url(base_url: &str, name: &str, force: bool) -> String {
    let url = resource_url(base_url, name);
    if force {
        format!("{}?force=true", url)
    } else {
        url
    }
}

pub fn stores_url(base_url: &str) -> String {
    format!("{}/{}/fileSearchStores", base_url, API_VERSION)
}

pub fn list_stores_url(base_url: &str, page_size: u32, page_token: Option<&str>) -> String {
    with_paging(stores_url(base_url), page_size, page_token)
}

pub fn list_documents_url(
    base_url: &str,
    store: &StoreName,
    page_size: u32,
    page_token: Option<&str>,
) -> String {
    let url = format!("{}/documents", resource_url(base_url, store.as_str()));
    with_paging(url, page_size, page_token)
}

/// Grounded generation for `model`
pub fn generate_content_url(base_url: &str, model: &ModelName) -> String {
    format!("{}/{}/{}:generateContent", base_url, API_VERSION, model)
}

pub fn list_models_url(base_url: &str, page_size: u32, page_token: Option<&str>) -> String {
    with_paging(format!("{}/{}/models", base_url, API_VERSION), page_size, page_token)
}

fn with_paging(url: String, page_size: u32, page_token: Option<&str>) -> String {
    let mut url = format!("{}?pageSize={}", url, page_size);
    if let Some(token) = page_token {
        url.push_str("&pageToken=");
        url.extend(url::form_urlencoded::byte_serialize(token.as_bytes()));
    }
    url
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const BASE: &str = "https://generativelanguage.googleapis.com";

    #[test]
    fn test_upload_start_url() {
        assert_eq!(
            upload_start_url(BASE),
            "https://generativelanguage.googleapis.com/upload/v1beta/files"
        );
    }

    #[test]
    fn test_import_file_url() {
        let store = StoreName::parse("abc-123").unwrap();
        assert_eq!(
            import_file_url(BASE, &store),
            "https://generativelanguage.googleapis.com/v1beta/fileSearchStores/abc-123:importFile"
        );
    }

    #[test]
    fn test_resource_and_delete_urls() {
        let op = "fileSearchStores/s/operations/o1";
        assert_eq!(
            resource_url("http://localhost:9000", op),
            "http://localhost:9000/v1beta/fileSearchStores/s/operations/o1"
        );
        assert_eq!(
            delete_url("http://localhost:9000", "fileSearchStores/s", true),
            "http://localhost:9000/v1beta/fileSearchStores/s?force=true"
        );
        assert_eq!(
            delete_url("http://localhost:9000", "fileSearchStores/s", false),
            "http://localhost:9000/v1beta/fileSearchStores/s"
        );
    }

    #[test]
    fn test_model_urls() {
        let model = ModelName::parse("gemini-2.5-flash").unwrap();
        assert_eq!(
            generate_content_url(BASE, &model),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            list_models_url("http://h", 1000, Some("p2")),
            "http://h/v1beta/models?pageSize=1000&pageToken=p2"
        );
    }

    #[test]
    fn test_paging_encodes_token() {
        assert_eq!(
            list_stores_url("http://h", 20, None),
            "http://h/v1beta/fileSearchStores?pageSize=20"
        );
        let store = StoreName::parse("s").unwrap();
        assert_eq!(
            list_documents_url("http://h", &store, 10, Some("a+b/c=")),
            "http://h/v1beta/fileSearchStores/s/documents?pageSize=10&pageToken=a%2Bb%2Fc%3D"
        );
    }
}
