//! Shared helpers for provider integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use filesearch_ingest::ClientConfig;
use std::time::Duration;
use wiremock::{Match, MockServer, Request};

pub const STORE: &str = "fileSearchStores/docs";
pub const OPERATION: &str = "fileSearchStores/docs/operations/op-1";
pub const SESSION_PATH: &str = "/upload/session/abc";

/// Client config against `server` with millisecond-scale backoff
pub fn config_for(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::new("test-key").with_base_url(server.uri());
    config.retry.initial_delay = Duration::from_millis(10);
    config.retry.max_delay = Duration::from_millis(50);
    config.poll.initial_interval = Duration::from_millis(10);
    config.poll.max_interval = Duration::from_millis(40);
    config
}

pub fn session_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), SESSION_PATH)
}

/// Exact `X-Goog-Upload-Command` match. wiremock's `header` matcher splits
/// on commas, which breaks `upload, finalize`.
pub fn upload_command(expected: &'static str) -> impl Match {
    move |request: &Request| {
        request
            .headers
            .get("x-goog-upload-command")
            .and_then(|v| v.to_str().ok())
            == Some(expected)
    }
}

pub fn file_json(name: &str) -> serde_json::Value {
    serde_json::json!({ "file": { "name": name, "mimeType": "text/plain" } })
}

pub fn operation_json(done: bool) -> serde_json::Value {
    serde_json::json!({ "name": OPERATION, "done": done })
}
