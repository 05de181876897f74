//! Scripted transport for unit tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderName, HeaderValue};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::config::ClientConfig;
use crate::transport::{
    HttpRequest, HttpResponse, Transport, TransportError, TransportErrorKind,
};

type Scripted = Result<HttpResponse, TransportError>;

/// Replays canned results in order and records every request it sees.
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Option<Scripted>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Answers every request with `result`
    pub(crate) fn repeating(result: Scripted) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(result),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        let next = self.script.lock().unwrap().pop_front();
        match (next, &self.fallback) {
            (Some(result), _) => result,
            (None, Some(result)) => result.clone(),
            (None, None) => panic!("scripted transport ran out of responses"),
        }
    }
}

pub(crate) fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: Default::default(),
        body: Bytes::copy_from_slice(body.as_bytes()),
    }
}

pub(crate) fn with_header(mut response: HttpResponse, name: &'static str, value: &str) -> HttpResponse {
    response.headers.insert(
        HeaderName::from_static(name),
        HeaderValue::from_str(value).unwrap(),
    );
    response
}

pub(crate) fn connect_error() -> TransportError {
    TransportError::new(TransportErrorKind::Connect, "connection refused")
}

/// Fast retries, base URL pointing nowhere
pub(crate) fn test_config() -> ClientConfig {
    let mut config = ClientConfig::new("test-key").with_base_url("http://provider.test");
    config.retry.initial_delay = std::time::Duration::from_millis(10);
    config.retry.max_delay = std::time::Duration::from_millis(100);
    config
}
