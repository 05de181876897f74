//! Shared request plumbing for every provider client
//!
//! Holds the transport, the credential header and the retry policy. Cheap
//! to clone; the upload, import, poll and store clients each keep one.

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{IngestError, Phase};
use crate::retry::{Finished, RetryPolicy};
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

pub(crate) const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-goog-api-key");

#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    api_key: HeaderValue,
    request_timeout: Duration,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, config: &ClientConfig) -> Result<Self, IngestError> {
        config.validate()?;

        let mut api_key = HeaderValue::from_str(config.api.api_key.expose())
            .map_err(|_| IngestError::config("API key contains characters not allowed in a header"))?;
        api_key.set_sensitive(true);

        Ok(Self {
            transport,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            api_key,
            request_timeout: config.api.request_timeout,
            retry: RetryPolicy::new(config.retry.clone()),
        })
    }

    /// Client over a fresh [`ReqwestTransport`]
    pub fn from_config(config: &ClientConfig) -> Result<Self, IngestError> {
        let transport = ReqwestTransport::new(config.api.request_timeout)
            .map_err(|e| IngestError::config(format!("failed to build HTTP client: {e}")))?;
        Self::new(Arc::new(transport), config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Authenticated request with the per-request timeout applied
    pub(crate) fn request(&self, method: Method, url: impl Into<String>) -> HttpRequest {
        HttpRequest::new(method, url)
            .header(API_KEY_HEADER, self.api_key.clone())
            .timeout(self.request_timeout)
    }

    /// Unauthenticated request, for session URLs that carry their own token
    pub(crate) fn bare_request(&self, method: Method, url: impl Into<String>) -> HttpRequest {
        HttpRequest::new(method, url).timeout(self.request_timeout)
    }

    pub(crate) async fn execute<F>(&self, phase: Phase, build: F) -> Result<Finished, IngestError>
    where
        F: FnMut() -> HttpRequest,
    {
        self.retry.execute(self.transport.as_ref(), phase, build).await
    }

    /// Execute and decode a JSON body; permanent rejections become
    /// [`IngestError::ApiRejected`].
    pub(crate) async fn execute_json<T, F>(&self, phase: Phase, build: F) -> Result<T, IngestError>
    where
        T: DeserializeOwned,
        F: FnMut() -> HttpRequest,
    {
        let finished = self.execute(phase, build).await?;
        let response = ensure_success(phase, finished)?;
        decode(phase, &response)
    }

    /// Execute a call whose success body carries nothing of interest
    pub(crate) async fn execute_empty<F>(&self, phase: Phase, build: F) -> Result<(), IngestError>
    where
        F: FnMut() -> HttpRequest,
    {
        let finished = self.execute(phase, build).await?;
        ensure_success(phase, finished).map(|_| ())
    }
}

fn ensure_success(phase: Phase, finished: Finished) -> Result<HttpResponse, IngestError> {
    let Finished { response, state } = finished;
    if response.is_success() {
        Ok(response)
    } else {
        Err(IngestError::ApiRejected {
            phase,
            status: response.status,
            attempts: state.attempts,
            body: response.body_snippet(),
        })
    }
}

pub(crate) fn decode<T: DeserializeOwned>(phase: Phase, response: &HttpResponse) -> Result<T, IngestError> {
    response.json().map_err(|e| IngestError::Decode {
        phase,
        message: e.to_string(),
    })
}
