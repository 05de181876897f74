//! Client configuration
//!
//! Built once (from the environment or in code) and handed to each client
//! by value. Request logic never reads the environment.

use crate::error::IngestError;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 10_000;
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_JITTER: f64 = 0.2;

pub const DEFAULT_POLL_INITIAL_MS: u64 = 1_000;
pub const DEFAULT_POLL_MAX_MS: u64 = 15_000;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 4;
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_MAX_SESSION_RESTARTS: u32 = 2;

/// API credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Scheme and host, without a trailing slash
    pub base_url: String,
    pub api_key: ApiKey,
    /// Deadline applied to each individual request
    pub request_timeout: Duration,
}

/// Per-request retry budget and backoff shape
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Upper bound of the random extra delay, as a fraction of the base delay
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_RETRY_DELAY_MS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter: DEFAULT_JITTER,
        }
    }
}

/// Interval schedule for status polling
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    pub jitter: f64,
    /// Used when the caller does not pass a wait timeout
    pub default_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(DEFAULT_POLL_INITIAL_MS),
            max_interval: Duration::from_millis(DEFAULT_POLL_MAX_MS),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter: DEFAULT_JITTER,
            default_timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfig {
    /// Segment size for the transfer phase. `None` sends the whole payload
    /// as one finalize segment.
    pub chunk_size: Option<u64>,
    pub max_concurrent_uploads: usize,
    /// Deadline for one upload, both phases included
    pub upload_timeout: Duration,
    /// How many times a rejected session URL may send the upload back to
    /// session negotiation
    pub max_session_restarts: u32,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: None,
            max_concurrent_uploads: DEFAULT_MAX_CONCURRENT_UPLOADS,
            upload_timeout: Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS),
            max_session_restarts: DEFAULT_MAX_SESSION_RESTARTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub retry: RetryConfig,
    pub poll: PollConfig,
    pub upload: UploadConfig,
}

impl ClientConfig {
    /// Defaults against the public endpoint
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_API_BASE_URL.to_string(),
                api_key: ApiKey::new(api_key),
                request_timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            },
            retry: RetryConfig::default(),
            poll: PollConfig::default(),
            upload: UploadConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Load from `.env` and the process environment, then validate.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `GOOGLE_API_KEY` | required |
    /// | `FILESEARCH_API_BASE_URL` | public endpoint |
    /// | `FILESEARCH_API_TIMEOUT_SECS` | 60 |
    /// | `FILESEARCH_API_MAX_RETRIES` | 3 (total attempts) |
    /// | `FILESEARCH_API_RETRY_DELAY_MS` | 1000 |
    /// | `FILESEARCH_API_MAX_RETRY_DELAY_MS` | 10000 |
    /// | `FILESEARCH_POLL_TIMEOUT_SECS` | 300 |
    /// | `FILESEARCH_UPLOAD_CHUNK_SIZE` | unset (single segment) |
    /// | `FILESEARCH_MAX_CONCURRENT_UPLOADS` | 4 |
    /// | `FILESEARCH_UPLOAD_TIMEOUT_SECS` | 600 |
    pub fn from_env() -> Result<Self, IngestError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`ClientConfig::from_env`], with explicit values (command-line
    /// flags) taking precedence over the environment.
    pub fn from_env_with(
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, IngestError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| match key {
            "GOOGLE_API_KEY" if api_key.is_some() => api_key.clone(),
            "FILESEARCH_API_BASE_URL" if base_url.is_some() => base_url.clone(),
            _ => std::env::var(key).ok(),
        })
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, IngestError> {
        let api_key = lookup("GOOGLE_API_KEY")
            .ok_or_else(|| IngestError::config("GOOGLE_API_KEY is not set"))?;
        let mut config = Self::new(api_key);

        if let Some(url) = lookup("FILESEARCH_API_BASE_URL") {
            config = config.with_base_url(url);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "FILESEARCH_API_TIMEOUT_SECS")? {
            config.api.request_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_var(&lookup, "FILESEARCH_API_MAX_RETRIES")? {
            config.retry.max_attempts = attempts;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "FILESEARCH_API_RETRY_DELAY_MS")? {
            config.retry.initial_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "FILESEARCH_API_MAX_RETRY_DELAY_MS")? {
            config.retry.max_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "FILESEARCH_POLL_TIMEOUT_SECS")? {
            config.poll.default_timeout = Duration::from_secs(secs);
        }
        if let Some(size) = parse_var(&lookup, "FILESEARCH_UPLOAD_CHUNK_SIZE")? {
            config.upload.chunk_size = Some(size);
        }
        if let Some(n) = parse_var(&lookup, "FILESEARCH_MAX_CONCURRENT_UPLOADS")? {
            config.upload.max_concurrent_uploads = n;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "FILESEARCH_UPLOAD_TIMEOUT_SECS")? {
            config.upload.upload_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), IngestError> {
        if self.api.api_key.is_empty() {
            return Err(IngestError::config("API key must not be empty"));
        }

        let url = url::Url::parse(&self.api.base_url).map_err(|e| {
            IngestError::config(format!("invalid base URL '{}': {}", self.api.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(IngestError::config(format!(
                "base URL must be http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.api.request_timeout.is_zero() {
            return Err(IngestError::config("request timeout must be positive"));
        }

        let retry = &self.retry;
        if retry.max_attempts == 0 {
            return Err(IngestError::config("max attempts must be at least 1"));
        }
        check_backoff("retry", retry.initial_delay, retry.max_delay, retry.multiplier, retry.jitter)?;

        let poll = &self.poll;
        check_backoff("poll", poll.initial_interval, poll.max_interval, poll.multiplier, poll.jitter)?;
        if poll.initial_interval.is_zero() {
            return Err(IngestError::config("poll interval must be positive"));
        }

        if self.upload.max_concurrent_uploads == 0 {
            return Err(IngestError::config("max concurrent uploads must be at least 1"));
        }
        if self.upload.chunk_size == Some(0) {
            return Err(IngestError::config("upload chunk size must be positive"));
        }
        if self.upload.upload_timeout.is_zero() {
            return Err(IngestError::config("upload timeout must be positive"));
        }

        Ok(())
    }
}

fn check_backoff(
    what: &str,
    initial: Duration,
    max: Duration,
    multiplier: f64,
    jitter: f64,
) -> Result<(), IngestError> {
    if initial > max {
        return Err(IngestError::config(format!(
            "{what}: initial delay {initial:?} exceeds maximum {max:?}"
        )));
    }
    if !multiplier.is_finite() || multiplier < 1.0 {
        return Err(IngestError::config(format!(
            "{what}: multiplier must be a finite number >= 1.0"
        )));
    }
    if !(0.0..=1.0).contains(&jitter) {
        return Err(IngestError::config(format!("{what}: jitter must be within 0.0..=1.0")));
    }
    Ok(())
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, IngestError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| IngestError::config(format!("{key}: cannot parse '{raw}'"))),
    }
}
