//! Configuration management

use filesearch_ingest::ClientConfig;

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default upload size limit (100 MiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 100 * 1024 * 1024;

/// Default accepted file extensions.
pub const DEFAULT_ALLOWED_EXTENSIONS: &str = ".txt,.pdf,.md,.doc,.docx,.html,.csv,.json";

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadLimits,
    pub cors: CorsConfig,
    pub client: ClientConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// What the upload route accepts
#[derive(Debug, Clone, PartialEq)]
pub struct UploadLimits {
    pub max_upload_size: u64,
    /// Lowercase, each with its leading dot
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            allowed_extensions: parse_extensions(DEFAULT_ALLOWED_EXTENSIONS),
        }
    }
}

impl UploadLimits {
    pub fn allows(&self, filename: &str) -> bool {
        let Some(ext) = std::path::Path::new(filename).extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = format!(".{}", ext.to_ascii_lowercase());
        self.allowed_extensions.iter().any(|allowed| *allowed == ext)
    }
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let client = ClientConfig::from_env()?;

        let config = Config {
            server: ServerConfig {
                host: lookup("APP_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
                port: lookup("APP_PORT")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: lookup("APP_SHUTDOWN_TIMEOUT")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            upload: UploadLimits {
                max_upload_size: lookup("MAX_UPLOAD_SIZE")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE),
                allowed_extensions: parse_extensions(
                    &lookup("ALLOWED_EXTENSIONS")
                        .unwrap_or_else(|| DEFAULT_ALLOWED_EXTENSIONS.to_string()),
                ),
            },
            cors: CorsConfig {
                allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: lookup("CORS_ALLOW_CREDENTIALS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(false),
            },
            client,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.upload.max_upload_size == 0 {
            anyhow::bail!("MAX_UPLOAD_SIZE must be greater than 0");
        }

        if self.upload.allowed_extensions.is_empty() {
            anyhow::bail!("ALLOWED_EXTENSIONS must name at least one extension");
        }

        if self.cors.allow_credentials && self.cors.allowed_origins.iter().any(|o| o == "*") {
            anyhow::bail!("CORS credentials cannot be combined with a wildcard origin");
        }

        self.client.validate()?;

        Ok(())
    }
}

/// `".txt, PDF,md"` → `[".txt", ".pdf", ".md"]`
fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .map(|s| format!(".{s}"))
        .collect()
}
