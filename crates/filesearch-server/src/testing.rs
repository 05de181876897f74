//! Route test helpers

use axum::body::Body;
use axum::http::Request;
use filesearch_ingest::ClientConfig;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, CorsConfig, ServerConfig, UploadLimits};
use crate::features::AppState;

pub const BOUNDARY: &str = "filesearch-test-boundary";

pub fn test_config(base_url: &str, upload: UploadLimits) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
            shutdown_timeout_secs: 1,
        },
        upload,
        cors: CorsConfig {
            allowed_origins: vec!["*".to_string()],
            allow_credentials: false,
        },
        client: ClientConfig::new("test-key").with_base_url(base_url),
    }
}

pub fn test_state(base_url: &str, upload: UploadLimits) -> AppState {
    AppState::new(&test_config(base_url, upload), CancellationToken::new())
        .expect("test state")
}

pub enum MultipartPart<'a> {
    Text {
        name: &'a str,
        value: &'a str,
    },
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

impl<'a> MultipartPart<'a> {
    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self::Text { name, value }
    }

    pub fn file(name: &'a str, filename: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self::File {
            name,
            filename,
            content_type,
            data,
        }
    }
}

pub fn multipart_request(uri: &str, parts: &[MultipartPart<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            MultipartPart::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            MultipartPart::File {
                name,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("content-length", body.len())
        .body(Body::from(body))
        .expect("multipart request")
}
