//! # platingctl
//!
//! Client library and CLI for a running Plating server. Image files are
//! read from disk, base64-encoded and sent to the JSON scoring routes.

use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use plating_core::{
    BatchResponse, DEFAULT_IMAGE_FORMAT,
    api::{HealthResponse, ScoreRequest, ScoreResponse, ServiceInfo, routes},
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

/// Server address used when none is given.
pub const DEFAULT_URL: &str = "http://localhost:8000";

/// Errors raised while talking to the server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport or body decoding failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("server returned {status}: {body}")]
    Status {
        /// HTTP status of the response.
        status: StatusCode,
        /// Raw response body.
        body: String,
    },
    /// An input image could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Format hint for a file: its extension, or `"jpeg"` when it has none.
pub fn format_for_path(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| !ext.is_empty())
        .map(|ext| if ext == "jpg" { "jpeg".to_string() } else { ext })
        .unwrap_or_else(|| DEFAULT_IMAGE_FORMAT.to_string())
}

/// HTTP client for one Plating server.
#[derive(Debug, Clone)]
pub struct PlatingClient {
    http: Client,
    base_url: String,
}

impl PlatingClient {
    /// Client for the server at `base_url`, e.g. `http://localhost:8000`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = Client::builder().build()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Reuse an existing `reqwest` client.
    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /`
    pub async fn info(&self) -> Result<ServiceInfo, ClientError> {
        let response = self.http.get(self.url(routes::ROOT)).send().await?;
        decode(response).await
    }

    /// `GET /health`; a server without a model answers with an error status.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let response = self.http.get(self.url(routes::HEALTH)).send().await?;
        decode(response).await
    }

    /// Score already-encoded image bytes.
    pub async fn score_bytes(
        &self,
        bytes: &[u8],
        format: impl Into<String>,
    ) -> Result<ScoreResponse, ClientError> {
        let request = ScoreRequest::new(BASE64.encode(bytes), format);
        let response = self
            .http
            .post(self.url(routes::SCORE))
            .json(&request)
            .send()
            .await?;
        decode(response).await
    }

    /// Score one file; the format defaults to the file's extension.
    pub async fn score_path(
        &self,
        path: &Path,
        format: Option<&str>,
    ) -> Result<ScoreResponse, ClientError> {
        let bytes = read_image(path).await?;
        let format = format.map_or_else(|| format_for_path(path), str::to_string);
        self.score_bytes(&bytes, format).await
    }

    /// Score several files in one batch request, in the given order.
    pub async fn score_batch(
        &self,
        paths: &[PathBuf],
        format: Option<&str>,
    ) -> Result<BatchResponse, ClientError> {
        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = read_image(path).await?;
            let format = format.map_or_else(|| format_for_path(path), str::to_string);
            entries.push(ScoreRequest::new(BASE64.encode(&bytes), format));
        }

        let response = self
            .http
            .post(self.url(routes::SCORE_BATCH))
            .json(&entries)
            .send()
            .await?;
        decode(response).await
    }
}

async fn read_image(path: &Path) -> Result<Vec<u8>, ClientError> {
    debug!(path = %path.display(), "reading image");
    tokio::fs::read(path).await.map_err(|source| ClientError::Read {
        path: path.to_path_buf(),
        source,
    })
}

async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Status { status, body });
    }
    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(format_for_path(Path::new("a/photo.PNG")), "png");
        assert_eq!(format_for_path(Path::new("photo.jpg")), "jpeg");
        assert_eq!(format_for_path(Path::new("photo.webp")), "webp");
        assert_eq!(format_for_path(Path::new("no_extension")), "jpeg");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = PlatingClient::with_client(Client::new(), "http://host:8000/");
        assert_eq!(client.base_url(), "http://host:8000");
        assert_eq!(client.url(routes::HEALTH), "http://host:8000/health");
    }
}
