//! REST clients for the inventory APIs.
//!
//! Both clients share the error type and the HTTP client setup defined here.

pub mod defectdojo;
pub mod dependency_track;

pub use defectdojo::DefectDojoClient;
pub use dependency_track::DependencyTrackClient;

use std::time::Duration;
use thiserror::Error;

/// Errors returned by the API clients.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} API key is not configured")]
    MissingApiKey(&'static str),

    #[error("Request timed out after {0}s: {1}")]
    Timeout(u64, String),

    #[error("Cannot connect to {0}")]
    Connect(String),

    #[error("Request to {url} failed with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
        body: String,
    },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("No scanner project found for {project} (version {version})")]
    NoMatchingProjects { project: String, version: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Connection settings shared by both clients.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub api_version: String,
    pub api_key: Option<String>,
    pub verify_tls: bool,
    pub page_size: usize,
    pub timeout_seconds: u64,
}

impl ClientSettings {
    /// `<base_url>/api/<api_version>` without a trailing slash.
    pub fn api_url(&self) -> String {
        format!(
            "{}/api/{}",
            self.base_url.trim_end_matches('/'),
            self.api_version
        )
    }
}

impl From<&crate::config::DependencyTrackConfig> for ClientSettings {
    fn from(config: &crate::config::DependencyTrackConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_version: config.api_version.clone(),
            api_key: config.api_key.clone(),
            verify_tls: config.verify_tls,
            page_size: config.page_size,
            timeout_seconds: config.timeout_seconds,
        }
    }
}

impl From<&crate::config::DefectDojoConfig> for ClientSettings {
    fn from(config: &crate::config::DefectDojoConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            api_version: config.api_version.clone(),
            api_key: config.api_key.clone(),
            verify_tls: config.verify_tls,
            page_size: config.page_size,
            timeout_seconds: config.timeout_seconds,
        }
    }
}

/// Build the reqwest client for the given settings.
pub(crate) fn build_http_client(settings: &ClientSettings) -> Result<reqwest::Client, ApiError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_seconds))
        .danger_accept_invalid_certs(!settings.verify_tls)
        .build()?;
    Ok(client)
}

/// Send a prepared request and turn transport and status failures into `ApiError`.
pub(crate) async fn send(
    request: reqwest::RequestBuilder,
    url: &str,
    timeout_seconds: u64,
) -> Result<reqwest::Response, ApiError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ApiError::Timeout(timeout_seconds, url.to_string())
        } else if e.is_connect() {
            ApiError::Connect(url.to_string())
        } else {
            ApiError::Http(e)
        }
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status,
            url: url.to_string(),
            body,
        });
    }

    Ok(response)
}

/// Decode a JSON response body.
pub(crate) async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    url: &str,
) -> Result<T, ApiError> {
    response.json::<T>().await.map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}
