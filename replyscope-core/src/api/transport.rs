//! Raw request transport
//!
//! The client never touches the network directly; it goes through a
//! [`Transport`], which keeps backoff and pagination testable without a server.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};

use super::Endpoint;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::types::ApiKey;

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Status and body of a completed HTTP exchange, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a single POST request.
///
/// Implementations report transport-level failures (DNS, TLS, connection
/// reset) as [`Error::Http`]; any response that carries a status, including
/// errors, is returned as a [`RawResponse`].
pub trait Transport: Send + Sync {
    fn post(
        &self,
        endpoint: Endpoint,
        api_key: &ApiKey,
        body: &serde_json::Value,
    ) -> impl Future<Output = Result<RawResponse>> + Send;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport from the API configuration.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Config("api.base_url is required".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let http_client = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Full URL for an endpoint.
    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }
}

impl Transport for HttpTransport {
    async fn post(
        &self,
        endpoint: Endpoint,
        api_key: &ApiKey,
        body: &serde_json::Value,
    ) -> Result<RawResponse> {
        let url = self.url(endpoint);

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, api_key.expose())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("{}: {}", endpoint, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("{}: failed to read body: {}", endpoint, e)))?;

        tracing::trace!(%endpoint, status, bytes = body.len(), "API response");

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base_and_path() {
        let config = ApiConfig {
            base_url: "https://api.example.com/public/".to_string(),
            ..Default::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(
            transport.url(Endpoint::Conversations),
            "https://api.example.com/public/inbox/GetConversationsV2"
        );
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let config = ApiConfig {
            base_url: "  ".to_string(),
            ..Default::default()
        };
        assert!(HttpTransport::new(&config).is_err());
    }

    #[test]
    fn test_raw_response_success_range() {
        let ok = RawResponse {
            status: 204,
            body: String::new(),
        };
        let limited = RawResponse {
            status: 429,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!limited.is_success());
    }
}
