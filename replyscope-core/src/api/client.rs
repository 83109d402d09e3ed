//! JSON client with rate-limit backoff
//!
//! Only rate-limited responses are retried. Every other failure surfaces
//! immediately so that malformed requests are not masked by silent retries.

use std::time::Duration;

use serde_json::{json, Map, Value};

use super::transport::{RawResponse, Transport};
use super::Endpoint;
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::progress::{Progress, ProgressSink};
use crate::types::ApiKey;

/// HTTP status the API uses to signal rate limiting.
pub const RATE_LIMITED: u16 = 429;

/// How many times to retry a rate-limited request, and how long to wait first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: config.initial_delay(),
        }
    }

    /// Delay generator for one request: `d, 2d, 4d, ...`, `max_retries` items.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            next_delay: self.initial_delay,
            remaining: self.max_retries,
        }
    }
}

/// Exponential delay sequence. Yields one delay per remaining retry.
#[derive(Debug, Clone)]
pub struct Backoff {
    next_delay: Duration,
    remaining: u32,
}

impl Backoff {
    /// Retries still available.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let delay = self.next_delay;
        self.next_delay = self.next_delay.saturating_mul(2);
        Some(delay)
    }
}

/// Client for the outreach API.
#[derive(Debug)]
pub struct ApiClient<T> {
    transport: T,
    retry: RetryPolicy,
    progress: ProgressSink,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, retry: RetryPolicy) -> Self {
        Self {
            transport,
            retry,
            progress: ProgressSink::none(),
        }
    }

    /// Report rate-limit waits to `progress`.
    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// POST `body` to `endpoint` with the client's retry policy.
    pub async fn post(
        &self,
        api_key: &ApiKey,
        endpoint: Endpoint,
        body: &Map<String, Value>,
    ) -> Result<Value> {
        self.post_with(api_key, endpoint, body, self.retry).await
    }

    /// POST `body` to `endpoint`, retrying rate-limited responses per `policy`.
    ///
    /// At most `policy.max_retries + 1` requests are sent. An empty response
    /// body is returned as an empty result set.
    pub async fn post_with(
        &self,
        api_key: &ApiKey,
        endpoint: Endpoint,
        body: &Map<String, Value>,
        policy: RetryPolicy,
    ) -> Result<Value> {
        let body = Value::Object(body.clone());
        let mut backoff = policy.backoff();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let response = self.transport.post(endpoint, api_key, &body).await?;

            if response.status == RATE_LIMITED {
                if let Some(delay) = backoff.next() {
                    tracing::warn!(
                        %endpoint,
                        key = %api_key.hint(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    self.progress.emit(Progress::RateLimited {
                        endpoint,
                        delay,
                        retries_left: backoff.remaining(),
                    });
                    tokio::time::sleep(delay).await;
                    continue;
                }
                tracing::warn!(%endpoint, attempt, "Rate limited, retries exhausted");
            }

            if !response.is_success() {
                return Err(request_error(endpoint, &response));
            }

            return parse_body(&response.body);
        }
    }
}

fn request_error(endpoint: Endpoint, response: &RawResponse) -> Error {
    let message = extract_error_message(&response.body);
    tracing::debug!(%endpoint, status = response.status, %message, "API request failed");
    Error::Request {
        endpoint: endpoint.path().to_string(),
        status: response.status,
        message,
    }
}

/// Parse a success body. Empty bodies mean "no items".
fn parse_body(body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(json!({ "items": [] }));
    }
    Ok(serde_json::from_str(body)?)
}

/// Best-effort server message from an error body: the JSON `error` field, then
/// `message`, then the plain text body.
pub fn extract_error_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "unknown server error".to_string();
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => ["error", "message"]
            .iter()
            .filter_map(|field| map.get(*field))
            .find_map(|v| match v {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Object(_) | Value::Array(_) => Some(v.to_string()),
                _ => None,
            })
            .unwrap_or_else(|| "unknown server error".to_string()),
        Ok(Value::String(s)) if !s.trim().is_empty() => s,
        Ok(_) => "unknown server error".to_string(),
        Err(_) => trimmed.to_string(),
    }
}
