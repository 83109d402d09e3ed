//! Error types for replyscope-core

use thiserror::Error;

/// Main error type for the replyscope-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error (missing API keys, unreadable config file, ...)
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level failure before any HTTP status was received
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The API answered with a non-success status
    #[error("request to {endpoint} failed (status {status}): {message}")]
    Request {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// Aggregation finished but no key returned any campaign
    #[error("no campaigns found; check that the API keys are valid")]
    NoCampaigns,

    /// A pooled per-campaign conversation fetch failed under the fail-fast policy
    #[error("failed to fetch conversations for campaign {campaign_name} ({campaign_id}): {source}")]
    PartialFetch {
        campaign_id: String,
        campaign_name: String,
        #[source]
        source: Box<Error>,
    },

    /// Campaign id not present in the current dataset
    #[error("campaign not found: {0}")]
    UnknownCampaign(String),
}

impl Error {
    /// HTTP status carried by a request error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Request { status, .. } => Some(*status),
            Error::PartialFetch { source, .. } => source.status(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.to_string())
    }
}

/// Result type alias for replyscope-core
pub type Result<T> = std::result::Result<T, Error>;
