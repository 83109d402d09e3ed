//! Outreach API access
//!
//! Three layers, leaf-first:
//! - [`Transport`]: sends one POST and returns the raw status and body
//! - [`ApiClient`]: JSON bodies, rate-limit backoff, error extraction
//! - [`Paginator`]: limit/offset traversal until an empty page
//!
//! All endpoints are POST with a JSON body and an `X-API-KEY` header.

mod client;
mod paginate;
mod transport;

pub use client::{extract_error_message, ApiClient, Backoff, RetryPolicy, RATE_LIMITED};
pub use paginate::{Page, Paginator};
pub use transport::{HttpTransport, RawResponse, Transport, API_KEY_HEADER};

use std::fmt;

/// The API operations this client uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// List connected sender accounts
    Accounts,
    /// List campaigns
    Campaigns,
    /// List conversations, filterable by campaign and account
    Conversations,
}

impl Endpoint {
    /// Path appended to the configured base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Accounts => "/li_account/GetAll",
            Endpoint::Campaigns => "/campaign/GetAll",
            Endpoint::Conversations => "/inbox/GetConversationsV2",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
