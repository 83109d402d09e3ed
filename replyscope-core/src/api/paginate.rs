//! Limit/offset pagination
//!
//! A traversal ends only on an empty page. Short pages are not treated as the
//! end of data because the API does not return consistent page sizes.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::client::ApiClient;
use super::transport::Transport;
use super::Endpoint;
use crate::error::Result;
use crate::types::ApiKey;

/// One page of a list endpoint: `{items: [...], totalCount?}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<I> {
    items: Option<Vec<I>>,
    pub total_count: Option<u64>,
}

impl<I: DeserializeOwned> Page<I> {
    /// Decode a response body; `null` is an empty page.
    pub fn from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self {
                items: None,
                total_count: None,
            });
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn into_items(self) -> Vec<I> {
        self.items.unwrap_or_default()
    }
}

/// Assembles complete item lists from a list endpoint.
#[derive(Debug)]
pub struct Paginator<'a, T> {
    client: &'a ApiClient<T>,
    page_limit: usize,
}

impl<'a, T: Transport> Paginator<'a, T> {
    /// `page_limit` of zero is raised to one.
    pub fn new(client: &'a ApiClient<T>, page_limit: usize) -> Self {
        Self {
            client,
            page_limit: page_limit.max(1),
        }
    }

    /// Fetch every item for `body`, starting from offset 0.
    ///
    /// Pages are requested sequentially; `offset` advances by the number of
    /// items each page actually returned. Any request failure aborts the
    /// traversal and the items gathered so far are dropped.
    pub async fn paginate<I: DeserializeOwned>(
        &self,
        api_key: &ApiKey,
        endpoint: Endpoint,
        body: &Map<String, Value>,
    ) -> Result<Vec<I>> {
        let mut items: Vec<I> = Vec::new();
        let mut offset: usize = 0;
        let mut pages: usize = 0;
        let mut reported_total = None;

        loop {
            let mut request = body.clone();
            request.insert("limit".to_string(), json!(self.page_limit));
            request.insert("offset".to_string(), json!(offset));

            let value = self.client.post(api_key, endpoint, &request).await?;
            let page: Page<I> = Page::from_value(value)?;
            pages += 1;
            reported_total = page.total_count.or(reported_total);

            let page_items = page.into_items();
            if page_items.is_empty() {
                break;
            }

            offset += page_items.len();
            items.extend(page_items);
        }

        tracing::debug!(
            %endpoint,
            key = %api_key.hint(),
            pages,
            items = items.len(),
            reported_total = ?reported_total,
            "Pagination complete"
        );

        Ok(items)
    }
}
