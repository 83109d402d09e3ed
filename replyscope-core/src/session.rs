//! Session state shared by the views
//!
//! A [`Session`] owns the API keys for a run and the most recent dataset.
//! Every refresh replaces the dataset wholesale; nothing is merged across runs.

use crate::aggregate::{Aggregator, Dataset};
use crate::api::Transport;
use crate::error::{Error, Result};
use crate::types::{ApiKeys, Campaign, Conversation};

#[derive(Debug)]
pub struct Session {
    keys: ApiKeys,
    dataset: Option<Dataset>,
}

impl Session {
    pub fn new(keys: ApiKeys) -> Self {
        Self {
            keys,
            dataset: None,
        }
    }

    pub fn keys(&self) -> &ApiKeys {
        &self.keys
    }

    /// The dataset from the last successful refresh, if any.
    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// Run a fresh aggregation.
    ///
    /// The previous dataset is dropped before the run starts, so a failed
    /// refresh leaves the session empty rather than showing stale data.
    pub async fn refresh<T: Transport>(&mut self, aggregator: &Aggregator<T>) -> Result<&Dataset> {
        self.dataset = None;
        let dataset = aggregator.aggregate(&self.keys).await?;
        Ok(self.dataset.insert(dataset))
    }

    /// Campaign from the current dataset.
    pub fn campaign(&self, id: &str) -> Result<&Campaign> {
        self.dataset
            .as_ref()
            .and_then(|d| d.campaign(id))
            .ok_or_else(|| Error::UnknownCampaign(id.to_string()))
    }

    /// Fetch the conversations of a campaign in the current dataset.
    pub async fn conversations<T: Transport>(
        &self,
        aggregator: &Aggregator<T>,
        campaign_id: &str,
    ) -> Result<Vec<Conversation>> {
        let campaign = self.campaign(campaign_id)?;
        aggregator.conversations(&self.keys, campaign).await
    }
}
