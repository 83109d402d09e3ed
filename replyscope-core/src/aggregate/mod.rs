//! Multi-key aggregation pipeline
//!
//! ```text
//! accounts (per key) ─┐
//!                     ├─► link + dedup ─► pooled conversation stats ─► Dataset
//! campaigns (per key) ┘
//! ```
//!
//! Account and campaign fetches fan out across keys in parallel and any
//! failure aborts the run. Per-campaign conversation fetches run through the
//! bounded pool; their failures follow the configured [`FailurePolicy`].

mod reconcile;

pub use reconcile::{merge_accounts, merge_campaigns, merge_last_wins, AccountDirectory};

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::api::{ApiClient, Endpoint, HttpTransport, Paginator, RetryPolicy, Transport};
use crate::config::{Config, FailurePolicy};
use crate::error::{Error, Result};
use crate::pool::run_pooled;
use crate::progress::{Progress, ProgressSink};
use crate::types::{
    Account, ApiKeys, Campaign, CampaignRecord, Conversation, ConversationStats, EntityId,
};

/// A campaign whose conversation statistics could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignFailure {
    pub campaign_id: EntityId,
    pub campaign_name: String,
    pub message: String,
}

/// Result of one aggregation run. This is everything the views consume.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub campaigns: Vec<Campaign>,
    pub accounts: Vec<Account>,
    pub failures: Vec<CampaignFailure>,
    pub fetched_at: DateTime<Utc>,
}

impl Dataset {
    /// Campaign by id, compared as text.
    pub fn campaign(&self, id: &str) -> Option<&Campaign> {
        self.campaigns.iter().find(|c| c.id.matches(id))
    }

    /// True when some campaigns are missing reply statistics.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Request body selecting one campaign's conversations.
///
/// The account filter is an empty list when the campaign has no sender
/// account.
pub fn conversation_filter(campaign: &Campaign) -> Map<String, Value> {
    let account_ids: Vec<&EntityId> = campaign.linked_in_account_id.iter().collect();

    let mut body = Map::new();
    body.insert(
        "filters".to_string(),
        json!({
            "campaignIds": [&campaign.id],
            "linkedInAccountIds": account_ids,
        }),
    );
    body
}

/// Runs the aggregation pipeline against one transport.
#[derive(Debug)]
pub struct Aggregator<T> {
    client: ApiClient<T>,
    page_limit: usize,
    concurrency: usize,
    failure_policy: FailurePolicy,
    progress: ProgressSink,
}

impl Aggregator<HttpTransport> {
    /// Build an aggregator talking to the configured API.
    pub fn from_config(config: &Config, progress: ProgressSink) -> Result<Self> {
        let transport = HttpTransport::new(&config.api)?;
        Ok(
            Aggregator::new(transport, RetryPolicy::from_config(&config.api))
                .with_page_limit(config.api.page_limit)
                .with_concurrency(config.aggregation.concurrency)
                .with_failure_policy(config.aggregation.failure_policy)
                .with_progress(progress),
        )
    }
}

impl<T: Transport> Aggregator<T> {
    pub fn new(transport: T, retry: RetryPolicy) -> Self {
        Self {
            client: ApiClient::new(transport, retry),
            page_limit: 100,
            concurrency: 5,
            failure_policy: FailurePolicy::default(),
            progress: ProgressSink::none(),
        }
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Send stage changes and rate-limit waits to `progress`.
    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.client = self.client.with_progress(progress.clone());
        self.progress = progress;
        self
    }

    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    fn paginator(&self) -> Paginator<'_, T> {
        Paginator::new(&self.client, self.page_limit)
    }

    /// Fetch a fresh dataset for `keys`.
    pub async fn aggregate(&self, keys: &ApiKeys) -> Result<Dataset> {
        tracing::info!(keys = keys.len(), "Starting aggregation");

        let accounts = self.fetch_accounts(keys).await?;
        let mut campaigns = self.fetch_campaigns(keys, &accounts).await?;

        if campaigns.is_empty() {
            tracing::warn!("No campaigns returned for any key");
            return Err(Error::NoCampaigns);
        }

        let failures = self.count_replies(keys, &mut campaigns).await?;

        self.progress.emit(Progress::Finished {
            campaigns: campaigns.len(),
            failures: failures.len(),
        });
        tracing::info!(
            campaigns = campaigns.len(),
            accounts = accounts.len(),
            failures = failures.len(),
            "Aggregation complete"
        );

        Ok(Dataset {
            campaigns,
            accounts,
            failures,
            fetched_at: Utc::now(),
        })
    }

    /// Accounts for every key, fetched in parallel and merged.
    pub async fn fetch_accounts(&self, keys: &ApiKeys) -> Result<Vec<Account>> {
        self.progress
            .emit(Progress::FetchingAccounts { keys: keys.len() });

        let paginator = &self.paginator();
        let per_key = try_join_all(keys.iter().map(|(_, key)| async move {
            paginator
                .paginate::<Account>(key, Endpoint::Accounts, &Map::new())
                .await
        }))
        .await?;

        let accounts = merge_accounts(per_key);
        tracing::debug!(count = accounts.len(), "Accounts merged");
        Ok(accounts)
    }

    /// Campaigns for every key, fetched in parallel, linked to `accounts` and
    /// merged.
    pub async fn fetch_campaigns(
        &self,
        keys: &ApiKeys,
        accounts: &[Account],
    ) -> Result<Vec<Campaign>> {
        self.progress
            .emit(Progress::FetchingCampaigns { keys: keys.len() });

        let paginator = &self.paginator();
        let per_key = try_join_all(keys.iter().map(|(idx, key)| async move {
            let records = paginator
                .paginate::<CampaignRecord>(key, Endpoint::Campaigns, &Map::new())
                .await?;
            Ok::<_, Error>((idx, records))
        }))
        .await?;

        let directory = AccountDirectory::new(accounts);
        let per_key: Vec<Vec<Campaign>> = per_key
            .into_iter()
            .map(|(idx, records)| {
                records
                    .into_iter()
                    .map(|record| directory.build_campaign(record, idx))
                    .collect()
            })
            .collect();

        let campaigns = merge_campaigns(per_key);
        tracing::debug!(count = campaigns.len(), "Campaigns merged");
        Ok(campaigns)
    }

    /// Every conversation of `campaign`, using the key that fetched it.
    pub async fn conversations(
        &self,
        keys: &ApiKeys,
        campaign: &Campaign,
    ) -> Result<Vec<Conversation>> {
        let key = keys.require(campaign.source_key_idx)?;
        self.paginator()
            .paginate(key, Endpoint::Conversations, &conversation_filter(campaign))
            .await
    }

    /// Conversation statistics for one campaign.
    pub async fn campaign_stats(
        &self,
        keys: &ApiKeys,
        campaign: &Campaign,
    ) -> Result<ConversationStats> {
        let conversations = self.conversations(keys, campaign).await?;
        Ok(ConversationStats::from_conversations(&conversations))
    }

    /// Compute stats for every campaign through the pool and apply the
    /// failure policy. Returns the recorded failures.
    async fn count_replies(
        &self,
        keys: &ApiKeys,
        campaigns: &mut [Campaign],
    ) -> Result<Vec<CampaignFailure>> {
        let total = campaigns.len();
        self.progress
            .emit(Progress::CountingReplies { campaigns: total });

        let counted = AtomicUsize::new(0);
        let outcomes = {
            let counted = &counted;
            let tasks = campaigns.iter().map(|campaign| async move {
                let outcome = self.campaign_stats(keys, campaign).await;
                let done = counted.fetch_add(1, Ordering::SeqCst) + 1;
                self.progress
                    .emit(Progress::CampaignCounted { done, total });
                outcome
            });
            run_pooled(tasks, self.concurrency).await
        };

        let mut failures = Vec::new();
        for (campaign, outcome) in campaigns.iter_mut().zip(outcomes) {
            match outcome {
                Ok(stats) => campaign.apply_stats(&stats),
                Err(e) => match self.failure_policy {
                    FailurePolicy::FailFast => {
                        tracing::error!(campaign_id = %campaign.id, error = %e, "Campaign stats failed");
                        return Err(Error::PartialFetch {
                            campaign_id: campaign.id.to_string(),
                            campaign_name: campaign.name.clone(),
                            source: Box::new(e),
                        });
                    }
                    FailurePolicy::FailSoft => {
                        tracing::warn!(
                            campaign_id = %campaign.id,
                            campaign = %campaign.name,
                            error = %e,
                            "Campaign stats failed, continuing without them"
                        );
                        let message = e.to_string();
                        campaign.stats_error = Some(message.clone());
                        failures.push(CampaignFailure {
                            campaign_id: campaign.id.clone(),
                            campaign_name: campaign.name.clone(),
                            message,
                        });
                    }
                },
            }
        }

        Ok(failures)
    }
}
