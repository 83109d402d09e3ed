//! Summary statistics for the dashboard header.
//!
//! Provides lead totals across all campaigns, the overall reply rate and the
//! per-status campaign tally shown next to the campaign table.

use std::collections::BTreeMap;

use crate::types::{Campaign, ReplyRate};

/// Totals across every campaign in a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryStats {
    // Lead progress
    /// Sum of `totalUsers`
    pub total_leads: u64,
    pub in_progress: u64,
    pub pending: u64,
    pub finished: u64,
    pub failed: u64,
    pub excluded: u64,

    // Conversations
    /// Conversations with at least one correspondent message
    pub total_replies: u64,
    pub total_contacted: u64,
    pub total_unread: u64,

    pub campaign_count: usize,
}

impl SummaryStats {
    pub fn from_campaigns(campaigns: &[Campaign]) -> Self {
        campaigns.iter().fold(Self::default(), |mut acc, c| {
            let p = &c.progress_stats;
            acc.total_leads += p.total_users;
            acc.in_progress += p.total_users_in_progress;
            acc.pending += p.total_users_pending;
            acc.finished += p.total_users_finished;
            acc.failed += p.total_users_failed;
            acc.excluded += p.total_users_excluded;
            acc.total_replies += c.num_replies;
            acc.total_contacted += c.num_contacted;
            acc.total_unread += c.num_unread;
            acc.campaign_count += 1;
            acc
        })
    }

    /// Overall rate: replies over total leads (not over contacted).
    pub fn reply_rate(&self) -> ReplyRate {
        ReplyRate::new(self.total_replies, self.total_leads)
    }

    /// The header cards, in display order.
    pub fn cards(&self) -> Vec<SummaryCard> {
        vec![
            SummaryCard::new("Total Leads", self.total_leads.to_string()),
            SummaryCard::new("In Progress", self.in_progress.to_string()),
            SummaryCard::new("Pending", self.pending.to_string()),
            SummaryCard::new("Finished", self.finished.to_string()),
            SummaryCard::new("Failed", self.failed.to_string()),
            SummaryCard::new("Excluded", self.excluded.to_string()),
            SummaryCard::new(
                "Replies",
                format!("{} ({})", self.total_replies, self.reply_rate()),
            ),
        ]
    }
}

/// One labelled value in the dashboard header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryCard {
    pub title: &'static str,
    pub value: String,
}

impl SummaryCard {
    fn new(title: &'static str, value: String) -> Self {
        Self { title, value }
    }
}

/// Number of campaigns per status, ordered by status name.
pub fn status_tally(campaigns: &[Campaign]) -> Vec<(String, usize)> {
    let mut tally: BTreeMap<&str, usize> = BTreeMap::new();
    for campaign in campaigns {
        *tally.entry(campaign.status.as_str()).or_insert(0) += 1;
    }
    tally
        .into_iter()
        .map(|(status, count)| (status.to_string(), count))
        .collect()
}
