//! Analytics module for replyscope
//!
//! Derived view data computed from a [`Dataset`](crate::aggregate::Dataset):
//! - Dashboard summary cards and the per-status tally
//! - Campaign table filtering and sorting
//! - Account and status filter options
//!
//! Everything here is a pure function of the campaign list; nothing touches
//! the network.

pub mod dashboard;
pub mod table;

pub use dashboard::{status_tally, SummaryCard, SummaryStats};
pub use table::{
    account_options, apply, status_options, AccountOption, CampaignFilter, SortDirection, SortKey,
};

#[cfg(test)]
pub(crate) mod testing {
    use crate::types::{Campaign, EntityId, ProgressStats, ReplyRate};

    pub fn campaign(id: i64, name: &str, status: &str) -> Campaign {
        Campaign {
            id: EntityId::Num(id),
            name: name.to_string(),
            status: status.to_string(),
            progress_stats: ProgressStats::default(),
            linked_in_account_id: None,
            account_name: crate::types::UNKNOWN_ACCOUNT.to_string(),
            source_key_idx: 0,
            num_contacted: 0,
            num_replies: 0,
            num_unread: 0,
            reply_rate: ReplyRate::default(),
            stats_error: None,
        }
    }
}
