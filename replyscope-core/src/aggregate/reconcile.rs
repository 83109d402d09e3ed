//! Cross-key reconciliation
//!
//! Lists fetched with different API keys are merged by id. A later entry
//! replaces an earlier one with the same id but keeps the earlier position.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use crate::types::{Account, Campaign, CampaignRecord, ReplyRate, UNKNOWN_ACCOUNT};

/// Merge `items` by `key`, last writer wins, first-seen order kept.
pub fn merge_last_wins<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut merged: Vec<T> = Vec::new();

    for item in items {
        match positions.entry(key(&item)) {
            Entry::Occupied(slot) => merged[*slot.get()] = item,
            Entry::Vacant(slot) => {
                slot.insert(merged.len());
                merged.push(item);
            }
        }
    }

    merged
}

/// Merge per-key account lists (in key order) into one list.
pub fn merge_accounts(per_key: Vec<Vec<Account>>) -> Vec<Account> {
    merge_last_wins(per_key.into_iter().flatten(), |a| a.id.to_string())
}

/// Merge per-key campaign lists (in key order) into one list.
pub fn merge_campaigns(per_key: Vec<Vec<Campaign>>) -> Vec<Campaign> {
    merge_last_wins(per_key.into_iter().flatten(), |c| c.id.to_string())
}

/// Id-keyed account name lookup.
///
/// Ids are compared by their text form so that `5` and `"5"` resolve to the
/// same account.
#[derive(Debug, Default)]
pub struct AccountDirectory {
    names: HashMap<String, String>,
}

impl AccountDirectory {
    pub fn new(accounts: &[Account]) -> Self {
        Self {
            names: accounts
                .iter()
                .map(|a| (a.id.to_string(), a.display_name()))
                .collect(),
        }
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Build a campaign from its wire record, resolving the sender account.
    pub fn build_campaign(&self, record: CampaignRecord, source_key_idx: usize) -> Campaign {
        let linked_in_account_id = record.resolved_account_id();

        let account_name = match &linked_in_account_id {
            Some(id) => match self.name_of(&id.to_string()) {
                Some(name) => name.to_string(),
                None => {
                    tracing::warn!(
                        campaign_id = %record.id,
                        account_id = %id,
                        "Campaign account not found among fetched accounts"
                    );
                    UNKNOWN_ACCOUNT.to_string()
                }
            },
            None => UNKNOWN_ACCOUNT.to_string(),
        };

        Campaign {
            id: record.id,
            name: record.name,
            status: record.status,
            progress_stats: record.progress_stats,
            linked_in_account_id,
            account_name,
            source_key_idx,
            num_contacted: 0,
            num_replies: 0,
            num_unread: 0,
            reply_rate: ReplyRate::default(),
            stats_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityId;
    use serde_json::json;

    fn account(id: i64, first: &str) -> Account {
        Account {
            id: EntityId::Num(id),
            first_name: Some(first.to_string()),
            last_name: None,
        }
    }

    fn record(value: serde_json::Value) -> CampaignRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_merge_last_wins_keeps_first_position() {
        let merged = merge_last_wins(
            vec![("a", 1), ("b", 2), ("a", 3), ("c", 4)],
            |(k, _)| *k,
        );
        assert_eq!(merged, vec![("a", 3), ("b", 2), ("c", 4)]);
    }

    #[test]
    fn test_merge_accounts_across_keys() {
        let merged = merge_accounts(vec![
            vec![account(1, "Old"), account(2, "Bo")],
            vec![account(1, "New")],
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].display_name(), "New");
        assert_eq!(merged[1].display_name(), "Bo");
    }

    #[test]
    fn test_numeric_and_text_ids_resolve_alike() {
        let directory = AccountDirectory::new(&[account(5, "Ada")]);
        let campaign = directory.build_campaign(
            record(json!({ "id": 1, "name": "C", "linkedInAccountId": "5" })),
            0,
        );
        assert_eq!(campaign.account_name, "Ada");
    }

    #[test]
    fn test_build_campaign_unknown_account() {
        let directory = AccountDirectory::new(&[account(5, "Ada")]);

        let missing = directory.build_campaign(
            record(json!({ "id": 1, "name": "C", "linkedInAccountId": 99 })),
            1,
        );
        assert_eq!(missing.account_name, UNKNOWN_ACCOUNT);
        assert_eq!(missing.linked_in_account_id, Some(EntityId::Num(99)));
        assert_eq!(missing.source_key_idx, 1);

        let none = directory.build_campaign(record(json!({ "id": 2 })), 0);
        assert_eq!(none.account_name, UNKNOWN_ACCOUNT);
        assert_eq!(none.linked_in_account_id, None);
        assert_eq!(none.reply_rate.to_string(), "0%");
    }
}
