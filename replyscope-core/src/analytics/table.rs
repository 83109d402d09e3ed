//! Campaign table filtering and sorting.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::types::{Campaign, EntityId};

/// Column the campaign table is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    AccountName,
    Status,
    TotalLeads,
    Contacted,
    Replies,
    Unread,
    ReplyRate,
}

impl SortKey {
    pub const ALL: [SortKey; 8] = [
        SortKey::Name,
        SortKey::AccountName,
        SortKey::Status,
        SortKey::TotalLeads,
        SortKey::Contacted,
        SortKey::Replies,
        SortKey::Unread,
        SortKey::ReplyRate,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Name => "Name",
            SortKey::AccountName => "Account",
            SortKey::Status => "Status",
            SortKey::TotalLeads => "Leads",
            SortKey::Contacted => "Contacted",
            SortKey::Replies => "Replies",
            SortKey::Unread => "Unread",
            SortKey::ReplyRate => "Reply rate",
        }
    }

    /// The next column, wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    fn compare(&self, a: &Campaign, b: &Campaign) -> Ordering {
        match self {
            SortKey::Name => cmp_ignore_case(&a.name, &b.name),
            SortKey::AccountName => cmp_ignore_case(&a.account_name, &b.account_name),
            SortKey::Status => cmp_ignore_case(&a.status, &b.status),
            SortKey::TotalLeads => a.total_leads().cmp(&b.total_leads()),
            SortKey::Contacted => a.num_contacted.cmp(&b.num_contacted),
            SortKey::Replies => a.num_replies.cmp(&b.num_replies),
            SortKey::Unread => a.num_unread.cmp(&b.num_unread),
            SortKey::ReplyRate => a.reply_rate.ratio().total_cmp(&b.reply_rate.ratio()),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "name" => Ok(SortKey::Name),
            "account" | "accountname" => Ok(SortKey::AccountName),
            "status" => Ok(SortKey::Status),
            "leads" | "totalleads" => Ok(SortKey::TotalLeads),
            "contacted" => Ok(SortKey::Contacted),
            "replies" => Ok(SortKey::Replies),
            "unread" => Ok(SortKey::Unread),
            "rate" | "replyrate" => Ok(SortKey::ReplyRate),
            other => Err(format!(
                "unknown sort column '{}' (expected name, account, status, leads, contacted, replies, unread or rate)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Which campaigns the table shows.
///
/// `statuses: None` allows every status; `Some(set)` allows only the listed
/// ones (an empty set hides everything).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignFilter {
    /// Sender account id, compared as text
    pub account_id: Option<String>,
    pub statuses: Option<BTreeSet<String>>,
}

impl CampaignFilter {
    pub fn matches(&self, campaign: &Campaign) -> bool {
        let account_ok = match &self.account_id {
            Some(wanted) => campaign
                .linked_in_account_id
                .as_ref()
                .is_some_and(|id| id.matches(wanted)),
            None => true,
        };
        let status_ok = self
            .statuses
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&campaign.status));

        account_ok && status_ok
    }

    /// Flip one status on or off. `all` is the full status list; when every
    /// status ends up allowed the filter returns to "allow all".
    pub fn toggle_status(&mut self, status: &str, all: &[String]) {
        let mut allowed = self
            .statuses
            .take()
            .unwrap_or_else(|| all.iter().cloned().collect());

        if !allowed.remove(status) {
            allowed.insert(status.to_string());
        }

        let covers_all = all.iter().all(|s| allowed.contains(s));
        self.statuses = if covers_all { None } else { Some(allowed) };
    }

    pub fn is_status_allowed(&self, status: &str) -> bool {
        self.statuses
            .as_ref()
            .map_or(true, |allowed| allowed.contains(status))
    }

    /// Step the account filter through `options`: all, first, ..., last, all.
    pub fn cycle_account(&mut self, options: &[AccountOption]) {
        let current = self
            .account_id
            .as_deref()
            .and_then(|id| options.iter().position(|o| o.id.matches(id)));

        self.account_id = match current {
            None => options.first().map(|o| o.id.to_string()),
            Some(idx) => options.get(idx + 1).map(|o| o.id.to_string()),
        };
    }
}

/// Filter then stable-sort `campaigns` for the table.
pub fn apply<'a>(
    campaigns: &'a [Campaign],
    filter: &CampaignFilter,
    key: SortKey,
    direction: SortDirection,
) -> Vec<&'a Campaign> {
    let mut rows: Vec<&Campaign> = campaigns.iter().filter(|c| filter.matches(c)).collect();
    rows.sort_by(|a, b| {
        let ord = key.compare(a, b);
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
    rows
}

/// A selectable sender account in the account filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountOption {
    pub id: EntityId,
    pub name: String,
}

/// Distinct accounts referenced by campaigns, sorted by name ignoring case.
///
/// Campaigns without an account are not selectable. When one id appears with
/// different names the last one seen is used.
pub fn account_options(campaigns: &[Campaign]) -> Vec<AccountOption> {
    let pairs = campaigns.iter().filter_map(|c| {
        c.linked_in_account_id.as_ref().map(|id| AccountOption {
            id: id.clone(),
            name: c.account_name.clone(),
        })
    });

    let mut options = crate::aggregate::merge_last_wins(pairs, |o| o.id.to_string());
    options.sort_by(|a, b| cmp_ignore_case(&a.name, &b.name));
    options
}

/// Distinct campaign statuses, sorted.
pub fn status_options(campaigns: &[Campaign]) -> Vec<String> {
    campaigns
        .iter()
        .map(|c| c.status.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::testing::campaign;
    use crate::types::ReplyRate;

    fn sample() -> Vec<Campaign> {
        let mut a = campaign(1, "beta", "IN_PROGRESS");
        a.linked_in_account_id = Some(EntityId::Num(10));
        a.account_name = "zed".to_string();
        a.reply_rate = ReplyRate::new(1, 10); // 10%
        a.num_replies = 1;

        let mut b = campaign(2, "Alpha", "PAUSED");
        b.linked_in_account_id = Some(EntityId::Num(20));
        b.account_name = "Amy".to_string();
        b.reply_rate = ReplyRate::new(9, 10); // 90%
        b.num_replies = 9;

        let mut c = campaign(3, "gamma", "IN_PROGRESS");
        c.linked_in_account_id = Some(EntityId::Num(10));
        c.account_name = "zed".to_string();
        c.reply_rate = ReplyRate::new(1, 3); // 33.3%
        c.num_replies = 1;

        let d = campaign(4, "delta", "FINISHED");

        vec![a, b, c, d]
    }

    fn ids(rows: &[&Campaign]) -> Vec<String> {
        rows.iter().map(|c| c.id.to_string()).collect()
    }

    #[test]
    fn test_sort_by_name_ignores_case() {
        let campaigns = sample();
        let rows = apply(
            &campaigns,
            &CampaignFilter::default(),
            SortKey::Name,
            SortDirection::Ascending,
        );
        assert_eq!(ids(&rows), vec!["2", "1", "4", "3"]);
    }

    #[test]
    fn test_reply_rate_sorts_numerically() {
        let campaigns = sample();
        let rows = apply(
            &campaigns,
            &CampaignFilter::default(),
            SortKey::ReplyRate,
            SortDirection::Descending,
        );
        // "90.0%" > "33.3%" > "10.0%" > "0%"
        assert_eq!(ids(&rows), vec!["2", "3", "1", "4"]);
    }

    #[test]
    fn test_sort_is_stable_in_both_directions() {
        let campaigns = sample();
        for direction in [SortDirection::Ascending, SortDirection::Descending] {
            let rows = apply(
                &campaigns,
                &CampaignFilter::default(),
                SortKey::Replies,
                direction,
            );
            let pos = |id: &str| rows.iter().position(|c| c.id.matches(id)).unwrap();
            // campaigns 1 and 3 tie on replies and keep their input order
            assert!(pos("1") < pos("3"));
        }
    }

    #[test]
    fn test_filter_by_account_and_status() {
        let campaigns = sample();

        let filter = CampaignFilter {
            account_id: Some("10".to_string()),
            statuses: None,
        };
        let rows = apply(&campaigns, &filter, SortKey::Name, SortDirection::Ascending);
        assert_eq!(ids(&rows), vec!["1", "3"]);

        let filter = CampaignFilter {
            account_id: None,
            statuses: Some(["PAUSED".to_string(), "FINISHED".to_string()].into()),
        };
        let rows = apply(&campaigns, &filter, SortKey::Name, SortDirection::Ascending);
        assert_eq!(ids(&rows), vec!["2", "4"]);

        let filter = CampaignFilter {
            account_id: None,
            statuses: Some(BTreeSet::new()),
        };
        assert!(apply(&campaigns, &filter, SortKey::Name, SortDirection::Ascending).is_empty());
    }

    #[test]
    fn test_toggle_status_round_trip() {
        let all = vec!["A".to_string(), "B".to_string()];
        let mut filter = CampaignFilter::default();

        filter.toggle_status("A", &all);
        assert!(!filter.is_status_allowed("A"));
        assert!(filter.is_status_allowed("B"));

        filter.toggle_status("A", &all);
        assert_eq!(filter.statuses, None);
    }

    #[test]
    fn test_options() {
        let campaigns = sample();
        let accounts = account_options(&campaigns);
        assert_eq!(
            accounts,
            vec![
                AccountOption {
                    id: EntityId::Num(20),
                    name: "Amy".to_string()
                },
                AccountOption {
                    id: EntityId::Num(10),
                    name: "zed".to_string()
                },
            ]
        );
        assert_eq!(
            status_options(&campaigns),
            vec!["FINISHED", "IN_PROGRESS", "PAUSED"]
        );
    }

    #[test]
    fn test_cycle_account() {
        let options = account_options(&sample());
        let mut filter = CampaignFilter::default();

        filter.cycle_account(&options);
        assert_eq!(filter.account_id.as_deref(), Some("20"));
        filter.cycle_account(&options);
        assert_eq!(filter.account_id.as_deref(), Some("10"));
        filter.cycle_account(&options);
        assert_eq!(filter.account_id, None);
    }

    #[test]
    fn test_sort_key_parse_and_cycle() {
        assert_eq!("rate".parse::<SortKey>().unwrap(), SortKey::ReplyRate);
        assert_eq!("Account-Name".parse::<SortKey>().unwrap(), SortKey::AccountName);
        assert!("bogus".parse::<SortKey>().is_err());
        assert_eq!(SortKey::ReplyRate.next(), SortKey::Name);
        assert_eq!(SortKey::Name.next(), SortKey::AccountName);
    }
}
