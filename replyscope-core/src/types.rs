//! Core domain types for replyscope
//!
//! These types mirror the outreach API's wire shapes (accounts, campaigns,
//! conversations, messages) plus the statistics derived from them.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Account** | A connected sender account that campaigns run from |
//! | **Campaign** | An outreach sequence executed against a lead list from one account |
//! | **Conversation** | A message thread between an account and one correspondent |
//! | **Correspondent** | The external party in a conversation |
//! | **Reply rate** | Share of contacted leads whose conversation has a correspondent message |
//!
//! Every fetched entity remembers which API key fetched it (`source_key_idx`)
//! so follow-up calls are routed to the same credential.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{Error, Result};

/// Account name shown when a campaign's account cannot be resolved.
pub const UNKNOWN_ACCOUNT: &str = "(unknown account)";

// ============================================
// Credentials
// ============================================

/// An opaque, non-empty API credential.
///
/// `Debug` never prints the key itself.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Create a key, trimming surrounding whitespace. Blank keys are rejected.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::Config("API key must not be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The raw key, for the auth header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short, log-safe hint of the key (last four characters).
    pub fn hint(&self) -> String {
        let tail: String = self
            .0
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("…{}", tail)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.hint())
    }
}

/// Ordered, non-empty list of API keys, addressed by `source_key_idx`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeys(Vec<ApiKey>);

impl ApiKeys {
    /// Build the key list. Blank entries are dropped; an empty result is a
    /// configuration error.
    pub fn new<I, S>(raw: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<ApiKey> = raw
            .into_iter()
            .filter_map(|k| ApiKey::new(k).ok())
            .collect();

        if keys.is_empty() {
            return Err(Error::Config(
                "at least one API key is required".to_string(),
            ));
        }
        Ok(Self(keys))
    }

    /// Key at `idx`, if any.
    pub fn get(&self, idx: usize) -> Option<&ApiKey> {
        self.0.get(idx)
    }

    /// Key at `idx`, or a configuration error naming the missing index.
    pub fn require(&self, idx: usize) -> Result<&ApiKey> {
        self.get(idx)
            .ok_or_else(|| Error::Config(format!("no API key at index {}", idx)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys with their `source_key_idx`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ApiKey)> {
        self.0.iter().enumerate()
    }
}

// ============================================
// Identifiers
// ============================================

/// An entity id as the API sent it: a JSON number or a string.
///
/// The original shape is kept so ids can be echoed back in filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Num(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Num(n) => write!(f, "{}", n),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Num(n)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Text(s.to_string())
    }
}

impl EntityId {
    /// Compare against a user-supplied id string (filters, CLI arguments).
    pub fn matches(&self, raw: &str) -> bool {
        self.to_string() == raw.trim()
    }
}

// ============================================
// Accounts
// ============================================

/// A connected sender account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: EntityId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl Account {
    /// "First Last", trimmed; empty when both parts are missing.
    pub fn display_name(&self) -> String {
        join_name(self.first_name.as_deref(), self.last_name.as_deref())
    }
}

fn join_name(first: Option<&str>, last: Option<&str>) -> String {
    format!("{} {}", first.unwrap_or(""), last.unwrap_or(""))
        .trim()
        .to_string()
}

// ============================================
// Campaigns
// ============================================

/// Lead progress counters reported per campaign. Missing or null fields are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressStats {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_users: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_users_in_progress: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_users_pending: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_users_finished: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_users_failed: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_users_excluded: u64,
}

/// A campaign exactly as the campaign list endpoint returns it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignRecord {
    pub id: EntityId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress_stats: ProgressStats,
    #[serde(default)]
    pub linked_in_account_id: Option<EntityId>,
    #[serde(default)]
    pub account_id: Option<EntityId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub campaign_account_ids: Vec<EntityId>,
}

impl CampaignRecord {
    /// The sender account id: the explicit field, then the alternate field,
    /// then the first entry of the account id list.
    pub fn resolved_account_id(&self) -> Option<EntityId> {
        self.linked_in_account_id
            .clone()
            .or_else(|| self.account_id.clone())
            .or_else(|| self.campaign_account_ids.first().cloned())
    }
}

/// A reconciled campaign with its derived reply statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: EntityId,
    pub name: String,
    pub status: String,
    pub progress_stats: ProgressStats,
    pub linked_in_account_id: Option<EntityId>,
    pub account_name: String,
    /// Index into [`ApiKeys`] of the key that fetched this campaign
    pub source_key_idx: usize,
    pub num_contacted: u64,
    pub num_replies: u64,
    pub num_unread: u64,
    pub reply_rate: ReplyRate,
    /// Set when the conversation fetch for this campaign failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats_error: Option<String>,
}

impl Campaign {
    /// Total leads enrolled in the campaign.
    pub fn total_leads(&self) -> u64 {
        self.progress_stats.total_users
    }

    /// Copy computed conversation stats onto the campaign.
    pub fn apply_stats(&mut self, stats: &ConversationStats) {
        self.num_contacted = stats.num_contacted;
        self.num_replies = stats.num_replies;
        self.num_unread = stats.num_unread;
        self.reply_rate = stats.reply_rate();
        self.stats_error = None;
    }
}

// ============================================
// Reply statistics
// ============================================

/// A percentage with one decimal, rendered as e.g. `"28.6%"`, or `"0%"` when
/// the denominator is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplyRate {
    pub numerator: u64,
    pub denominator: u64,
}

impl ReplyRate {
    pub fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Fraction in `[0, ∞)`; 0 when the denominator is zero.
    pub fn ratio(&self) -> f64 {
        if self.denominator == 0 {
            0.0
        } else {
            self.numerator as f64 / self.denominator as f64
        }
    }
}

impl fmt::Display for ReplyRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 0 {
            f.write_str("0%")
        } else {
            // Tenths of a percent, rounding halves up
            let den = self.denominator as u128;
            let tenths = (self.numerator as u128 * 1000 + den / 2) / den;
            write!(f, "{}.{}%", tenths / 10, tenths % 10)
        }
    }
}

impl Serialize for ReplyRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Per-campaign counts derived from its conversations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversationStats {
    pub num_contacted: u64,
    pub num_replies: u64,
    pub num_unread: u64,
}

impl ConversationStats {
    pub fn from_conversations(conversations: &[Conversation]) -> Self {
        Self {
            num_contacted: conversations.len() as u64,
            num_replies: conversations.iter().filter(|c| c.has_reply()).count() as u64,
            num_unread: conversations.iter().filter(|c| !c.read).count() as u64,
        }
    }

    pub fn reply_rate(&self) -> ReplyRate {
        ReplyRate::new(self.num_replies, self.num_contacted)
    }
}

// ============================================
// Conversations
// ============================================

/// Who wrote a message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sender {
    /// The external party
    Correspondent,
    /// The dashboard operator's own account
    #[serde(alias = "ME")]
    Owner,
    /// Any sender value this client does not know, or none at all
    #[default]
    #[serde(other)]
    Unknown,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sender: Sender,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Body text, or a placeholder for empty messages.
    pub fn body_or_placeholder(&self) -> &str {
        match self.body.as_deref() {
            Some(body) if !body.trim().is_empty() => body,
            _ => "(no content)",
        }
    }

    pub fn is_from_correspondent(&self) -> bool {
        self.sender == Sender::Correspondent
    }
}

/// The external party's profile as embedded in a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrespondentProfile {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// A message thread between an account and one correspondent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: EntityId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub read: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<Message>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub correspondent_profile: CorrespondentProfile,
    #[serde(default)]
    pub last_message_text: Option<String>,
}

impl Conversation {
    /// True when the correspondent wrote at least one message.
    pub fn has_reply(&self) -> bool {
        self.messages.iter().any(Message::is_from_correspondent)
    }

    /// Correspondent's name, or a placeholder.
    pub fn correspondent_name(&self) -> String {
        let name = join_name(
            self.correspondent_profile.first_name.as_deref(),
            self.correspondent_profile.last_name.as_deref(),
        );
        if name.is_empty() {
            "(unknown correspondent)".to_string()
        } else {
            name
        }
    }

    /// Last message preview, or a placeholder.
    pub fn preview(&self) -> &str {
        self.last_message_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("(no last message)")
    }
}

/// Conversations worth showing in the viewer: those with a correspondent reply.
pub fn replied_conversations(conversations: &[Conversation]) -> Vec<&Conversation> {
    conversations.iter().filter(|c| c.has_reply()).collect()
}

// ============================================
// Serde helpers
// ============================================

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept RFC 3339 strings, naive ISO strings (assumed UTC), or epoch
/// milliseconds. Anything else becomes `None` rather than failing the page.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => parse_timestamp(&s),
        Some(serde_json::Value::Number(n)) => {
            n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis)
        }
        _ => None,
    })
}

/// Parse an API timestamp string.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
