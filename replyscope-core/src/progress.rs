//! Human-readable progress notifications
//!
//! The pipeline reports what it is doing (stage changes, rate-limit waits,
//! per-campaign completion) through a [`ProgressSink`]. Views turn these into
//! a status line or a spinner message; they are not part of the data contract.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::api::Endpoint;

/// A single progress notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    /// Account lists are being fetched for every key
    FetchingAccounts { keys: usize },
    /// Campaign lists are being fetched for every key
    FetchingCampaigns { keys: usize },
    /// Per-campaign conversation statistics are being computed
    CountingReplies { campaigns: usize },
    /// One more campaign's statistics finished (successfully or not)
    CampaignCounted { done: usize, total: usize },
    /// The API signalled rate limiting; waiting before the next attempt
    RateLimited {
        endpoint: Endpoint,
        delay: Duration,
        retries_left: u32,
    },
    /// The run completed
    Finished { campaigns: usize, failures: usize },
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::FetchingAccounts { keys } => {
                write!(f, "Fetching accounts for {} key(s)...", keys)
            }
            Progress::FetchingCampaigns { keys } => {
                write!(f, "Fetching campaigns for {} key(s)...", keys)
            }
            Progress::CountingReplies { campaigns } => {
                write!(f, "Counting replies across {} campaign(s)...", campaigns)
            }
            Progress::CampaignCounted { done, total } => {
                write!(f, "Counting replies... {}/{}", done, total)
            }
            Progress::RateLimited {
                endpoint,
                delay,
                retries_left,
            } => write!(
                f,
                "API rate limited on {}. Retrying in {:.1}s ({} retries left)...",
                endpoint,
                delay.as_secs_f64(),
                retries_left
            ),
            Progress::Finished {
                campaigns,
                failures,
            } => {
                if *failures == 0 {
                    write!(f, "Done: {} campaign(s)", campaigns)
                } else {
                    write!(
                        f,
                        "Done: {} campaign(s), {} without reply stats",
                        campaigns, failures
                    )
                }
            }
        }
    }
}

type Callback = Arc<dyn Fn(&Progress) + Send + Sync>;

/// Cloneable receiver for progress notifications. The default sink drops them.
#[derive(Clone, Default)]
pub struct ProgressSink {
    callback: Option<Callback>,
}

impl ProgressSink {
    /// Sink that forwards every notification to `callback`.
    pub fn new(callback: impl Fn(&Progress) + Send + Sync + 'static) -> Self {
        Self {
            callback: Some(Arc::new(callback)),
        }
    }

    /// Sink that ignores notifications.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn emit(&self, progress: Progress) {
        if let Some(callback) = &self.callback {
            callback(&progress);
        }
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSink")
            .field("active", &self.callback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_sink_forwards_notifications() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            ProgressSink::new(move |p| seen.lock().unwrap().push(p.clone()))
        };

        sink.emit(Progress::FetchingAccounts { keys: 2 });
        sink.clone().emit(Progress::Finished {
            campaigns: 4,
            failures: 0,
        });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].to_string(), "Fetching accounts for 2 key(s)...");
        assert_eq!(seen[1].to_string(), "Done: 4 campaign(s)");
    }

    #[test]
    fn test_rate_limit_message() {
        let msg = Progress::RateLimited {
            endpoint: Endpoint::Campaigns,
            delay: Duration::from_millis(2000),
            retries_left: 1,
        }
        .to_string();
        assert_eq!(
            msg,
            "API rate limited on /campaign/GetAll. Retrying in 2.0s (1 retries left)..."
        );
    }

    #[test]
    fn test_default_sink_is_silent() {
        ProgressSink::none().emit(Progress::CountingReplies { campaigns: 1 });
    }
}
