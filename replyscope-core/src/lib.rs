//! # replyscope-core
//!
//! Core library for replyscope - an outreach campaign reply dashboard.
//!
//! This library provides:
//! - Domain types for accounts, campaigns, conversations and reply stats
//! - An API client with rate-limit backoff and limit/offset pagination
//! - A multi-key aggregation pipeline with bounded concurrency
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three layers:
//! - **Layer 0 (Remote):** The outreach API, one credential per account group
//! - **Layer 1 (Dataset):** Reconciled campaigns and accounts with per-campaign reply stats
//! - **Layer 2 (Views):** Summary cards, status tally, filtered and sorted tables
//!
//! ## Example
//!
//! ```rust,no_run
//! use replyscope_core::{Aggregator, Config, ProgressSink, Session};
//!
//! # async fn run() -> replyscope_core::Result<()> {
//! let config = Config::load()?;
//! let keys = config.api.resolve_keys(&[])?;
//! let aggregator = Aggregator::from_config(&config, ProgressSink::none())?;
//!
//! let mut session = Session::new(keys);
//! let dataset = session.refresh(&aggregator).await?;
//! println!("{} campaigns", dataset.campaigns.len());
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use aggregate::{Aggregator, CampaignFailure, Dataset};
pub use config::{Config, FailurePolicy};
pub use error::{Error, Result};
pub use progress::{Progress, ProgressSink};
pub use session::Session;
pub use types::*;

// Public modules
pub mod aggregate;
pub mod analytics;
pub mod api;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod pool;
pub mod progress;
pub mod session;
pub mod types;
