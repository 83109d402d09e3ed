//! replyscope-report - Outreach campaign reply report
//!
//! Headless counterpart of the dashboard: prints the summary, the campaign
//! table or one campaign's replied conversations, as text or JSON.

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use replyscope_core::analytics::{self, status_tally, CampaignFilter, SortDirection, SortKey, SummaryStats};
use replyscope_core::config::API_KEY_ENV;
use replyscope_core::format::{format_timestamp_opt, truncate};
use replyscope_core::{
    replied_conversations, Aggregator, ApiKeys, Campaign, Config, Conversation, Dataset,
    ProgressSink, Sender, Session,
};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "replyscope-report")]
#[command(about = "Outreach campaign reply report")]
#[command(version)]
struct Args {
    /// API key to aggregate (repeat for several keys; overrides config and env)
    #[arg(long = "api-key", value_name = "KEY", global = true)]
    api_keys: Vec<String>,

    /// Export format (json). Defaults to a plain-text report
    #[arg(long, global = true)]
    export: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summary cards and campaigns per status
    Summary,

    /// Campaign table
    Campaigns {
        /// Only campaigns sent from this account id
        #[arg(long)]
        account: Option<String>,

        /// Only campaigns with this status (repeatable)
        #[arg(long = "status", value_name = "STATUS")]
        statuses: Vec<String>,

        /// Sort column: name, account, status, leads, contacted, replies, unread, rate
        #[arg(long, default_value = "name")]
        sort: SortKey,

        /// Sort descending
        #[arg(long)]
        desc: bool,
    },

    /// Replied conversations of one campaign
    Conversations {
        /// Campaign id as shown by `campaigns`
        campaign_id: String,
    },

    /// Show config and log locations and where API keys come from
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Export {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = replyscope_core::logging::init(&config.logging).ok();

    let export = match args.export.as_deref() {
        None => Export::Text,
        Some("json") => Export::Json,
        Some(other) => anyhow::bail!("Unknown export format: {}. Use 'json'", other),
    };

    if let Command::Config = args.command {
        print_config(&config, &args.api_keys);
        return Ok(());
    }

    // Resolve keys before touching the network
    let keys = config
        .api
        .resolve_keys(&args.api_keys)
        .context("no usable API key; pass --api-key, set REPLYSCOPE_API_KEY or add api.api_keys to the config file")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(run(&config, keys, args.command, export))
}

async fn run(config: &Config, keys: ApiKeys, command: Command, export: Export) -> Result<()> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let sink = {
        let spinner = spinner.clone();
        ProgressSink::new(move |progress| {
            tracing::debug!(progress = %progress, "Progress");
            spinner.set_message(progress.to_string());
        })
    };
    let aggregator =
        Aggregator::from_config(config, sink).context("failed to create API client")?;

    let mut session = Session::new(keys);
    let refreshed = session.refresh(&aggregator).await;
    if let Err(e) = refreshed {
        spinner.finish_and_clear();
        return Err(e).context("failed to fetch campaign data");
    }

    let conversations = match &command {
        Command::Conversations { campaign_id } => {
            let result = session.conversations(&aggregator, campaign_id).await;
            Some(result.with_context(|| {
                format!("failed to fetch conversations for campaign {}", campaign_id)
            }))
        }
        _ => None,
    };
    spinner.finish_and_clear();

    let dataset = session
        .dataset()
        .context("refresh finished without a dataset")?;

    match command {
        Command::Summary => report_summary(dataset, export),
        Command::Campaigns {
            account,
            statuses,
            sort,
            desc,
        } => {
            let filter = CampaignFilter {
                account_id: account,
                statuses: (!statuses.is_empty())
                    .then(|| statuses.into_iter().collect::<BTreeSet<_>>()),
            };
            let direction = if desc {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            let rows = analytics::apply(&dataset.campaigns, &filter, sort, direction);
            report_campaigns(&rows, export)
        }
        Command::Conversations { campaign_id } => {
            let all = match conversations {
                Some(result) => result?,
                None => Vec::new(),
            };
            let campaign = session.campaign(&campaign_id)?;
            report_conversations(campaign, &all, export)
        }
        Command::Config => Ok(()),
    }
}

// ========== Config ==========

fn print_config(config: &Config, explicit: &[String]) {
    let config_path = Config::config_path();
    let source = if explicit.iter().any(|k| !k.trim().is_empty()) {
        "command line (--api-key)".to_string()
    } else if std::env::var(API_KEY_ENV).is_ok_and(|k| !k.trim().is_empty()) {
        format!("environment ({})", API_KEY_ENV)
    } else if config.api.api_keys.iter().any(|k| !k.trim().is_empty()) {
        "config file (api.api_keys)".to_string()
    } else {
        "none".to_string()
    };

    println!("Config file:  {}", config_path.display());
    println!(
        "              {}",
        if config_path.exists() {
            "(found)"
        } else {
            "(not found, using defaults)"
        }
    );
    println!(
        "Log file:     {}",
        replyscope_core::logging::log_file_path().display()
    );
    println!("API base URL: {}", config.api.base_url);
    println!("Key source:   {}", source);
    match config.api.resolve_keys(explicit) {
        Ok(keys) => {
            let hints: Vec<String> = keys.iter().map(|(_, k)| k.hint()).collect();
            println!("API keys:     {} ({})", keys.len(), hints.join(", "));
        }
        Err(e) => println!("API keys:     0 ({})", e),
    }
    println!(
        "Concurrency:  {} ({:?})",
        config.aggregation.concurrency, config.aggregation.failure_policy
    );
}

// ========== Summary ==========

fn report_summary(dataset: &Dataset, export: Export) -> Result<()> {
    let stats = SummaryStats::from_campaigns(&dataset.campaigns);
    let tally = status_tally(&dataset.campaigns);

    if export == Export::Json {
        let cards: Vec<_> = stats
            .cards()
            .into_iter()
            .map(|c| json!({ "title": c.title, "value": c.value }))
            .collect();
        let statuses: Vec<_> = tally
            .iter()
            .map(|(status, count)| json!({ "status": status, "campaigns": count }))
            .collect();
        let value = json!({
            "fetchedAt": dataset.fetched_at,
            "campaignCount": stats.campaign_count,
            "totalLeads": stats.total_leads,
            "totalContacted": stats.total_contacted,
            "totalReplies": stats.total_replies,
            "totalUnread": stats.total_unread,
            "replyRate": stats.reply_rate().to_string(),
            "cards": cards,
            "statuses": statuses,
            "failures": dataset.failures,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print_heading(dataset);
    println!("SUMMARY");
    for card in stats.cards() {
        println!("   {:<14} {}", format!("{}:", card.title), card.value);
    }
    println!();

    println!("CAMPAIGNS BY STATUS");
    for (status, count) in &tally {
        println!("   {:<14} {}", status, count);
    }
    println!();

    print_failures(dataset);
    Ok(())
}

// ========== Campaigns ==========

fn report_campaigns(rows: &[&Campaign], export: Export) -> Result<()> {
    if export == Export::Json {
        println!("{}", serde_json::to_string_pretty(rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No campaigns match the given filters.");
        return Ok(());
    }

    println!(
        "{:<8} {:<28} {:<20} {:<12} {:>7} {:>9} {:>7} {:>6} {:>7}",
        "ID", "NAME", "ACCOUNT", "STATUS", "LEADS", "CONTACTED", "REPLIES", "UNREAD", "RATE"
    );
    for c in rows {
        let rate = match &c.stats_error {
            Some(_) => "n/a".to_string(),
            None => c.reply_rate.to_string(),
        };
        println!(
            "{:<8} {:<28} {:<20} {:<12} {:>7} {:>9} {:>7} {:>6} {:>7}",
            c.id.to_string(),
            truncate(&c.name, 28),
            truncate(&c.account_name, 20),
            truncate(&c.status, 12),
            c.total_leads(),
            c.num_contacted,
            c.num_replies,
            c.num_unread,
            rate
        );
    }
    println!();
    println!("{} campaign(s)", rows.len());
    Ok(())
}

// ========== Conversations ==========

fn report_conversations(
    campaign: &Campaign,
    conversations: &[Conversation],
    export: Export,
) -> Result<()> {
    let replied = replied_conversations(conversations);

    if export == Export::Json {
        println!("{}", serde_json::to_string_pretty(&replied)?);
        return Ok(());
    }

    println!(
        "{} ({}): {} conversation(s), {} with replies",
        campaign.name,
        campaign.status,
        conversations.len(),
        replied.len()
    );
    println!();

    if replied.is_empty() {
        println!("No conversations with replies in this campaign.");
        return Ok(());
    }

    for conversation in replied {
        let unread = if conversation.read { "" } else { " [unread]" };
        println!("── {}{}", conversation.correspondent_name(), unread);
        for message in &conversation.messages {
            let who = match message.sender {
                Sender::Correspondent => "them",
                Sender::Owner => "you",
                Sender::Unknown => "?",
            };
            println!(
                "   {} {:>4}: {}",
                format_timestamp_opt(message.created_at),
                who,
                message.body_or_placeholder()
            );
        }
        println!();
    }
    Ok(())
}

// ========== Helpers ==========

fn print_heading(dataset: &Dataset) {
    println!();
    println!(
        "replyscope report, fetched {}",
        dataset
            .fetched_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
    );
    println!();
}

fn print_failures(dataset: &Dataset) {
    if !dataset.is_partial() {
        return;
    }
    println!("MISSING REPLY STATS");
    for failure in &dataset.failures {
        println!(
            "   {} ({}): {}",
            failure.campaign_name, failure.campaign_id, failure.message
        );
    }
    println!();
}
