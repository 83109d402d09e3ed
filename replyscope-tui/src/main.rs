//! replyscope - Outreach campaign reply dashboard
//!
//! Terminal UI for browsing campaigns, reply rates and replied conversations
//! across one or more API keys.

mod app;
mod ui;

use std::future::Future;
use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use indicatif::{ProgressBar, ProgressStyle};
use ratatui::{backend::CrosstermBackend, Terminal};
use replyscope_core::{Aggregator, Config, ProgressSink, Session};
use tokio::runtime::Runtime;

use crate::app::{App, StatusLine, Task};

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// How often the loading screen is redrawn while a network task runs.
const TICK: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "replyscope")]
#[command(about = "Outreach campaign reply dashboard")]
#[command(version)]
struct Args {
    /// API key to aggregate (repeat for several keys; overrides config and env)
    #[arg(long = "api-key", value_name = "KEY")]
    api_keys: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging (to file, not stdout since we have a TUI)
    let _log_guard =
        replyscope_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("replyscope TUI starting up");

    let keys = config
        .api
        .resolve_keys(&args.api_keys)
        .context("no usable API key; pass --api-key, set REPLYSCOPE_API_KEY or add api.api_keys to the config file")?;
    tracing::info!(keys = keys.len(), "Resolved API keys");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let status = StatusLine::default();
    let sink = {
        let status = status.clone();
        ProgressSink::new(move |progress| status.set(progress.to_string()))
    };
    let aggregator =
        Aggregator::from_config(&config, sink).context("failed to create API client")?;

    let mut app = App::new(Session::new(keys), aggregator, runtime, status);

    // Initial load with a spinner, before the terminal switches screens
    let outcome = initial_load(&mut app)?;
    app.finish_refresh(outcome);

    // Setup terminal
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal")?;

    // Run the main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;

    tracing::info!("replyscope TUI shutting down");

    result
}

/// First refresh, reported through an indicatif spinner on stderr.
fn initial_load(app: &mut App) -> Result<replyscope_core::Result<()>> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message("Connecting...");
    spinner.enable_steady_tick(TICK);

    let status = app.status.clone();
    let session = &mut app.session;
    let aggregator = &app.aggregator;
    let outcome = drive(
        &app.runtime,
        async { session.refresh(aggregator).await.map(|_| ()) },
        || {
            spinner.set_message(status.text());
            Ok(())
        },
    );

    spinner.finish_and_clear();
    outcome
}

/// Run the main application loop.
fn run_app(terminal: &mut Term, app: &mut App) -> Result<()> {
    loop {
        // Render
        terminal.draw(|frame| ui::render(frame, app))?;

        // Handle events
        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if let Some(task) = app.pending.take() {
            run_task(terminal, app, task)?;
        }

        // Check if we should quit
        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Run a network task while showing the loading screen, then hand the
/// outcome to the app.
fn run_task(terminal: &mut Term, app: &mut App, task: Task) -> Result<()> {
    let status = app.status.clone();
    let redraw = |terminal: &mut Term| -> Result<()> {
        terminal
            .draw(|frame| ui::render_loading(frame, &status.text()))
            .context("failed to draw loading screen")?;
        Ok(())
    };

    match task {
        Task::Refresh => {
            tracing::info!("Refreshing dataset");
            status.set("Refreshing...");
            let session = &mut app.session;
            let aggregator = &app.aggregator;
            let outcome = drive(
                &app.runtime,
                async { session.refresh(aggregator).await.map(|_| ()) },
                || redraw(terminal),
            )?;
            app.finish_refresh(outcome);
        }
        Task::OpenConversations {
            campaign_id,
            campaign_name,
        } => {
            tracing::info!(campaign = %campaign_id, "Opening conversations");
            status.set(format!("Loading conversations for {}...", campaign_name));
            let session = &app.session;
            let aggregator = &app.aggregator;
            let outcome = drive(
                &app.runtime,
                session.conversations(aggregator, &campaign_id),
                || redraw(terminal),
            )?;
            app.finish_conversations(campaign_name, outcome);
        }
    }

    Ok(())
}

/// Block on `fut`, calling `on_tick` every [`TICK`] until it completes.
fn drive<F: Future>(
    runtime: &Runtime,
    fut: F,
    mut on_tick: impl FnMut() -> Result<()>,
) -> Result<F::Output> {
    runtime.block_on(async {
        tokio::pin!(fut);
        let mut ticker = tokio::time::interval(TICK);
        loop {
            tokio::select! {
                out = &mut fut => break Ok(out),
                _ = ticker.tick() => {
                    if let Err(e) = on_tick() {
                        break Err(e);
                    }
                }
            }
        }
    })
}
