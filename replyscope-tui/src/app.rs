//! Application state for the TUI.

use std::sync::{Arc, Mutex};

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::widgets::{ListState, TableState};
use replyscope_core::analytics::{
    self, account_options, status_options, AccountOption, CampaignFilter, SortDirection, SortKey,
};
use replyscope_core::api::HttpTransport;
use replyscope_core::types::replied_conversations;
use replyscope_core::{Aggregator, Campaign, Conversation, Dataset, Error, Session};

/// Current view mode
#[derive(Debug, Clone, Default)]
pub enum ViewMode {
    /// Summary cards, status chart and campaign table
    #[default]
    Dashboard,
    /// Replied conversations of one campaign
    Conversations { campaign_name: String },
}

/// Work that needs the network. The main loop runs it while drawing a
/// loading screen, then hands the outcome back to the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Refresh,
    OpenConversations {
        campaign_id: String,
        campaign_name: String,
    },
}

/// Latest progress message, shared with the aggregator's progress sink.
#[derive(Debug, Clone, Default)]
pub struct StatusLine(Arc<Mutex<String>>);

impl StatusLine {
    pub fn set(&self, text: impl Into<String>) {
        if let Ok(mut guard) = self.0.lock() {
            *guard = text.into();
        }
    }

    pub fn text(&self) -> String {
        self.0.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

/// Main application state.
pub struct App {
    /// Keys and the current dataset
    pub session: Session,
    /// Pipeline used for refreshes and conversation fetches
    pub aggregator: Aggregator<HttpTransport>,
    /// Runtime the network tasks are driven on
    pub runtime: tokio::runtime::Runtime,
    /// Progress and result messages for the footer
    pub status: StatusLine,
    /// Current view mode
    pub view_mode: ViewMode,
    /// Campaign table filter
    pub filter: CampaignFilter,
    pub sort_key: SortKey,
    pub sort_direction: SortDirection,
    /// Campaign table selection state
    pub table_state: TableState,
    /// Replied conversations for the conversation view
    pub conversations: Vec<Conversation>,
    /// Conversation list selection state
    pub conversation_state: ListState,
    /// Scroll offset for the message thread
    pub scroll_offset: usize,
    /// Error from the last refresh, shown in place of the table
    pub load_error: Option<String>,
    /// Network task requested by the last key press
    pub pending: Option<Task>,
    /// Whether the app should exit
    pub should_quit: bool,
}

impl App {
    pub fn new(
        session: Session,
        aggregator: Aggregator<HttpTransport>,
        runtime: tokio::runtime::Runtime,
        status: StatusLine,
    ) -> Self {
        Self {
            session,
            aggregator,
            runtime,
            status,
            view_mode: ViewMode::default(),
            filter: CampaignFilter::default(),
            sort_key: SortKey::default(),
            sort_direction: SortDirection::default(),
            table_state: TableState::default(),
            conversations: Vec::new(),
            conversation_state: ListState::default(),
            scroll_offset: 0,
            load_error: None,
            pending: None,
            should_quit: false,
        }
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.session.dataset()
    }

    /// Campaign rows after filtering and sorting.
    pub fn rows(&self) -> Vec<&Campaign> {
        match self.dataset() {
            Some(d) => analytics::apply(&d.campaigns, &self.filter, self.sort_key, self.sort_direction),
            None => Vec::new(),
        }
    }

    pub fn statuses(&self) -> Vec<String> {
        self.dataset()
            .map(|d| status_options(&d.campaigns))
            .unwrap_or_default()
    }

    pub fn accounts(&self) -> Vec<AccountOption> {
        self.dataset()
            .map(|d| account_options(&d.campaigns))
            .unwrap_or_default()
    }

    /// Display name of the active account filter.
    pub fn account_filter_label(&self) -> String {
        match &self.filter.account_id {
            None => "all accounts".to_string(),
            Some(id) => self
                .accounts()
                .into_iter()
                .find(|o| o.id.matches(id))
                .map(|o| o.name)
                .unwrap_or_else(|| id.clone()),
        }
    }

    pub fn selected_conversation(&self) -> Option<&Conversation> {
        self.conversation_state
            .selected()
            .and_then(|i| self.conversations.get(i))
    }

    // ========== Task Results ==========

    /// Record the outcome of a refresh.
    pub fn finish_refresh(&mut self, outcome: replyscope_core::Result<()>) {
        match outcome {
            Ok(()) => {
                self.load_error = None;
                let (campaigns, failures) = self
                    .dataset()
                    .map(|d| (d.campaigns.len(), d.failures.len()))
                    .unwrap_or((0, 0));
                if failures == 0 {
                    self.status.set(format!("Loaded {} campaign(s)", campaigns));
                } else {
                    self.status.set(format!(
                        "Loaded {} campaign(s); {} without reply stats",
                        campaigns, failures
                    ));
                }
                self.clamp_selection();
            }
            Err(Error::NoCampaigns) => {
                self.load_error =
                    Some("No campaigns found. Check that your API keys are valid.".to_string());
                self.status.set("No campaigns");
                self.table_state.select(None);
            }
            Err(e) => {
                tracing::error!(error = %e, "Refresh failed");
                self.load_error = Some(e.to_string());
                self.status.set("Refresh failed");
                self.table_state.select(None);
            }
        }
    }

    /// Switch to the conversation view with the fetched conversations.
    pub fn finish_conversations(
        &mut self,
        campaign_name: String,
        outcome: replyscope_core::Result<Vec<Conversation>>,
    ) {
        match outcome {
            Ok(all) => {
                self.conversations = replied_conversations(&all).into_iter().cloned().collect();
                self.conversation_state
                    .select((!self.conversations.is_empty()).then_some(0));
                self.scroll_offset = 0;
                self.status.set(format!(
                    "{} conversation(s), {} with replies",
                    all.len(),
                    self.conversations.len()
                ));
                self.view_mode = ViewMode::Conversations { campaign_name };
            }
            Err(e) => {
                tracing::warn!(campaign = %campaign_name, error = %e, "Conversation fetch failed");
                self.status.set(format!("Could not load conversations: {}", e));
            }
        }
    }

    // ========== Key Handling ==========

    /// Handle keyboard input.
    pub fn handle_key(&mut self, key: KeyEvent) {
        match &self.view_mode {
            ViewMode::Dashboard => self.handle_dashboard_key(key),
            ViewMode::Conversations { .. } => self.handle_conversation_key(key),
        }
    }

    /// Handle keyboard input in the dashboard.
    fn handle_dashboard_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char('r') => {
                self.pending = Some(Task::Refresh);
            }
            KeyCode::Enter => {
                self.open_conversations();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.select_next();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.select_previous();
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.select_first();
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.select_last();
            }
            KeyCode::Char('s') => {
                self.sort_key = self.sort_key.next();
                self.status.set(format!("Sorted by {}", self.sort_key));
            }
            KeyCode::Char('d') => {
                self.sort_direction = self.sort_direction.toggle();
            }
            KeyCode::Char('a') => {
                let options = self.accounts();
                self.filter.cycle_account(&options);
                self.status
                    .set(format!("Showing {}", self.account_filter_label()));
                self.clamp_selection();
            }
            KeyCode::Char('c') => {
                self.filter = CampaignFilter::default();
                self.status.set("Filters cleared");
                self.clamp_selection();
            }
            KeyCode::Char(digit @ '1'..='9') => {
                self.toggle_status(digit as usize - '1' as usize);
            }
            _ => {}
        }
    }

    /// Handle keyboard input in the conversation view.
    fn handle_conversation_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.close_conversations();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.select_conversation(1);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.select_conversation(-1);
            }
            KeyCode::PageDown | KeyCode::Char('d') => {
                self.scroll_offset = self.scroll_offset.saturating_add(10);
            }
            KeyCode::PageUp | KeyCode::Char('u') => {
                self.scroll_offset = self.scroll_offset.saturating_sub(10);
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.scroll_offset = 0;
            }
            KeyCode::End | KeyCode::Char('G') => {
                // Clamped during rendering
                self.scroll_offset = usize::MAX / 2;
            }
            _ => {}
        }
    }

    fn open_conversations(&mut self) {
        let task = self
            .table_state
            .selected()
            .and_then(|i| self.rows().get(i).copied())
            .map(|c| Task::OpenConversations {
                campaign_id: c.id.to_string(),
                campaign_name: c.name.clone(),
            });
        if task.is_some() {
            self.pending = task;
        }
    }

    fn close_conversations(&mut self) {
        self.view_mode = ViewMode::Dashboard;
        self.conversations.clear();
        self.conversation_state.select(None);
        self.scroll_offset = 0;
    }

    fn toggle_status(&mut self, idx: usize) {
        let statuses = self.statuses();
        if let Some(status) = statuses.get(idx) {
            self.filter.toggle_status(status, &statuses);
            let state = if self.filter.is_status_allowed(status) {
                "shown"
            } else {
                "hidden"
            };
            self.status.set(format!("{} {}", status, state));
            self.clamp_selection();
        }
    }

    fn select_conversation(&mut self, delta: isize) {
        let len = self.conversations.len();
        if len == 0 {
            return;
        }
        let current = self.conversation_state.selected().unwrap_or(0);
        self.conversation_state
            .select(Some(wrap_index(current, delta, len)));
        self.scroll_offset = 0;
    }

    /// Keep the table selection inside the filtered rows.
    fn clamp_selection(&mut self) {
        let len = self.rows().len();
        let selected = match self.table_state.selected() {
            _ if len == 0 => None,
            Some(i) => Some(i.min(len - 1)),
            None => Some(0),
        };
        self.table_state.select(selected);
    }

    /// Select the next row in the table.
    fn select_next(&mut self) {
        let len = self.rows().len();
        if len == 0 {
            return;
        }
        let current = self.table_state.selected().unwrap_or(len - 1);
        self.table_state.select(Some(wrap_index(current, 1, len)));
    }

    /// Select the previous row in the table.
    fn select_previous(&mut self) {
        let len = self.rows().len();
        if len == 0 {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0);
        self.table_state.select(Some(wrap_index(current, -1, len)));
    }

    /// Select the first row.
    fn select_first(&mut self) {
        if !self.rows().is_empty() {
            self.table_state.select(Some(0));
        }
    }

    /// Select the last row.
    fn select_last(&mut self) {
        let len = self.rows().len();
        if len > 0 {
            self.table_state.select(Some(len - 1));
        }
    }
}

/// Move `current` by `delta` within `0..len`, wrapping at both ends.
fn wrap_index(current: usize, delta: isize, len: usize) -> usize {
    let len = len as isize;
    ((current as isize + delta).rem_euclid(len)) as usize
}
