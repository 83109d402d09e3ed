//! UI rendering for the TUI.

use chrono::Local;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{
        Bar, BarChart, BarGroup, Block, BorderType, Borders, Cell, List, ListItem, Paragraph,
        Row, Scrollbar, ScrollbarOrientation, ScrollbarState, Table, Wrap,
    },
    Frame,
};
use replyscope_core::analytics::{status_tally, SortKey, SummaryStats};
use replyscope_core::format::{format_relative_time, format_timestamp_opt, truncate};
use replyscope_core::{Conversation, Message, Sender};

use crate::app::{App, ViewMode};

// ========== Standard View Colors ==========

/// Separator line color
const SEPARATOR_COLOR: Color = Color::Rgb(60, 60, 60);
/// Border color for the summary cards
const BORDER_CARDS: Color = Color::Rgb(0, 150, 150);
/// Border color for the status chart
const BORDER_STATUS: Color = Color::Rgb(180, 100, 180);
/// Border color for the message thread
const BORDER_MESSAGES: Color = Color::Rgb(80, 160, 80);
/// Label color for card titles
const LABEL_COLOR: Color = Color::Rgb(100, 180, 180);
/// Correspondent messages
const INCOMING_COLOR: Color = Color::Rgb(0, 180, 180);
/// Messages sent from the campaign account
const OUTGOING_COLOR: Color = Color::Rgb(220, 180, 0);

/// Render the application UI.
pub fn render(frame: &mut Frame, app: &mut App) {
    match app.view_mode.clone() {
        ViewMode::Dashboard => render_dashboard(frame, app),
        ViewMode::Conversations { campaign_name } => {
            render_conversation_view(frame, app, &campaign_name)
        }
    }
}

/// Render a full-screen loading message while a network task runs.
pub fn render_loading(frame: &mut Frame, message: &str) {
    let area = frame.area();
    let chunks = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(3),
        Constraint::Fill(1),
    ])
    .split(area);

    let text = if message.is_empty() { "Loading..." } else { message };
    let loading = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Cyan))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(" replyscope "),
        );
    frame.render_widget(loading, chunks[1]);
}

// ========== Dashboard ==========

/// Render the dashboard (cards, table, status chart).
fn render_dashboard(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Layout: header, cards, body, footer
    let chunks = Layout::vertical([
        Constraint::Length(2), // Header
        Constraint::Length(4), // Summary cards
        Constraint::Min(8),    // Table + status chart
        Constraint::Length(1), // Footer
    ])
    .split(area);

    render_header(frame, app, chunks[0]);
    render_cards(frame, app, chunks[1]);

    let body = Layout::horizontal([Constraint::Min(60), Constraint::Length(34)]).split(chunks[2]);

    match &app.load_error {
        Some(error) => render_empty_state(frame, error, body[0]),
        None => render_table(frame, app, body[0]),
    }
    render_status_chart(frame, app, body[1]);
    render_dashboard_footer(frame, app, chunks[3]);
}

/// Render the header with dataset freshness.
fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        " replyscope ",
        Style::default().fg(Color::Cyan).bold(),
    )];

    if let Some(dataset) = app.dataset() {
        spans.push(Span::styled("│ ", Style::default().fg(SEPARATOR_COLOR)));
        spans.push(Span::raw(format!(
            "{} campaigns across {} key(s)",
            dataset.campaigns.len(),
            app.session.keys().len()
        )));
        spans.push(Span::styled(" │ ", Style::default().fg(SEPARATOR_COLOR)));
        spans.push(Span::styled(
            format!(
                "updated {} ({})",
                dataset.fetched_at.with_timezone(&Local).format("%H:%M:%S"),
                format_relative_time(dataset.fetched_at)
            ),
            Style::default().fg(Color::DarkGray),
        ));
        if dataset.is_partial() {
            spans.push(Span::styled(" │ ", Style::default().fg(SEPARATOR_COLOR)));
            spans.push(Span::styled(
                format!("{} campaign(s) without stats", dataset.failures.len()),
                Style::default().fg(Color::Red),
            ));
        }
    }

    let header =
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, area);
}

/// Render the summary cards in one row.
fn render_cards(frame: &mut Frame, app: &App, area: Rect) {
    let stats = app
        .dataset()
        .map(|d| SummaryStats::from_campaigns(&d.campaigns))
        .unwrap_or_default();
    let cards = stats.cards();

    let constraints = vec![Constraint::Ratio(1, cards.len() as u32); cards.len()];
    let slots = Layout::horizontal(constraints).split(area);

    for (card, slot) in cards.iter().zip(slots.iter()) {
        let widget = Paragraph::new(Line::from(Span::styled(
            card.value.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER_CARDS))
                .title(Line::from(format!(" {} ", card.title)).centered())
                .title_style(Style::default().fg(LABEL_COLOR)),
        );
        frame.render_widget(widget, *slot);
    }
}

/// Render the campaign table.
fn render_table(frame: &mut Frame, app: &mut App, area: Rect) {
    let columns = [
        SortKey::Name,
        SortKey::AccountName,
        SortKey::Status,
        SortKey::TotalLeads,
        SortKey::Contacted,
        SortKey::Replies,
        SortKey::Unread,
        SortKey::ReplyRate,
    ];
    let header_cells = columns.iter().map(|key| {
        let label = if *key == app.sort_key {
            format!("{} {}", key.label(), app.sort_direction.arrow())
        } else {
            key.label().to_string()
        };
        Cell::from(label).style(Style::default().fg(Color::Yellow).bold())
    });
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .rows()
        .into_iter()
        .map(|c| {
            // Campaigns whose stats failed are dimmed with a marker
            let (rate, rate_style) = match &c.stats_error {
                Some(_) => ("n/a".to_string(), Style::default().fg(Color::Red)),
                None if c.num_replies > 0 => {
                    (c.reply_rate.to_string(), Style::default().fg(Color::Green).bold())
                }
                None => (c.reply_rate.to_string(), Style::default().fg(Color::DarkGray)),
            };
            let unread_style = if c.num_unread > 0 {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            Row::new([
                Cell::from(c.name.clone()),
                Cell::from(c.account_name.clone()),
                Cell::from(c.status.clone()),
                Cell::from(c.total_leads().to_string()),
                Cell::from(c.num_contacted.to_string()),
                Cell::from(c.num_replies.to_string()),
                Cell::from(c.num_unread.to_string()).style(unread_style),
                Cell::from(rate).style(rate_style),
            ])
        })
        .collect();
    let row_count = rows.len();

    let widths = [
        Constraint::Fill(2),    // Name (flexible)
        Constraint::Fill(1),    // Account
        Constraint::Length(13), // Status
        Constraint::Length(7),  // Leads
        Constraint::Length(11), // Contacted
        Constraint::Length(9),  // Replies
        Constraint::Length(8),  // Unread
        Constraint::Length(12), // Reply rate
    ];

    let title = format!(" Campaigns ({}) · {} ", row_count, app.account_filter_label());
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(title),
        )
        .row_highlight_style(
            Style::default()
                .add_modifier(Modifier::REVERSED)
                .fg(Color::Cyan),
        )
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(table, area, &mut app.table_state);
}

/// Render the empty state in place of the table.
fn render_empty_state(frame: &mut Frame, message: &str, area: Rect) {
    let lines = vec![
        Line::raw(""),
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::Red))),
        Line::raw(""),
        Line::from(Span::styled(
            "Press r to retry or q to quit.",
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let widget = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(" Campaigns "),
        );
    frame.render_widget(widget, area);
}

/// Render the per-status campaign counts. Hidden statuses are dimmed.
fn render_status_chart(frame: &mut Frame, app: &App, area: Rect) {
    let tally = app
        .dataset()
        .map(|d| status_tally(&d.campaigns))
        .unwrap_or_default();

    let bars: Vec<Bar> = tally
        .iter()
        .enumerate()
        .map(|(idx, (status, count))| {
            let style = if app.filter.is_status_allowed(status) {
                Style::default().fg(BORDER_STATUS)
            } else {
                Style::default().fg(SEPARATOR_COLOR)
            };
            let label = if idx < 9 {
                format!("{} {}", idx + 1, truncate(status, 14))
            } else {
                truncate(status, 16)
            };
            Bar::default()
                .value(*count as u64)
                .label(Line::from(label))
                .style(style)
                .value_style(style.add_modifier(Modifier::REVERSED))
        })
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER_STATUS))
                .title(" Status ")
                .title_style(Style::default().fg(BORDER_STATUS).bold()),
        )
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .data(BarGroup::default().bars(&bars));

    frame.render_widget(chart, area);
}

/// Render the footer for the dashboard.
fn render_dashboard_footer(frame: &mut Frame, app: &App, area: Rect) {
    let footer = Line::from(vec![
        Span::styled(" Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" replies  "),
        Span::styled("s/d", Style::default().fg(Color::Yellow)),
        Span::raw(" sort  "),
        Span::styled("a", Style::default().fg(Color::Yellow)),
        Span::raw(" account  "),
        Span::styled("1-9", Style::default().fg(Color::Yellow)),
        Span::raw(" status  "),
        Span::styled("c", Style::default().fg(Color::Yellow)),
        Span::raw(" clear  "),
        Span::styled("r", Style::default().fg(Color::Yellow)),
        Span::raw(" refresh  "),
        Span::styled("q", Style::default().fg(Color::Yellow)),
        Span::raw(" quit  "),
        Span::raw("│ "),
        Span::styled(app.status.text(), Style::default().fg(Color::DarkGray)),
    ]);

    frame.render_widget(Paragraph::new(footer), area);
}

// ========== Conversation View ==========

/// Render the conversation list and the selected thread.
fn render_conversation_view(frame: &mut Frame, app: &mut App, campaign_name: &str) {
    let area = frame.area();

    let chunks = Layout::vertical([
        Constraint::Length(2), // Header
        Constraint::Min(5),    // List + thread
        Constraint::Length(1), // Footer
    ])
    .split(area);

    let header = Paragraph::new(format!(" Conversations: {}", campaign_name))
        .style(Style::default().fg(Color::Cyan).bold())
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let body = Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(chunks[1]);

    if app.conversations.is_empty() {
        let empty = Paragraph::new("No conversations with replies in this campaign.")
            .style(Style::default().fg(Color::DarkGray))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .title(" Replies "),
            );
        frame.render_widget(empty, chunks[1]);
    } else {
        render_conversation_list(frame, app, body[0]);
        render_thread(frame, app, body[1]);
    }

    render_conversation_footer(frame, app, chunks[2]);
}

fn render_conversation_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = app
        .conversations
        .iter()
        .map(|c| conversation_item(c, width))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(format!(" Replies ({}) ", app.conversations.len())),
        )
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::REVERSED)
                .fg(Color::Cyan),
        );

    frame.render_stateful_widget(list, area, &mut app.conversation_state);
}

fn conversation_item(conversation: &Conversation, width: usize) -> ListItem<'static> {
    let name_style = if conversation.read {
        Style::default().bold()
    } else {
        Style::default().fg(Color::Yellow).bold()
    };
    ListItem::new(vec![
        Line::from(Span::styled(
            truncate(&conversation.correspondent_name(), width),
            name_style,
        )),
        Line::from(Span::styled(
            truncate(conversation.preview(), width),
            Style::default().fg(Color::DarkGray),
        )),
    ])
}

/// Render the messages of the selected conversation.
fn render_thread(frame: &mut Frame, app: &mut App, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    if let Some(conversation) = app.selected_conversation() {
        let name = conversation.correspondent_name();
        for (idx, message) in conversation.messages.iter().enumerate() {
            if idx > 0 {
                lines.push(Line::raw(""));
            }
            lines.extend(format_message(message, &name));
        }
        if conversation.messages.is_empty() {
            lines.push(Line::from(Span::styled(
                "No messages found for this conversation.",
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    // Clamp scroll offset
    let visible = area.height.saturating_sub(2) as usize;
    let max_scroll = lines.len().saturating_sub(visible);
    if app.scroll_offset > max_scroll {
        app.scroll_offset = max_scroll;
    }

    let line_count = lines.len();
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(BORDER_MESSAGES))
                .title(" Messages ")
                .title_style(Style::default().fg(BORDER_MESSAGES).bold()),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset as u16, 0));

    frame.render_widget(paragraph, area);

    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("↑"))
        .end_symbol(Some("↓"));
    let mut scrollbar_state = ScrollbarState::new(line_count).position(app.scroll_offset);

    frame.render_stateful_widget(
        scrollbar,
        area.inner(ratatui::layout::Margin {
            vertical: 1,
            horizontal: 0,
        }),
        &mut scrollbar_state,
    );
}

/// Format a single message: correspondent messages on the left, our own on
/// the right.
fn format_message(message: &Message, correspondent: &str) -> Vec<Line<'static>> {
    let (label, color, alignment) = match message.sender {
        Sender::Correspondent => (correspondent.to_string(), INCOMING_COLOR, Alignment::Left),
        Sender::Owner => ("You".to_string(), OUTGOING_COLOR, Alignment::Right),
        Sender::Unknown => ("Unknown sender".to_string(), Color::DarkGray, Alignment::Left),
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(label, Style::default().fg(color).bold()),
        Span::styled(
            format!("  {}", format_timestamp_opt(message.created_at)),
            Style::default().fg(Color::DarkGray),
        ),
    ])
    .alignment(alignment)];

    for text in message.body_or_placeholder().lines() {
        lines.push(Line::from(text.to_string()).alignment(alignment));
    }
    lines
}

/// Render the footer for the conversation view.
fn render_conversation_footer(frame: &mut Frame, app: &App, area: Rect) {
    let footer = Line::from(vec![
        Span::styled(" Esc", Style::default().fg(Color::Yellow)),
        Span::raw(" back  "),
        Span::styled("j/k", Style::default().fg(Color::Yellow)),
        Span::raw(" conversation  "),
        Span::styled("u/d", Style::default().fg(Color::Yellow)),
        Span::raw(" scroll  "),
        Span::styled("g/G", Style::default().fg(Color::Yellow)),
        Span::raw(" top/bottom  "),
        Span::raw("│ "),
        Span::styled(app.status.text(), Style::default().fg(Color::DarkGray)),
    ]);

    frame.render_widget(Paragraph::new(footer), area);
}
