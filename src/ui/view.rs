use chrono::{DateTime, Local, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::domain::{
    chat::{ChatKind, ChatSummary},
    chat_list_state::ChatListUiState,
    notices::{Notice, NoticeLevel},
    shell_state::{ActivePane, ShellState},
};

use super::message_input::render_message_input;
use super::message_rendering::{
    build_message_list_elements, element_to_list_item, message_index_to_element_index,
};
use super::styles;

pub fn render(frame: &mut Frame<'_>, state: &ShellState) {
    let [content_area, status_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .areas(frame.area());

    let [chats_area, messages_with_input_area] = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .areas(content_area);

    // 1 border + 1 text + 1 border
    let [messages_area, input_area] = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .areas(messages_with_input_area);

    let active_pane = state.active_pane();
    render_chat_list_panel(frame, chats_area, state, active_pane);
    render_messages_panel(frame, messages_area, state, active_pane);
    render_message_input(frame, input_area, state.message_input(), active_pane);

    frame.render_widget(Paragraph::new(status_line(state)), status_area);
}

fn border_style(is_active: bool) -> Style {
    if is_active {
        styles::active_panel_border_style()
    } else {
        styles::inactive_panel_border_style()
    }
}

fn panel(title: String, is_active: bool) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style(is_active))
}

fn render_chat_list_panel(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &ShellState,
    active_pane: ActivePane,
) {
    let is_active = active_pane == ActivePane::ChatList;
    let chat_list = state.chat_list();

    let placeholder = match chat_list.ui_state() {
        ChatListUiState::Loading => Some("Loading chats..."),
        ChatListUiState::Empty => Some("No chats yet. Press R to refresh."),
        ChatListUiState::Error => Some("Failed to load chats. Press R to retry."),
        ChatListUiState::Ready => None,
    };
    if let Some(text) = placeholder {
        frame.render_widget(
            Paragraph::new(text).block(panel("Chats".to_owned(), is_active)),
            area,
        );
        return;
    }

    let chats = chat_list.chats();
    let inner_width = area.width.saturating_sub(2) as usize;
    let open_chat = state.session().chat_id();
    let items: Vec<ListItem<'static>> = chats
        .iter()
        .map(|chat| {
            ListItem::new(chat_list_item_line(
                chat,
                inner_width,
                open_chat == Some(chat.chat_id()),
            ))
        })
        .collect();

    let list = List::new(items)
        .block(panel(format!("Chats ({})", chats.len()), is_active))
        .highlight_style(styles::selection_style());

    let mut list_state = ListState::default();
    list_state.select(chat_list.selected_index());
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn kind_marker(kind: ChatKind) -> &'static str {
    match kind {
        ChatKind::Private => "@",
        ChatKind::Group => "#",
        ChatKind::Team => "T",
    }
}

fn chat_list_item_line(chat: &ChatSummary, width: usize, is_open: bool) -> Line<'static> {
    let timestamp = chat
        .last_message_at
        .map(format_chat_timestamp)
        .unwrap_or_else(|| "     ".to_owned());

    let preview = chat
        .last_message_preview
        .as_deref()
        .map(normalize_preview_for_chat_row)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "No messages yet".to_owned());

    let open_marker = if is_open { "*" } else { " " };

    // timestamp (5) + " | " (3) + kind marker and space (2) + open marker (1)
    let fixed_len = 5 + 3 + 2 + 1;
    let name_len = chat.title().chars().count();
    let available = width.saturating_sub(fixed_len + name_len + 1);

    let preview_chars: Vec<char> = preview.chars().collect();
    let display_preview = if preview_chars.len() <= available {
        preview
    } else {
        let truncated: String = preview_chars
            .iter()
            .take(available.saturating_sub(3))
            .collect();
        format!("{truncated}...")
    };

    Line::from(vec![
        Span::styled(format!("{timestamp:>5}"), styles::timestamp_style()),
        Span::styled(" | ", styles::separator_style()),
        Span::styled(
            format!("{} ", kind_marker(chat.chat.kind)),
            styles::chat_kind_style(),
        ),
        Span::styled(chat.title().to_owned(), styles::chat_name_style()),
        Span::raw(open_marker),
        Span::raw(" "),
        Span::styled(display_preview, styles::chat_preview_style()),
    ])
}

fn format_chat_timestamp(at: DateTime<Utc>) -> String {
    let local = at.with_timezone(&Local);

    if local.date_naive() == Local::now().date_naive() {
        local.format("%H:%M").to_string()
    } else {
        local.format("%d.%m").to_string()
    }
}

fn normalize_preview_for_chat_row(preview: &str) -> String {
    preview.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_messages_panel(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &ShellState,
    active_pane: ActivePane,
) {
    let is_active = active_pane == ActivePane::Messages;
    let title = messages_title(state);
    let session = state.session();

    if session.chat_id().is_none() {
        frame.render_widget(
            Paragraph::new("Select a chat to view messages").block(panel(title, is_active)),
            area,
        );
        return;
    }

    let messages = session.snapshot();
    if messages.is_empty() {
        let text = if session.is_loading_page() {
            "Loading messages..."
        } else {
            "No messages in this chat"
        };
        frame.render_widget(Paragraph::new(text).block(panel(title, is_active)), area);
        return;
    }

    let elements = build_message_list_elements(&messages, session.user_id());
    let items: Vec<ListItem<'static>> = elements.iter().map(element_to_list_item).collect();

    let selected_index = state
        .selected_message()
        .and_then(|id| messages.iter().position(|m| m.id == id));
    let element_index =
        selected_index.and_then(|index| message_index_to_element_index(&elements, index));

    let mut list = List::new(items).block(panel(title, is_active));
    if is_active {
        list = list.highlight_style(styles::selection_style());
    }

    let mut list_state = ListState::default();
    list_state.select(element_index);
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn messages_title(state: &ShellState) -> String {
    let session = state.session();
    let Some(chat_id) = session.chat_id() else {
        return "Messages".to_owned();
    };

    let name = state
        .chat_list()
        .find(chat_id)
        .map(|chat| chat.title().to_owned())
        .unwrap_or_else(|| "chat".to_owned());

    let history = if session.is_loading_page() {
        " (loading older...)"
    } else if session.has_more() {
        " (u: older)"
    } else {
        ""
    };
    format!("Messages: {name}{history}")
}

fn status_line(state: &ShellState) -> Line<'static> {
    let mut spans = Vec::new();

    if !state.is_link_up() {
        spans.push(Span::styled(" OFFLINE ", styles::link_down_style()));
        spans.push(Span::raw(" "));
    }

    if let Some(notice) = state.session().notices().latest() {
        spans.push(notice_span(notice));
        spans.push(Span::raw(" | "));
    }

    let nav_hint = match state.active_pane() {
        ActivePane::ChatList => "j/k: navigate | Enter: open | R: refresh | Ctrl+O: link | q: quit",
        ActivePane::Messages => {
            "j/k: select | i: compose | e: edit | d: delete | +: react | u: older | r/x: retry/discard"
        }
        ActivePane::MessageInput => "Enter: send | Esc: cancel | Tab: messages",
    };
    spans.push(Span::raw(nav_hint));

    Line::from(spans)
}

fn notice_span(notice: &Notice) -> Span<'static> {
    let style = match notice.level {
        NoticeLevel::Info => styles::notice_info_style(),
        NoticeLevel::Error => styles::notice_error_style(),
    };
    Span::styled(notice.text.clone(), style)
}
