//! Message list rendering logic.
//!
//! Handles visual formatting of messages including:
//! - Sender grouping (consecutive messages from same sender show name only once)
//! - Date separators between messages from different days
//! - Delivery marks for pending and failed sends
//! - Reaction counts and the edited tag

use chrono::{DateTime, Local, NaiveDate, Utc};
use ratatui::{
    layout::Alignment,
    text::{Line, Span},
    widgets::ListItem,
};
use uuid::Uuid;

use crate::domain::message::{DeliveryState, Message};

use super::styles;

const OWN_SENDER_LABEL: &str = "You";
const PENDING_MARK: &str = "…";
const FAILED_MARK: &str = "!";
const EDITED_TAG: &str = "(edited)";
/// Width of the time column plus the gap after it.
const INDENT: &str = "      ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMark {
    None,
    Pending,
    Failed,
}

impl DeliveryMark {
    fn from_state(state: &DeliveryState) -> Self {
        match state {
            DeliveryState::Pending => DeliveryMark::Pending,
            DeliveryState::Confirmed => DeliveryMark::None,
            DeliveryState::Failed { .. } => DeliveryMark::Failed,
        }
    }
}

/// Represents a visual element in the messages list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageListElement {
    /// Date separator line (e.g., "——— 14 Feb 2026 ———").
    DateSeparator(String),
    Message {
        time: String,
        /// Set only on the first message of a sender group.
        sender: Option<String>,
        own: bool,
        content: String,
        mark: DeliveryMark,
        edited: bool,
        /// Already formatted, e.g. "🔥 2  👍 1".
        reactions: Option<String>,
    },
}

/// Builds a list of visual elements from messages in chronological order.
pub fn build_message_list_elements(messages: &[Message], own_id: Uuid) -> Vec<MessageListElement> {
    let mut elements = Vec::new();
    let mut prev_date: Option<NaiveDate> = None;
    let mut prev_sender: Option<Uuid> = None;

    for message in messages {
        let local = to_local(message.created_at);
        let msg_date = local.date_naive();

        if prev_date != Some(msg_date) {
            elements.push(MessageListElement::DateSeparator(format_date(msg_date)));
            prev_sender = None;
        }

        let own = message.sender_id == own_id;
        let sender = (prev_sender != Some(message.sender_id)).then(|| {
            if own {
                OWN_SENDER_LABEL.to_owned()
            } else {
                message.sender_name()
            }
        });

        elements.push(MessageListElement::Message {
            time: local.format("%H:%M").to_string(),
            sender,
            own,
            content: message.display_content(),
            mark: DeliveryMark::from_state(&message.delivery),
            edited: message.is_edited && !message.is_recalled,
            reactions: format_reactions(message),
        });

        prev_date = Some(msg_date);
        prev_sender = Some(message.sender_id);
    }

    elements
}

/// Finds the element index of the `message_index`-th message, skipping separators.
pub fn message_index_to_element_index(
    elements: &[MessageListElement],
    message_index: usize,
) -> Option<usize> {
    elements
        .iter()
        .enumerate()
        .filter(|(_, element)| matches!(element, MessageListElement::Message { .. }))
        .nth(message_index)
        .map(|(index, _)| index)
}

pub fn element_to_list_item(element: &MessageListElement) -> ListItem<'static> {
    match element {
        MessageListElement::DateSeparator(date) => date_separator_item(date),
        MessageListElement::Message {
            time,
            sender,
            own,
            content,
            mark,
            edited,
            reactions,
        } => {
            let mut lines = Vec::new();
            if let Some(name) = sender {
                lines.push(header_line(time, name, *own));
            }

            let mut content_lines = content.lines();
            let first = content_lines.next().unwrap_or_default();
            let lead = if sender.is_some() {
                Span::raw(INDENT.to_owned())
            } else {
                Span::styled(format!("{time:>5} "), styles::message_time_style())
            };
            let mut spans = vec![lead];
            spans.extend(content_spans(first));
            lines.push(Line::from(spans));

            for text_line in content_lines {
                let mut spans = vec![Span::raw(INDENT.to_owned())];
                spans.extend(content_spans(text_line));
                lines.push(Line::from(spans));
            }

            if let Some(last) = lines.last_mut() {
                append_trailer(last, *mark, *edited);
            }

            if let Some(reactions) = reactions {
                lines.push(Line::from(vec![
                    Span::raw(INDENT.to_owned()),
                    Span::styled(reactions.clone(), styles::reaction_style()),
                ]));
            }

            ListItem::new(lines)
        }
    }
}

fn date_separator_item(date: &str) -> ListItem<'static> {
    let line = Line::from(vec![Span::styled(
        format!("——— {date} ———"),
        styles::date_separator_style(),
    )])
    .alignment(Alignment::Center);
    ListItem::new(vec![Line::default(), line])
}

fn header_line(time: &str, sender: &str, own: bool) -> Line<'static> {
    let sender_style = if own {
        styles::own_sender_style()
    } else {
        styles::message_sender_style()
    };

    Line::from(vec![
        Span::styled(format!("{time:>5} "), styles::message_time_style()),
        Span::styled(format!("{sender}:"), sender_style),
    ])
}

fn append_trailer(line: &mut Line<'static>, mark: DeliveryMark, edited: bool) {
    if edited {
        line.spans.push(Span::raw(" "));
        line.spans
            .push(Span::styled(EDITED_TAG, styles::edited_tag_style()));
    }

    match mark {
        DeliveryMark::None => {}
        DeliveryMark::Pending => {
            line.spans.push(Span::raw(" "));
            line.spans
                .push(Span::styled(PENDING_MARK, styles::pending_mark_style()));
        }
        DeliveryMark::Failed => {
            line.spans.push(Span::raw(" "));
            line.spans.push(Span::styled(
                format!("{FAILED_MARK} not sent, r: retry x: discard"),
                styles::failed_mark_style(),
            ));
        }
    }
}

/// Highlights a leading bracketed indicator like [Image] or [Message recalled].
fn content_spans(text: &str) -> Vec<Span<'static>> {
    if text.starts_with('[') {
        if let Some(end) = text.find(']') {
            let indicator = &text[..=end];
            let rest = text[end + 1..].trim_start();

            let mut spans = vec![Span::styled(
                indicator.to_owned(),
                styles::message_media_style(),
            )];
            if !rest.is_empty() {
                spans.push(Span::raw(" "));
                spans.push(Span::styled(rest.to_owned(), styles::message_text_style()));
            }
            return spans;
        }
    }

    if text.is_empty() {
        return vec![Span::styled("[Empty message]", styles::message_media_style())];
    }

    vec![Span::styled(text.to_owned(), styles::message_text_style())]
}

fn format_reactions(message: &Message) -> Option<String> {
    let summary = message.reaction_summary();
    if summary.is_empty() {
        return None;
    }

    Some(
        summary
            .iter()
            .map(|(emoji, count)| format!("{emoji} {count}"))
            .collect::<Vec<_>>()
            .join("  "),
    )
}

fn to_local(at: DateTime<Utc>) -> DateTime<Local> {
    at.with_timezone(&Local)
}

fn format_date(date: NaiveDate) -> String {
    date.format("%-d %b %Y").to_string()
}
