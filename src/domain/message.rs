use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Kind of content carried by a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    Video,
    File,
    Audio,
}

impl MessageKind {
    /// Returns a display label for media kinds, or None for plain text.
    pub fn display_label(&self) -> Option<&'static str> {
        match self {
            MessageKind::Text => None,
            MessageKind::Image => Some("[Image]"),
            MessageKind::Video => Some("[Video]"),
            MessageKind::File => Some("[File]"),
            MessageKind::Audio => Some("[Audio]"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Video => "video",
            MessageKind::File => "file",
            MessageKind::Audio => "audio",
        }
    }
}

/// Reference to an uploaded attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub url: String,
    pub file_name: Option<String>,
    pub size_bytes: Option<u64>,
    pub mime_type: Option<String>,
}

/// Where a message stands relative to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeliveryState {
    /// Rendered locally, insert not yet acknowledged.
    Pending,
    /// Acknowledged by the backend or delivered by the change feed.
    #[default]
    Confirmed,
    /// Insert rejected; the message stays visible for a retry.
    Failed { reason: String },
}

impl DeliveryState {
    pub fn is_pending(&self) -> bool {
        matches!(self, DeliveryState::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DeliveryState::Failed { .. })
    }
}

/// A prior version of a message's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRecord {
    pub content: Option<String>,
    pub replaced_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub id: Uuid,
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

/// Display data for the author of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderProfile {
    pub user_id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub content: Option<String>,
    pub kind: MessageKind,
    pub media: Option<MediaRef>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub is_recalled: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub edit_history: Vec<EditRecord>,
    pub reactions: Vec<Reaction>,
    pub sender: Option<SenderProfile>,
    pub delivery: DeliveryState,
}

impl Message {
    /// Builds a confirmed text message the way a freshly fetched row looks.
    pub fn text(
        id: Uuid,
        chat_id: Uuid,
        sender_id: Uuid,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            chat_id,
            sender_id,
            content: Some(content.into()),
            kind: MessageKind::Text,
            media: None,
            is_edited: false,
            edited_at: None,
            is_recalled: false,
            is_archived: false,
            created_at,
            edit_history: Vec::new(),
            reactions: Vec::new(),
            sender: None,
            delivery: DeliveryState::Confirmed,
        }
    }

    /// Returns the display content: media label + text, or just text if no media.
    pub fn display_content(&self) -> String {
        if self.is_recalled {
            return "[Message recalled]".to_owned();
        }

        let text = self.content.as_deref().unwrap_or_default();
        match (self.kind.display_label(), text.is_empty()) {
            (Some(label), true) => match self.media.as_ref().and_then(|m| m.file_name.as_deref()) {
                Some(name) => format!("{label} {name}"),
                None => label.to_owned(),
            },
            (Some(label), false) => format!("{label} {text}"),
            (None, _) => text.to_owned(),
        }
    }

    /// Display name of the sender, falling back to a short id.
    pub fn sender_name(&self) -> String {
        match &self.sender {
            Some(profile) => profile.display_name.clone(),
            None => short_id(self.sender_id),
        }
    }

    /// Reactions folded into `(emoji, count)` pairs in first-seen order.
    pub fn reaction_summary(&self) -> Vec<(String, usize)> {
        let mut summary: Vec<(String, usize)> = Vec::new();
        for reaction in &self.reactions {
            match summary.iter_mut().find(|(emoji, _)| *emoji == reaction.emoji) {
                Some((_, count)) => *count += 1,
                None => summary.push((reaction.emoji.clone(), 1)),
            }
        }
        summary
    }

    /// Adds a reaction unless one with the same id is already attached.
    pub fn attach_reaction(&mut self, reaction: Reaction) -> bool {
        if self.reactions.iter().any(|r| r.id == reaction.id) {
            return false;
        }
        self.reactions.push(reaction);
        true
    }

    pub fn detach_reaction(&mut self, reaction_id: Uuid) -> bool {
        let before = self.reactions.len();
        self.reactions.retain(|r| r.id != reaction_id);
        before != self.reactions.len()
    }

    pub fn reaction_by(&self, user_id: Uuid, emoji: &str) -> Option<&Reaction> {
        self.reactions
            .iter()
            .find(|r| r.user_id == user_id && r.emoji == emoji)
    }
}

/// Mutable columns carried by an update event on the messages table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePatch {
    pub id: Uuid,
    pub content: Option<String>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub is_recalled: bool,
    pub is_archived: bool,
}

pub fn short_id(id: Uuid) -> String {
    let mut text = id.simple().to_string();
    text.truncate(8);
    text
}
