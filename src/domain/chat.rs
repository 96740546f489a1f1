use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Kind of conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatKind {
    /// 1-to-1 conversation between two members.
    #[default]
    Private,
    /// Ad hoc group of members.
    Group,
    /// Conversation bound to a team roster.
    Team,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Private => "private",
            ChatKind::Group => "group",
            ChatKind::Team => "team",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "private" => Some(ChatKind::Private),
            "group" => Some(ChatKind::Group),
            "team" => Some(ChatKind::Team),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantRole {
    Admin,
    Member,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub role: ParticipantRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: Uuid,
    pub name: String,
    pub kind: ChatKind,
    pub created_by: Uuid,
    pub team_id: Option<Uuid>,
    pub is_archived: bool,
    pub updated_at: DateTime<Utc>,
}

/// Chat row as returned by the chat listing RPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub chat: Chat,
    pub participant_count: usize,
    /// Preview of the newest message, if any.
    pub last_message_preview: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl ChatSummary {
    pub fn chat_id(&self) -> Uuid {
        self.chat.id
    }

    pub fn title(&self) -> &str {
        &self.chat.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_kind_parses_its_own_labels() {
        for kind in [ChatKind::Private, ChatKind::Group, ChatKind::Team] {
            assert_eq!(ChatKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ChatKind::parse("channel"), None);
    }
}
