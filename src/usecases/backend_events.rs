use uuid::Uuid;

use crate::domain::{
    chat::ChatSummary,
    chat_session::{ReactionChange, SessionToken},
    events::RowChange,
    message::{Message, SenderProfile},
};

use super::{
    create_chat::CreateChatError, edit_message::EditMessageError, list_chats::ListChatsError,
    load_messages::LoadMessagesError, profiles::ProfileError, reactions::ReactionError,
    send_message::SendMessageError,
};

/// Results of background backend work, delivered to the shell thread.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    MessageSent {
        token: SessionToken,
        message_id: Uuid,
        result: Result<Message, SendMessageError>,
    },
    PageLoaded {
        token: SessionToken,
        page: u32,
        result: Result<Vec<Message>, LoadMessagesError>,
    },
    MessageEdited {
        token: SessionToken,
        message_id: Uuid,
        content: String,
        result: Result<(), EditMessageError>,
    },
    MessageDeleted {
        token: SessionToken,
        message_id: Uuid,
        result: Result<(), EditMessageError>,
    },
    ReactionApplied {
        token: SessionToken,
        result: Result<ReactionChange, ReactionError>,
    },
    ProfileLoaded {
        user_id: Uuid,
        result: Result<SenderProfile, ProfileError>,
    },
    ChatsLoaded {
        result: Result<Vec<ChatSummary>, ListChatsError>,
    },
    ChatCreated {
        result: Result<ChatSummary, CreateChatError>,
    },
    /// Pushed by the change feed for the chat identified by `token`.
    RowChanged {
        token: SessionToken,
        change: RowChange,
    },
    /// The change feed dropped `skipped` changes; the open chat must be reloaded.
    FeedLagged {
        token: SessionToken,
        skipped: u64,
    },
}

impl BackendEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            BackendEvent::MessageSent { .. } => "message_sent",
            BackendEvent::PageLoaded { .. } => "page_loaded",
            BackendEvent::MessageEdited { .. } => "message_edited",
            BackendEvent::MessageDeleted { .. } => "message_deleted",
            BackendEvent::ReactionApplied { .. } => "reaction_applied",
            BackendEvent::ProfileLoaded { .. } => "profile_loaded",
            BackendEvent::ChatsLoaded { .. } => "chats_loaded",
            BackendEvent::ChatCreated { .. } => "chat_created",
            BackendEvent::RowChanged { .. } => "row_changed",
            BackendEvent::FeedLagged { .. } => "feed_lagged",
        }
    }
}
