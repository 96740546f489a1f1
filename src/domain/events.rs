use uuid::Uuid;

use crate::usecases::backend_events::BackendEvent;

use super::message::{Message, MessagePatch, Reaction};

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Tick,
    QuitRequested,
    InputKey(KeyInput),
    Backend(BackendEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    pub key: String,
    pub ctrl: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>, ctrl: bool) -> Self {
        Self {
            key: key.into(),
            ctrl,
        }
    }
}

/// A row change pushed by the realtime change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowChange {
    MessageInserted(Message),
    MessageUpdated(MessagePatch),
    MessageDeleted { id: Uuid },
    ReactionInserted(Reaction),
    ReactionDeleted { id: Uuid, message_id: Uuid },
}

impl RowChange {
    pub fn kind(&self) -> &'static str {
        match self {
            RowChange::MessageInserted(_) => "message_inserted",
            RowChange::MessageUpdated(_) => "message_updated",
            RowChange::MessageDeleted { .. } => "message_deleted",
            RowChange::ReactionInserted(_) => "reaction_inserted",
            RowChange::ReactionDeleted { .. } => "reaction_deleted",
        }
    }
}
