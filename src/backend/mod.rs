//! Backend integration layer: the hosted table/RPC/realtime service seen from the client.

pub mod change_feed;
pub mod local;
pub mod seed;

use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    domain::events::RowChange,
    usecases::{
        create_chat::ChatCreator, edit_message::MessageEditor, list_chats::ChatsSource,
        load_messages::MessagesSource, profiles::ProfileSource, reactions::ReactionWriter,
        send_message::MessageSender,
    },
};

/// Failure reported by the backend for any table, RPC or feed call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Row-level access control refused the call.
    #[error("not authorized")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Network or service outage.
    #[error("backend unavailable")]
    Unavailable,
    /// A row failed to decode into the local shape.
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// Validation or constraint failure on the server side.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// A row change tagged with the chat it belongs to, as published on the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEnvelope {
    pub chat_id: Uuid,
    pub change: RowChange,
}

/// Realtime change feed over the chat tables.
pub trait ChangeFeed {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEnvelope>;
}

/// Switch for the connection to the backend; used to simulate going offline.
pub trait LinkControl {
    fn set_link_up(&self, up: bool);
    fn is_link_up(&self) -> bool;
}

/// Everything the chat client needs from the backend.
pub trait ChatBackend:
    MessageSender
    + MessagesSource
    + MessageEditor
    + ReactionWriter
    + ProfileSource
    + ChatsSource
    + ChatCreator
    + ChangeFeed
    + LinkControl
    + Send
    + Sync
    + 'static
{
}

impl<T> ChatBackend for T where
    T: MessageSender
        + MessagesSource
        + MessageEditor
        + ReactionWriter
        + ProfileSource
        + ChatsSource
        + ChatCreator
        + ChangeFeed
        + LinkControl
        + Send
        + Sync
        + 'static
{
}

/// Returns the backend module name for smoke checks.
pub fn module_name() -> &'static str {
    "backend"
}
