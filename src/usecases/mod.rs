//! Use case layer: application workflows and orchestration.

pub mod backend_events;
pub mod bootstrap;
pub mod chat_controller;
pub mod context;
pub mod contracts;
pub mod create_chat;
pub mod dispatcher;
pub mod edit_message;
pub mod list_chats;
pub mod load_messages;
pub mod profiles;
pub mod reactions;
pub mod send_message;
pub mod shell;

/// Returns the usecases module name for smoke checks.
pub fn module_name() -> &'static str {
    "usecases"
}
