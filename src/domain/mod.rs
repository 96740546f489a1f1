//! Domain layer: core entities and business rules.

pub mod chat;
pub mod chat_list_state;
pub mod chat_session;
pub mod events;
pub mod message;
pub mod message_cache;
pub mod message_input_state;
pub mod notices;
pub mod orphan_reactions;
pub mod pagination;
pub mod shell_state;

/// Returns the domain module name for smoke checks.
pub fn module_name() -> &'static str {
    "domain"
}
