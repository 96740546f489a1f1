use thiserror::Error;
use uuid::Uuid;

use crate::{
    backend::GatewayError,
    domain::{
        chat_session::{ReactionChange, ReactionRequest},
        message::Reaction,
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactionError {
    #[error("not allowed to react here")]
    Forbidden,
    #[error("message no longer exists")]
    MessageNotFound,
    #[error("connection lost")]
    TemporarilyUnavailable,
    #[error("{0}")]
    Rejected(String),
}

/// Writes to the message reactions table.
pub trait ReactionWriter {
    fn add_reaction(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> Result<Reaction, GatewayError>;

    fn remove_reaction(&self, reaction_id: Uuid) -> Result<(), GatewayError>;
}

/// Performs one reaction toggle decided by the session.
pub fn apply_reaction(
    writer: &dyn ReactionWriter,
    request: &ReactionRequest,
) -> Result<ReactionChange, ReactionError> {
    match request {
        ReactionRequest::Add {
            message_id,
            user_id,
            emoji,
            ..
        } => writer
            .add_reaction(*message_id, *user_id, emoji)
            .map(ReactionChange::Added)
            .map_err(map_source_error),
        ReactionRequest::Remove {
            message_id,
            reaction_id,
            ..
        } => writer
            .remove_reaction(*reaction_id)
            .map(|()| ReactionChange::Removed {
                reaction_id: *reaction_id,
                message_id: *message_id,
            })
            .map_err(map_source_error),
    }
}

fn map_source_error(error: GatewayError) -> ReactionError {
    match error {
        GatewayError::Unauthorized => ReactionError::Forbidden,
        GatewayError::NotFound(_) => ReactionError::MessageNotFound,
        GatewayError::Unavailable => ReactionError::TemporarilyUnavailable,
        GatewayError::InvalidData(details) | GatewayError::Rejected(details) => {
            ReactionError::Rejected(details)
        }
    }
}
