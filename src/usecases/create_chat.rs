//! Creating a chat through the backend's `create_chat` procedure.
//!
//! The procedure inserts the chat row and every participant in one
//! transaction; the creator joins as admin.

use thiserror::Error;
use uuid::Uuid;

use crate::{
    backend::GatewayError,
    domain::chat::{ChatKind, ChatSummary},
};

const MAX_CHAT_NAME_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateChatCommand {
    pub creator_id: Uuid,
    pub name: String,
    pub kind: ChatKind,
    /// Members besides the creator.
    pub member_ids: Vec<Uuid>,
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreateChatError {
    #[error("a private chat needs exactly one other member")]
    PrivateNeedsOneMember,
    #[error("chat name is required")]
    NameRequired,
    #[error("chat name is too long")]
    NameTooLong,
    #[error("team chats must reference a team")]
    TeamRequired,
    #[error("you cannot start a chat with yourself")]
    SelfOnly,
    #[error("not allowed to create this chat")]
    Unauthorized,
    #[error("member not found")]
    MemberNotFound,
    #[error("connection lost")]
    TemporarilyUnavailable,
    #[error("{0}")]
    Rejected(String),
}

pub trait ChatCreator {
    /// Runs the chat creation procedure with an already validated command.
    fn create_chat(&self, command: &CreateChatCommand) -> Result<ChatSummary, GatewayError>;
}

pub fn create_chat(
    creator: &dyn ChatCreator,
    command: CreateChatCommand,
) -> Result<ChatSummary, CreateChatError> {
    let command = normalized(command)?;
    let summary = creator.create_chat(&command).map_err(map_source_error)?;

    tracing::info!(
        chat_id = %summary.chat_id(),
        kind = command.kind.as_str(),
        members = summary.participant_count,
        "chat created"
    );
    Ok(summary)
}

fn normalized(mut command: CreateChatCommand) -> Result<CreateChatCommand, CreateChatError> {
    let creator_id = command.creator_id;
    command.name = command.name.trim().to_owned();
    command.member_ids.retain(|id| *id != creator_id);
    let mut seen = std::collections::HashSet::new();
    command.member_ids.retain(|id| seen.insert(*id));

    match command.kind {
        ChatKind::Private => {
            if command.member_ids.is_empty() {
                return Err(CreateChatError::SelfOnly);
            }
            if command.member_ids.len() != 1 {
                return Err(CreateChatError::PrivateNeedsOneMember);
            }
        }
        ChatKind::Group | ChatKind::Team => {
            if command.name.is_empty() {
                return Err(CreateChatError::NameRequired);
            }
            if command.kind == ChatKind::Team && command.team_id.is_none() {
                return Err(CreateChatError::TeamRequired);
            }
        }
    }

    if command.name.chars().count() > MAX_CHAT_NAME_LEN {
        return Err(CreateChatError::NameTooLong);
    }

    Ok(command)
}

fn map_source_error(error: GatewayError) -> CreateChatError {
    match error {
        GatewayError::Unauthorized => CreateChatError::Unauthorized,
        GatewayError::NotFound(_) => CreateChatError::MemberNotFound,
        GatewayError::Unavailable => CreateChatError::TemporarilyUnavailable,
        GatewayError::InvalidData(details) | GatewayError::Rejected(details) => {
            CreateChatError::Rejected(details)
        }
    }
}
