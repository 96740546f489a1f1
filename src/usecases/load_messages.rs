use thiserror::Error;
use uuid::Uuid;

use crate::{
    backend::GatewayError,
    domain::{
        message::Message,
        pagination::{normalize_page_size, PageRequest},
    },
};

/// One page of message history, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadMessagesQuery {
    pub chat_id: Uuid,
    pub offset: usize,
    pub limit: usize,
}

impl LoadMessagesQuery {
    pub fn page(chat_id: Uuid, request: PageRequest) -> Self {
        Self {
            chat_id,
            offset: request.offset,
            limit: request.limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadMessagesError {
    #[error("you are not a member of this chat")]
    Unauthorized,
    #[error("connection lost")]
    TemporarilyUnavailable,
    #[error("unexpected data from server")]
    DataContractViolation,
    #[error("chat no longer exists")]
    ChatNotFound,
}

pub trait MessagesSource {
    /// Rows of `chat_id` ordered by creation time descending.
    fn list_messages(
        &self,
        chat_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Message>, GatewayError>;
}

impl<T> MessagesSource for &T
where
    T: MessagesSource + ?Sized,
{
    fn list_messages(
        &self,
        chat_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Message>, GatewayError> {
        (*self).list_messages(chat_id, offset, limit)
    }
}

pub fn load_messages(
    source: &dyn MessagesSource,
    query: LoadMessagesQuery,
) -> Result<Vec<Message>, LoadMessagesError> {
    let limit = normalize_page_size(query.limit);
    let messages = source
        .list_messages(query.chat_id, query.offset, limit)
        .map_err(map_source_error)?;

    if messages.len() > limit {
        tracing::warn!(
            code = "LOAD_MESSAGES_PAGE_OVERFLOW",
            chat_id = %query.chat_id,
            received = messages.len(),
            limit,
            "backend returned more rows than requested"
        );
        return Err(LoadMessagesError::DataContractViolation);
    }

    Ok(messages)
}

fn map_source_error(error: GatewayError) -> LoadMessagesError {
    match error {
        GatewayError::Unauthorized => LoadMessagesError::Unauthorized,
        GatewayError::Unavailable | GatewayError::Rejected(_) => {
            LoadMessagesError::TemporarilyUnavailable
        }
        GatewayError::InvalidData(_) => LoadMessagesError::DataContractViolation,
        GatewayError::NotFound(_) => LoadMessagesError::ChatNotFound,
    }
}
