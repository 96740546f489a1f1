use thiserror::Error;
use uuid::Uuid;

use crate::{backend::GatewayError, domain::chat::ChatSummary};

const DEFAULT_CHAT_PAGE_SIZE: usize = 50;
const MAX_CHAT_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChatsQuery {
    pub user_id: Uuid,
    pub limit: usize,
    pub offset: usize,
}

impl ListChatsQuery {
    pub fn first_page(user_id: Uuid) -> Self {
        Self {
            user_id,
            limit: DEFAULT_CHAT_PAGE_SIZE,
            offset: 0,
        }
    }

    fn normalized_limit(&self) -> usize {
        match self.limit {
            0 => DEFAULT_CHAT_PAGE_SIZE,
            value if value > MAX_CHAT_PAGE_SIZE => MAX_CHAT_PAGE_SIZE,
            value => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListChatsError {
    #[error("not signed in")]
    Unauthorized,
    #[error("connection lost")]
    TemporarilyUnavailable,
    #[error("unexpected data from server")]
    DataContractViolation,
}

/// Chats the user participates in, most recently active first.
pub trait ChatsSource {
    fn list_chats(
        &self,
        user_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ChatSummary>, GatewayError>;
}

pub fn list_chats(
    source: &dyn ChatsSource,
    query: ListChatsQuery,
) -> Result<Vec<ChatSummary>, ListChatsError> {
    let limit = query.normalized_limit();
    source
        .list_chats(query.user_id, limit, query.offset)
        .map_err(map_source_error)
}

fn map_source_error(error: GatewayError) -> ListChatsError {
    match error {
        GatewayError::Unauthorized => ListChatsError::Unauthorized,
        GatewayError::Unavailable | GatewayError::NotFound(_) | GatewayError::Rejected(_) => {
            ListChatsError::TemporarilyUnavailable
        }
        GatewayError::InvalidData(_) => ListChatsError::DataContractViolation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::{
        domain::chat::{Chat, ChatKind},
        test_support::{at, CHAT, COACH},
    };

    struct StubSource {
        result: Result<Vec<ChatSummary>, GatewayError>,
        captured: Mutex<Option<(Uuid, usize, usize)>>,
    }

    impl StubSource {
        fn with_result(result: Result<Vec<ChatSummary>, GatewayError>) -> Self {
            Self {
                result,
                captured: Mutex::new(None),
            }
        }

        fn captured(&self) -> Option<(Uuid, usize, usize)> {
            *self.captured.lock().expect("captured lock")
        }
    }

    impl ChatsSource for StubSource {
        fn list_chats(
            &self,
            user_id: Uuid,
            limit: usize,
            offset: usize,
        ) -> Result<Vec<ChatSummary>, GatewayError> {
            *self.captured.lock().expect("captured lock") = Some((user_id, limit, offset));
            self.result.clone()
        }
    }

    fn summary() -> ChatSummary {
        ChatSummary {
            chat: Chat {
                id: CHAT,
                name: "Varsity".to_owned(),
                kind: ChatKind::Team,
                created_by: COACH,
                team_id: None,
                is_archived: false,
                updated_at: at(0),
            },
            participant_count: 12,
            last_message_preview: None,
            last_message_at: None,
        }
    }

    #[test]
    fn first_page_uses_default_limit() {
        let source = StubSource::with_result(Ok(vec![summary()]));

        let chats = list_chats(&source, ListChatsQuery::first_page(COACH)).expect("list");

        assert_eq!(chats, vec![summary()]);
        assert_eq!(source.captured(), Some((COACH, 50, 0)));
    }

    #[test]
    fn zero_limit_falls_back_to_default() {
        let source = StubSource::with_result(Ok(vec![]));

        list_chats(
            &source,
            ListChatsQuery {
                user_id: COACH,
                limit: 0,
                offset: 10,
            },
        )
        .expect("list");

        assert_eq!(source.captured(), Some((COACH, 50, 10)));
    }

    #[test]
    fn caps_limit_to_maximum_boundary() {
        let source = StubSource::with_result(Ok(vec![]));

        list_chats(
            &source,
            ListChatsQuery {
                user_id: COACH,
                limit: 500,
                offset: 0,
            },
        )
        .expect("list");

        assert_eq!(source.captured(), Some((COACH, 200, 0)));
    }

    #[test]
    fn maps_source_errors() {
        let cases = [
            (GatewayError::Unauthorized, ListChatsError::Unauthorized),
            (GatewayError::Unavailable, ListChatsError::TemporarilyUnavailable),
            (
                GatewayError::InvalidData("bad row".to_owned()),
                ListChatsError::DataContractViolation,
            ),
        ];

        for (source_error, expected) in cases {
            let source = StubSource::with_result(Err(source_error));
            let err = list_chats(&source, ListChatsQuery::first_page(COACH)).expect_err("fail");
            assert_eq!(err, expected);
        }
    }
}
