//! Use case for inserting a message row.
//!
//! The row id is generated by the client before the call and sent along, so
//! the optimistic copy, the insert acknowledgement and the realtime row all
//! share one key.

use thiserror::Error;

use crate::{
    backend::GatewayError,
    domain::{chat_session::OutgoingMessage, message::Message},
};

/// Errors surfaced to the user for a send.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("you are not a member of this chat")]
    Unauthorized,
    #[error("chat no longer exists")]
    ChatNotFound,
    #[error("connection lost")]
    TemporarilyUnavailable,
    #[error("{0}")]
    Rejected(String),
}

/// Inserts message rows.
pub trait MessageSender {
    /// Inserts `outgoing` and returns the stored row.
    ///
    /// # Errors
    /// Returns `GatewayError` if the row could not be stored.
    fn insert_message(&self, outgoing: &OutgoingMessage) -> Result<Message, GatewayError>;
}

impl<T: MessageSender + ?Sized> MessageSender for &T {
    fn insert_message(&self, outgoing: &OutgoingMessage) -> Result<Message, GatewayError> {
        (*self).insert_message(outgoing)
    }
}

/// Sends a message that was already rendered optimistically.
///
/// Rejects messages with neither text nor media before reaching the backend.
pub fn send_message(
    sender: &dyn MessageSender,
    outgoing: &OutgoingMessage,
) -> Result<Message, SendMessageError> {
    let has_text = outgoing
        .content
        .as_deref()
        .is_some_and(|text| !text.trim().is_empty());
    if !has_text && outgoing.media.is_none() {
        return Err(SendMessageError::EmptyMessage);
    }

    sender.insert_message(outgoing).map_err(map_source_error)
}

fn map_source_error(error: GatewayError) -> SendMessageError {
    match error {
        GatewayError::Unauthorized => SendMessageError::Unauthorized,
        GatewayError::NotFound(_) => SendMessageError::ChatNotFound,
        GatewayError::Unavailable => SendMessageError::TemporarilyUnavailable,
        GatewayError::InvalidData(details) | GatewayError::Rejected(details) => {
            SendMessageError::Rejected(details)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use uuid::Uuid;

    use crate::{
        domain::message::MessageKind,
        test_support::{at, CHAT, COACH},
    };

    struct StubSender {
        result: Result<(), GatewayError>,
        captured: RefCell<Option<OutgoingMessage>>,
    }

    impl StubSender {
        fn with_result(result: Result<(), GatewayError>) -> Self {
            Self {
                result,
                captured: RefCell::new(None),
            }
        }
    }

    impl MessageSender for StubSender {
        fn insert_message(&self, outgoing: &OutgoingMessage) -> Result<Message, GatewayError> {
            *self.captured.borrow_mut() = Some(outgoing.clone());
            self.result.clone().map(|()| {
                Message::text(
                    outgoing.id,
                    outgoing.chat_id,
                    outgoing.sender_id,
                    outgoing.content.clone().unwrap_or_default(),
                    outgoing.created_at,
                )
            })
        }
    }

    fn outgoing(content: Option<&str>) -> OutgoingMessage {
        OutgoingMessage {
            id: Uuid::from_u128(1),
            chat_id: CHAT,
            sender_id: COACH,
            content: content.map(str::to_owned),
            kind: MessageKind::Text,
            media: None,
            created_at: at(0),
        }
    }

    #[test]
    fn rejects_message_without_text_or_media() {
        let sender = StubSender::with_result(Ok(()));

        let result = send_message(&sender, &outgoing(Some("   ")));

        assert_eq!(result, Err(SendMessageError::EmptyMessage));
        assert!(sender.captured.borrow().is_none());
    }

    #[test]
    fn passes_client_generated_id_to_backend() {
        let sender = StubSender::with_result(Ok(()));

        let row = send_message(&sender, &outgoing(Some("hello"))).expect("send should succeed");

        assert_eq!(row.id, Uuid::from_u128(1));
        assert_eq!(
            sender.captured.borrow().as_ref().map(|o| o.id),
            Some(Uuid::from_u128(1))
        );
    }

    #[test]
    fn maps_unauthorized_error() {
        let sender = StubSender::with_result(Err(GatewayError::Unauthorized));

        let result = send_message(&sender, &outgoing(Some("hello")));

        assert_eq!(result, Err(SendMessageError::Unauthorized));
    }

    #[test]
    fn maps_not_found_to_chat_not_found() {
        let sender = StubSender::with_result(Err(GatewayError::NotFound("chat")));

        let result = send_message(&sender, &outgoing(Some("hello")));

        assert_eq!(result, Err(SendMessageError::ChatNotFound));
    }

    #[test]
    fn maps_unavailable_error() {
        let sender = StubSender::with_result(Err(GatewayError::Unavailable));

        let result = send_message(&sender, &outgoing(Some("hello")));

        assert_eq!(result, Err(SendMessageError::TemporarilyUnavailable));
    }

    #[test]
    fn keeps_rejection_details() {
        let sender =
            StubSender::with_result(Err(GatewayError::Rejected("content too long".to_owned())));

        let result = send_message(&sender, &outgoing(Some("hello")));

        assert_eq!(
            result,
            Err(SendMessageError::Rejected("content too long".to_owned()))
        );
    }
}
