use thiserror::Error;
use uuid::Uuid;

use crate::backend::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditMessageError {
    #[error("only your own messages can be changed")]
    Forbidden,
    #[error("message no longer exists")]
    MessageNotFound,
    #[error("connection lost")]
    TemporarilyUnavailable,
    #[error("{0}")]
    Rejected(String),
}

/// Writes to existing message rows.
pub trait MessageEditor {
    /// Replaces the content and marks the row as edited.
    fn update_message_content(&self, message_id: Uuid, content: &str)
        -> Result<(), GatewayError>;

    fn delete_message(&self, message_id: Uuid) -> Result<(), GatewayError>;
}

pub fn edit_message(
    editor: &dyn MessageEditor,
    message_id: Uuid,
    content: &str,
) -> Result<(), EditMessageError> {
    editor
        .update_message_content(message_id, content)
        .map_err(map_source_error)
}

pub fn delete_message(editor: &dyn MessageEditor, message_id: Uuid) -> Result<(), EditMessageError> {
    editor.delete_message(message_id).map_err(map_source_error)
}

fn map_source_error(error: GatewayError) -> EditMessageError {
    match error {
        GatewayError::Unauthorized => EditMessageError::Forbidden,
        GatewayError::NotFound(_) => EditMessageError::MessageNotFound,
        GatewayError::Unavailable => EditMessageError::TemporarilyUnavailable,
        GatewayError::InvalidData(details) | GatewayError::Rejected(details) => {
            EditMessageError::Rejected(details)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct StubEditor {
        fail_with: Option<GatewayError>,
        edits: RefCell<Vec<(Uuid, String)>>,
        deletes: RefCell<Vec<Uuid>>,
    }

    impl MessageEditor for StubEditor {
        fn update_message_content(
            &self,
            message_id: Uuid,
            content: &str,
        ) -> Result<(), GatewayError> {
            self.edits.borrow_mut().push((message_id, content.to_owned()));
            self.fail_with.clone().map_or(Ok(()), Err)
        }

        fn delete_message(&self, message_id: Uuid) -> Result<(), GatewayError> {
            self.deletes.borrow_mut().push(message_id);
            self.fail_with.clone().map_or(Ok(()), Err)
        }
    }

    #[test]
    fn forwards_edit_to_backend() {
        let editor = StubEditor::default();
        let id = Uuid::from_u128(1);

        edit_message(&editor, id, "bus leaves 7:15").expect("edit should succeed");

        assert_eq!(
            editor.edits.borrow().as_slice(),
            &[(id, "bus leaves 7:15".to_owned())]
        );
    }

    #[test]
    fn maps_unauthorized_edit_to_forbidden() {
        let editor = StubEditor {
            fail_with: Some(GatewayError::Unauthorized),
            ..StubEditor::default()
        };

        let err = edit_message(&editor, Uuid::from_u128(1), "x").expect_err("must fail");

        assert_eq!(err, EditMessageError::Forbidden);
    }

    #[test]
    fn maps_missing_row_on_delete() {
        let editor = StubEditor {
            fail_with: Some(GatewayError::NotFound("message")),
            ..StubEditor::default()
        };

        let err = delete_message(&editor, Uuid::from_u128(1)).expect_err("must fail");

        assert_eq!(err, EditMessageError::MessageNotFound);
        assert_eq!(editor.deletes.borrow().len(), 1);
    }
}
