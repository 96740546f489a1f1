use uuid::Uuid;

use super::chat::ChatSummary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatListUiState {
    Loading,
    Ready,
    Empty,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatListState {
    ui_state: ChatListUiState,
    chats: Vec<ChatSummary>,
    selected_index: Option<usize>,
}

impl Default for ChatListState {
    fn default() -> Self {
        Self {
            ui_state: ChatListUiState::Loading,
            chats: Vec::new(),
            selected_index: None,
        }
    }
}

impl ChatListState {
    pub fn ui_state(&self) -> ChatListUiState {
        self.ui_state.clone()
    }

    pub fn chats(&self) -> &[ChatSummary] {
        &self.chats
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn selected_chat(&self) -> Option<&ChatSummary> {
        self.selected_index.and_then(|index| self.chats.get(index))
    }

    pub fn find(&self, chat_id: Uuid) -> Option<&ChatSummary> {
        self.chats.iter().find(|chat| chat.chat_id() == chat_id)
    }

    pub fn set_loading(&mut self) {
        self.ui_state = ChatListUiState::Loading;
    }

    /// Replaces the list, keeping the selection on the same chat when it is still present.
    pub fn set_ready(&mut self, chats: Vec<ChatSummary>) {
        if chats.is_empty() {
            self.ui_state = ChatListUiState::Empty;
            self.chats.clear();
            self.selected_index = None;
            return;
        }

        let previous = self.selected_chat().map(ChatSummary::chat_id);
        self.ui_state = ChatListUiState::Ready;
        self.chats = chats;
        self.selected_index = resolve_selection_index(&self.chats, previous);
    }

    /// Error keeps whatever was listed before so the user can still open chats.
    pub fn set_error(&mut self) {
        self.ui_state = if self.chats.is_empty() {
            ChatListUiState::Error
        } else {
            ChatListUiState::Ready
        };
    }

    /// Puts a chat at the top of the list and selects it.
    pub fn upsert_front(&mut self, summary: ChatSummary) {
        self.chats.retain(|chat| chat.chat_id() != summary.chat_id());
        self.chats.insert(0, summary);
        self.ui_state = ChatListUiState::Ready;
        self.selected_index = Some(0);
    }

    pub fn select_next(&mut self) {
        let Some(index) = self.selected_index else {
            return;
        };

        let last_index = self.chats.len().saturating_sub(1);
        self.selected_index = Some(std::cmp::min(index.saturating_add(1), last_index));
    }

    pub fn select_previous(&mut self) {
        let Some(index) = self.selected_index else {
            return;
        };

        self.selected_index = Some(index.saturating_sub(1));
    }
}

fn resolve_selection_index(chats: &[ChatSummary], previous: Option<Uuid>) -> Option<usize> {
    if chats.is_empty() {
        return None;
    }

    previous
        .and_then(|chat_id| chats.iter().position(|chat| chat.chat_id() == chat_id))
        .or(Some(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::chat::{Chat, ChatKind},
        test_support::{at, COACH},
    };

    fn chat(id: u128, name: &str) -> ChatSummary {
        ChatSummary {
            chat: Chat {
                id: Uuid::from_u128(id),
                name: name.to_owned(),
                kind: ChatKind::Group,
                created_by: COACH,
                team_id: None,
                is_archived: false,
                updated_at: at(0),
            },
            participant_count: 2,
            last_message_preview: None,
            last_message_at: None,
        }
    }

    #[test]
    fn default_state_is_loading_without_selection() {
        let state = ChatListState::default();

        assert_eq!(state.ui_state(), ChatListUiState::Loading);
        assert!(state.chats().is_empty());
        assert_eq!(state.selected_index(), None);
    }

    #[test]
    fn set_ready_with_data_selects_first_item() {
        let mut state = ChatListState::default();

        state.set_ready(vec![chat(1, "Varsity"), chat(2, "Coaches")]);

        assert_eq!(state.ui_state(), ChatListUiState::Ready);
        assert_eq!(
            state.selected_chat().map(ChatSummary::chat_id),
            Some(Uuid::from_u128(1))
        );
    }

    #[test]
    fn set_ready_with_empty_list_transitions_to_empty_state() {
        let mut state = ChatListState::default();

        state.set_ready(vec![]);

        assert_eq!(state.ui_state(), ChatListUiState::Empty);
        assert_eq!(state.selected_index(), None);
    }

    #[test]
    fn set_error_keeps_previous_chats() {
        let mut state = ChatListState::default();
        state.set_ready(vec![chat(1, "Varsity")]);

        state.set_error();

        assert_eq!(state.ui_state(), ChatListUiState::Ready);
        assert_eq!(state.chats().len(), 1);
    }

    #[test]
    fn set_error_on_first_load_shows_error() {
        let mut state = ChatListState::default();

        state.set_error();

        assert_eq!(state.ui_state(), ChatListUiState::Error);
    }

    #[test]
    fn set_ready_preserves_selection_by_chat_id() {
        let mut state = ChatListState::default();
        state.set_ready(vec![chat(1, "Varsity"), chat(2, "Coaches"), chat(3, "Medical")]);
        state.select_next();

        state.set_ready(vec![chat(8, "Scouting"), chat(2, "Coaches"), chat(9, "Parents")]);

        assert_eq!(state.selected_index(), Some(1));
    }

    #[test]
    fn selection_moves_within_bounds() {
        let mut state = ChatListState::default();
        state.set_ready(vec![chat(1, "Varsity"), chat(2, "Coaches")]);

        state.select_next();
        state.select_next();
        assert_eq!(state.selected_index(), Some(1));

        state.select_previous();
        state.select_previous();
        assert_eq!(state.selected_index(), Some(0));
    }

    #[test]
    fn upsert_front_moves_existing_chat_to_top() {
        let mut state = ChatListState::default();
        state.set_ready(vec![chat(1, "Varsity"), chat(2, "Coaches")]);

        state.upsert_front(chat(2, "Coaches (renamed)"));

        assert_eq!(state.chats().len(), 2);
        assert_eq!(state.chats()[0].title(), "Coaches (renamed)");
        assert_eq!(state.selected_index(), Some(0));
    }
}
