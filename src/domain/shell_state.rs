use uuid::Uuid;

use super::{
    chat_list_state::ChatListState, chat_session::ChatSession,
    message_input_state::MessageInputState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivePane {
    #[default]
    ChatList,
    Messages,
    MessageInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellState {
    running: bool,
    active_pane: ActivePane,
    link_up: bool,
    chat_list: ChatListState,
    session: ChatSession,
    message_input: MessageInputState,
    selected_message: Option<Uuid>,
}

impl ShellState {
    pub fn new(session: ChatSession, message_input: MessageInputState) -> Self {
        Self {
            running: true,
            active_pane: ActivePane::ChatList,
            link_up: true,
            chat_list: ChatListState::default(),
            session,
            message_input,
            selected_message: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn active_pane(&self) -> ActivePane {
        self.active_pane
    }

    pub fn set_active_pane(&mut self, pane: ActivePane) {
        self.active_pane = pane;
    }

    pub fn is_link_up(&self) -> bool {
        self.link_up
    }

    pub fn set_link_up(&mut self, up: bool) {
        self.link_up = up;
    }

    pub fn chat_list(&self) -> &ChatListState {
        &self.chat_list
    }

    pub fn chat_list_mut(&mut self) -> &mut ChatListState {
        &mut self.chat_list
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ChatSession {
        &mut self.session
    }

    pub fn message_input(&self) -> &MessageInputState {
        &self.message_input
    }

    pub fn message_input_mut(&mut self) -> &mut MessageInputState {
        &mut self.message_input
    }

    /// Selected message id, falling back to the newest message.
    pub fn selected_message(&self) -> Option<Uuid> {
        let snapshot = self.session.snapshot();
        self.selected_message
            .filter(|id| snapshot.iter().any(|m| m.id == *id))
            .or_else(|| snapshot.last().map(|m| m.id))
    }

    pub fn clear_message_selection(&mut self) {
        self.selected_message = None;
    }

    /// Moves the message cursor by `delta` rows, clamped to the list.
    pub fn move_message_selection(&mut self, delta: isize) {
        let snapshot = self.session.snapshot();
        if snapshot.is_empty() {
            self.selected_message = None;
            return;
        }

        let current = self
            .selected_message()
            .and_then(|id| snapshot.iter().position(|m| m.id == id))
            .unwrap_or(snapshot.len() - 1);
        let target = current
            .saturating_add_signed(delta)
            .min(snapshot.len() - 1);
        self.selected_message = Some(snapshot[target].id);
    }
}
