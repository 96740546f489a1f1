use anyhow::Result;
use uuid::Uuid;

use crate::{
    backend::ChatBackend,
    domain::{
        chat_session::SessionError,
        events::{AppEvent, KeyInput},
        message_input_state::InputMode,
        shell_state::{ActivePane, ShellState},
    },
};

use super::{chat_controller::ChatController, contracts::ShellOrchestrator};

const QUICK_REACTION: &str = "👍";

pub struct DefaultShellOrchestrator<B: ChatBackend> {
    state: ShellState,
    chats: ChatController<B>,
}

impl<B: ChatBackend> DefaultShellOrchestrator<B> {
    pub fn new(state: ShellState, chats: ChatController<B>) -> Self {
        Self { state, chats }
    }

    fn handle_key(&mut self, key: KeyInput) {
        if key.ctrl {
            match key.key.as_str() {
                "o" => {
                    let up = !self.state.is_link_up();
                    self.chats.set_link_up(&mut self.state, up);
                }
                "c" => self.quit(),
                _ => {}
            }
            return;
        }

        match self.state.active_pane() {
            ActivePane::ChatList => self.handle_chat_list_key(&key.key),
            ActivePane::Messages => self.handle_messages_key(&key.key),
            ActivePane::MessageInput => self.handle_input_key(&key.key),
        }
    }

    fn handle_chat_list_key(&mut self, key: &str) {
        match key {
            "q" => self.quit(),
            "j" | "down" => self.state.chat_list_mut().select_next(),
            "k" | "up" => self.state.chat_list_mut().select_previous(),
            "R" => self.chats.refresh_chats(&mut self.state),
            "enter" | "l" => self.open_selected_chat(),
            "tab" if self.state.session().chat_id().is_some() => {
                self.state.set_active_pane(ActivePane::Messages);
            }
            _ => {}
        }
    }

    fn handle_messages_key(&mut self, key: &str) {
        let selected = self.state.selected_message();

        let outcome = match key {
            "q" => {
                self.quit();
                Ok(())
            }
            "j" | "down" => {
                self.state.move_message_selection(1);
                Ok(())
            }
            "k" | "up" => {
                self.state.move_message_selection(-1);
                Ok(())
            }
            "i" => {
                self.state.set_active_pane(ActivePane::MessageInput);
                Ok(())
            }
            "tab" | "esc" | "h" => {
                self.state.set_active_pane(ActivePane::ChatList);
                Ok(())
            }
            "u" => {
                if !self.chats.load_older(self.state.session_mut()) && !self.state.session().has_more() {
                    self.state
                        .session_mut()
                        .notices_mut()
                        .info("Beginning of conversation");
                }
                Ok(())
            }
            "r" => self.with_selected(selected, |chats, state, id| chats.retry(state.session_mut(), id)),
            "x" => self.with_selected(selected, |chats, state, id| chats.discard(state.session_mut(), id)),
            "d" => self.with_selected(selected, |chats, state, id| chats.delete(state.session_mut(), id)),
            "+" => self.with_selected(selected, |chats, state, id| {
                chats.toggle_reaction(state.session_mut(), id, QUICK_REACTION)
            }),
            "e" => self.with_selected(selected, |_, state, id| start_edit(state, id)),
            _ => Ok(()),
        };

        self.report(outcome);
    }

    fn handle_input_key(&mut self, key: &str) {
        let input = self.state.message_input_mut();
        match key {
            "enter" => self.submit_input(),
            "esc" => {
                input.cancel();
                self.state.set_active_pane(ActivePane::Messages);
            }
            "tab" => self.state.set_active_pane(ActivePane::Messages),
            "backspace" => input.delete_char_before(),
            "left" => input.move_cursor_left(),
            "right" => input.move_cursor_right(),
            "home" => input.move_cursor_home(),
            "end" => input.move_cursor_end(),
            other => {
                let mut chars = other.chars();
                if let (Some(ch), None) = (chars.next(), chars.next()) {
                    if !input.insert_char(ch) {
                        self.state
                            .session_mut()
                            .notices_mut()
                            .error("Message length limit reached");
                    }
                }
            }
        }
    }

    fn submit_input(&mut self) {
        let Some(submission) = self.state.message_input_mut().take_submission() else {
            return;
        };

        let outcome = match submission.mode {
            InputMode::Compose => self
                .chats
                .send_text(self.state.session_mut(), &submission.text)
                .map(|_| ()),
            InputMode::Edit { message_id } => {
                self.state.set_active_pane(ActivePane::Messages);
                self.chats
                    .edit(self.state.session_mut(), message_id, &submission.text)
            }
        };
        self.state.clear_message_selection();
        self.report(outcome);
    }

    fn open_selected_chat(&mut self) {
        let Some(chat_id) = self.state.chat_list().selected_chat().map(|c| c.chat_id()) else {
            return;
        };

        if self.state.session().chat_id() != Some(chat_id) {
            self.state.message_input_mut().cancel();
            self.state.clear_message_selection();
            self.chats.open_chat(self.state.session_mut(), chat_id);
        }
        self.state.set_active_pane(ActivePane::MessageInput);
    }

    fn with_selected<F>(&mut self, selected: Option<Uuid>, action: F) -> Result<(), SessionError>
    where
        F: FnOnce(&ChatController<B>, &mut ShellState, Uuid) -> Result<(), SessionError>,
    {
        match selected {
            Some(id) => action(&self.chats, &mut self.state, id),
            None => Ok(()),
        }
    }

    fn report(&mut self, outcome: Result<(), SessionError>) {
        if let Err(error) = outcome {
            tracing::debug!(error = %error, "user action rejected");
            self.state.session_mut().notices_mut().error(error.to_string());
        }
    }

    fn quit(&mut self) {
        self.chats.close_chat(self.state.session_mut());
        self.state.stop();
    }
}

fn start_edit(state: &mut ShellState, message_id: Uuid) -> Result<(), SessionError> {
    let user_id = state.session().user_id();
    let message = state
        .session()
        .message(message_id)
        .ok_or(SessionError::UnknownMessage)?;

    if message.sender_id != user_id {
        return Err(SessionError::NotOwnMessage);
    }
    if message.is_recalled {
        return Err(SessionError::Recalled);
    }

    let text = message.content.clone().unwrap_or_default();
    state.message_input_mut().start_edit(message_id, &text);
    state.set_active_pane(ActivePane::MessageInput);
    Ok(())
}

impl<B: ChatBackend> ShellOrchestrator for DefaultShellOrchestrator<B> {
    fn start(&mut self) {
        self.chats.refresh_chats(&mut self.state);
    }

    fn state(&self) -> &ShellState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ShellState {
        &mut self.state
    }

    fn handle_event(&mut self, event: AppEvent) -> Result<()> {
        match event {
            AppEvent::Tick => {}
            AppEvent::QuitRequested => self.quit(),
            AppEvent::InputKey(key) => self.handle_key(key),
            AppEvent::Backend(event) => self.chats.handle(&mut self.state, event),
        }

        Ok(())
    }
}
