//! State of the input line: composing a new message or editing an existing one.

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Compose,
    Edit {
        message_id: Uuid,
    },
}

/// Text handed over when the user presses enter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSubmission {
    pub mode: InputMode,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageInputState {
    chars: Vec<char>,
    /// Cursor position in characters.
    cursor: usize,
    mode: InputMode,
    max_chars: usize,
}

impl Default for MessageInputState {
    fn default() -> Self {
        Self::with_limit(crate::domain::chat_session::DEFAULT_MAX_CONTENT_LEN)
    }
}

impl MessageInputState {
    pub fn with_limit(max_chars: usize) -> Self {
        Self {
            chars: Vec::new(),
            cursor: 0,
            mode: InputMode::Compose,
            max_chars,
        }
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Returns false when the limit is reached.
    pub fn insert_char(&mut self, ch: char) -> bool {
        if self.chars.len() >= self.max_chars {
            return false;
        }
        self.chars.insert(self.cursor, ch);
        self.cursor += 1;
        true
    }

    pub fn delete_char_before(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        self.chars.remove(self.cursor);
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.chars.len());
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor = self.chars.len();
    }

    /// Loads an existing message for editing.
    pub fn start_edit(&mut self, message_id: Uuid, text: &str) {
        self.chars = text.chars().take(self.max_chars).collect();
        self.cursor = self.chars.len();
        self.mode = InputMode::Edit { message_id };
    }

    /// Clears the line and falls back to compose mode.
    pub fn cancel(&mut self) {
        self.chars.clear();
        self.cursor = 0;
        self.mode = InputMode::Compose;
    }

    /// Takes the line for sending. Blank lines stay in place and return None.
    pub fn take_submission(&mut self) -> Option<InputSubmission> {
        let text = self.text();
        if text.trim().is_empty() {
            return None;
        }

        let submission = InputSubmission {
            mode: self.mode,
            text,
        };
        self.cancel();
        Some(submission)
    }
}
