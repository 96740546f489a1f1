//! Message input field rendering.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::domain::{
    message_input_state::{InputMode, MessageInputState},
    shell_state::ActivePane,
};

use super::styles;

const PLACEHOLDER_TEXT: &str = "Press 'i' to type a message...";
const PROMPT_SYMBOL: &str = "> ";
const EDIT_PROMPT_SYMBOL: &str = "edit> ";

pub fn render_message_input(
    frame: &mut Frame<'_>,
    area: Rect,
    input_state: &MessageInputState,
    active_pane: ActivePane,
) {
    let is_focused = active_pane == ActivePane::MessageInput;

    let border_style = if is_focused {
        styles::active_panel_border_style()
    } else {
        styles::inactive_panel_border_style()
    };

    let paragraph = Paragraph::new(build_input_line(input_state, is_focused)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style),
    );
    frame.render_widget(paragraph, area);

    if is_focused {
        let before_cursor: String = input_state
            .text()
            .chars()
            .take(input_state.cursor_position())
            .collect();
        let offset = prompt(input_state).width() + before_cursor.width();
        let cursor_x = area
            .x
            .saturating_add(1)
            .saturating_add(offset.min(u16::MAX as usize) as u16);
        frame.set_cursor_position((cursor_x, area.y.saturating_add(1)));
    }
}

fn prompt(input_state: &MessageInputState) -> &'static str {
    match input_state.mode() {
        InputMode::Compose => PROMPT_SYMBOL,
        InputMode::Edit { .. } => EDIT_PROMPT_SYMBOL,
    }
}

fn build_input_line(input_state: &MessageInputState, is_focused: bool) -> Line<'static> {
    let prompt = Span::styled(prompt(input_state), styles::input_prompt_style());

    if !is_focused && input_state.is_empty() {
        return Line::from(vec![
            prompt,
            Span::styled(PLACEHOLDER_TEXT, styles::input_placeholder_style()),
        ]);
    }

    Line::from(vec![
        prompt,
        Span::styled(input_state.text(), styles::input_text_style()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn shows_placeholder_when_empty_and_unfocused() {
        let state = MessageInputState::default();

        let text = line_text(&build_input_line(&state, false));

        assert!(text.contains(PLACEHOLDER_TEXT));
        assert!(text.starts_with(PROMPT_SYMBOL));
    }

    #[test]
    fn shows_empty_prompt_when_focused_and_empty() {
        let state = MessageInputState::default();

        let text = line_text(&build_input_line(&state, true));

        assert_eq!(text, PROMPT_SYMBOL);
    }

    #[test]
    fn edit_mode_uses_its_own_prompt() {
        let mut state = MessageInputState::default();
        state.start_edit(Uuid::from_u128(1), "old text");

        let text = line_text(&build_input_line(&state, true));

        assert_eq!(text, "edit> old text");
    }
}
