use std::{
    sync::mpsc::{Receiver, TryRecvError},
    time::Duration,
};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::{
    domain::events::{AppEvent, KeyInput},
    usecases::contracts::AppEventSource,
};

const EVENT_POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Terminal keys plus results posted by backend workers.
pub struct CrosstermEventSource {
    backend_events: Receiver<AppEvent>,
    backend_closed: bool,
}

impl CrosstermEventSource {
    pub fn new(backend_events: Receiver<AppEvent>) -> Self {
        Self {
            backend_events,
            backend_closed: false,
        }
    }

    fn next_backend_event(&mut self) -> Option<AppEvent> {
        if self.backend_closed {
            return None;
        }

        match self.backend_events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::warn!("backend event channel closed");
                self.backend_closed = true;
                None
            }
        }
    }
}

impl AppEventSource for CrosstermEventSource {
    fn next_event(&mut self) -> Result<Option<AppEvent>> {
        if let Some(event) = self.next_backend_event() {
            return Ok(Some(event));
        }

        if !event::poll(EVENT_POLL_TIMEOUT)? {
            return Ok(Some(AppEvent::Tick));
        }

        match event::read()? {
            Event::Key(key) => Ok(map_key_event(key)),
            Event::Resize(..) => Ok(Some(AppEvent::Tick)),
            _ => Ok(None),
        }
    }
}

fn map_key_event(key: KeyEvent) -> Option<AppEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Some(AppEvent::QuitRequested);
    }

    let name = match key.code {
        KeyCode::Char(ch) => ch.to_string(),
        KeyCode::Enter => "enter".to_owned(),
        KeyCode::Esc => "esc".to_owned(),
        KeyCode::Tab | KeyCode::BackTab => "tab".to_owned(),
        KeyCode::Backspace => "backspace".to_owned(),
        KeyCode::Left => "left".to_owned(),
        KeyCode::Right => "right".to_owned(),
        KeyCode::Up => "up".to_owned(),
        KeyCode::Down => "down".to_owned(),
        KeyCode::Home => "home".to_owned(),
        KeyCode::End => "end".to_owned(),
        _ => return None,
    };

    Some(AppEvent::InputKey(KeyInput::new(name, ctrl)))
}

#[cfg(test)]
pub struct MockEventSource {
    queue: std::collections::VecDeque<AppEvent>,
}

#[cfg(test)]
impl MockEventSource {
    pub fn from(events: Vec<AppEvent>) -> Self {
        Self {
            queue: events.into(),
        }
    }
}

#[cfg(test)]
impl AppEventSource for MockEventSource {
    fn next_event(&mut self) -> Result<Option<AppEvent>> {
        Ok(self.queue.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;
    use std::sync::mpsc;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn ctrl_c_requests_quit() {
        let event = map_key_event(press(KeyCode::Char('c'), KeyModifiers::CONTROL));

        assert_eq!(event, Some(AppEvent::QuitRequested));
    }

    #[test]
    fn plain_q_is_passed_through_as_a_key() {
        let event = map_key_event(press(KeyCode::Char('q'), KeyModifiers::NONE));

        assert_eq!(event, Some(AppEvent::InputKey(KeyInput::new("q", false))));
    }

    #[test]
    fn named_keys_map_to_lowercase_names() {
        let event = map_key_event(press(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(event, Some(AppEvent::InputKey(KeyInput::new("enter", false))));

        let event = map_key_event(press(KeyCode::Char('o'), KeyModifiers::CONTROL));
        assert_eq!(event, Some(AppEvent::InputKey(KeyInput::new("o", true))));
    }

    #[test]
    fn key_release_is_ignored() {
        let mut key = press(KeyCode::Char('a'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;

        assert_eq!(map_key_event(key), None);
    }

    #[test]
    fn backend_events_are_drained_before_polling_the_terminal() {
        let (tx, rx) = mpsc::channel();
        tx.send(AppEvent::QuitRequested).expect("send");
        let mut source = CrosstermEventSource::new(rx);

        assert_eq!(source.next_backend_event(), Some(AppEvent::QuitRequested));
        assert_eq!(source.next_backend_event(), None);
        drop(tx);
        assert_eq!(source.next_backend_event(), None);
        assert!(source.backend_closed);
    }
}
