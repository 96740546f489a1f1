use anyhow::Result;

use crate::domain::{events::AppEvent, shell_state::ShellState};

/// Source of shell events: key presses, ticks and backend results.
pub trait AppEventSource {
    /// Returns None when nothing relevant happened since the last call.
    fn next_event(&mut self) -> Result<Option<AppEvent>>;
}

pub trait ShellOrchestrator {
    /// Kicks off the initial backend requests.
    fn start(&mut self);
    fn state(&self) -> &ShellState;
    fn state_mut(&mut self) -> &mut ShellState;
    fn handle_event(&mut self, event: AppEvent) -> Result<()>;
}
