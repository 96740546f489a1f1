use anyhow::Result;

use crate::usecases::{
    context::AppContext,
    contracts::{AppEventSource, ShellOrchestrator},
};

use super::{terminal::TerminalSession, view};

pub fn start(
    context: &AppContext,
    event_source: &mut dyn AppEventSource,
    orchestrator: &mut dyn ShellOrchestrator,
) -> Result<()> {
    tracing::info!(
        log_level = %context.config.logging.level,
        user_id = %context.config.identity.user_id,
        page_size = context.config.chat.page_size,
        "starting TUI shell"
    );

    let mut terminal = TerminalSession::new()?;
    orchestrator.start();
    run_loop(event_source, orchestrator, |state| {
        terminal.draw(|frame| view::render(frame, state))
    })?;

    tracing::info!("TUI shell stopped");
    Ok(())
}

fn run_loop<D>(
    event_source: &mut dyn AppEventSource,
    orchestrator: &mut dyn ShellOrchestrator,
    mut draw: D,
) -> Result<()>
where
    D: FnMut(&crate::domain::shell_state::ShellState) -> Result<()>,
{
    while orchestrator.state().is_running() {
        draw(orchestrator.state())?;

        if let Some(event) = event_source.next_event()? {
            orchestrator.handle_event(event)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{mpsc, Arc},
        time::Duration,
    };

    use crate::{
        backend::local::LocalBackend,
        domain::{
            chat_session::{ChatSession, SessionConfig},
            events::{AppEvent, KeyInput},
            message_input_state::MessageInputState,
            shell_state::ShellState,
        },
        test_support::{profile, COACH},
        ui::event_source::MockEventSource,
        usecases::{
            chat_controller::ChatController, dispatcher::Dispatcher,
            shell::DefaultShellOrchestrator,
        },
    };

    fn orchestrator(runtime: &tokio::runtime::Runtime) -> DefaultShellOrchestrator<LocalBackend> {
        let backend = Arc::new(LocalBackend::new(COACH, Duration::ZERO));
        let (tx, _rx) = mpsc::channel();
        let dispatcher = Dispatcher::new(runtime.handle().clone(), backend, tx);
        let session = ChatSession::new(SessionConfig {
            user: profile(COACH, "Coach Carter"),
            page_size: 50,
            max_content_len: 4000,
            orphan_reaction_limit: 8,
            notice_capacity: 8,
        });

        DefaultShellOrchestrator::new(
            ShellState::new(session, MessageInputState::default()),
            ChatController::new(dispatcher),
        )
    }

    #[test]
    fn mock_source_produces_quit_event() {
        let mut source = MockEventSource::from(vec![AppEvent::QuitRequested]);
        let event = source.next_event().expect("must read mock event");

        assert_eq!(event, Some(AppEvent::QuitRequested));
    }

    #[test]
    fn loop_draws_until_quit_key() {
        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        let mut orchestrator = orchestrator(&runtime);
        let mut source = MockEventSource::from(vec![
            AppEvent::Tick,
            AppEvent::InputKey(KeyInput::new("j", false)),
            AppEvent::InputKey(KeyInput::new("q", false)),
        ]);
        let mut frames = 0;

        run_loop(&mut source, &mut orchestrator, |_| {
            frames += 1;
            Ok(())
        })
        .expect("loop must finish");

        assert_eq!(frames, 3);
        assert!(!orchestrator.state().is_running());
    }
}
