use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Local;
use uuid::Uuid;

use crate::{
    backend::{self, seed::DemoChatter},
    cli::{Cli, Command},
    domain::{
        self,
        chat::{ChatKind, ChatSummary},
        chat_session::ChatSession,
        message::Message,
        message_input_state::MessageInputState,
        pagination::PageRequest,
        shell_state::ShellState,
    },
    infra, ui,
    usecases::{
        self, bootstrap,
        chat_controller::ChatController,
        context::AppContext,
        create_chat::{create_chat, CreateChatCommand},
        dispatcher::Dispatcher,
        list_chats::{list_chats, ListChatsQuery},
        load_messages::{load_messages, LoadMessagesQuery},
        shell::DefaultShellOrchestrator,
    },
};

pub fn run(cli: Cli) -> Result<()> {
    tracing::debug!(
        ui = ui::module_name(),
        domain = domain::module_name(),
        backend = backend::module_name(),
        usecases = usecases::module_name(),
        infra = infra::module_name(),
        "module boundaries loaded"
    );

    let context = bootstrap::bootstrap(cli.config.as_deref())?;

    match cli.command_or_default() {
        Command::Run => run_shell(&context)?,
        Command::Chats => {
            let chats = list_chats(
                context.backend.as_ref(),
                ListChatsQuery::first_page(context.config.identity.user_id),
            )?;
            if chats.is_empty() {
                println!("No chats yet.");
            }
            for chat in &chats {
                println!("{}", chat_row(chat));
            }
        }
        Command::History { chat, page } => {
            let rows = load_messages(
                context.backend.as_ref(),
                history_query(chat, page, context.config.chat.page_size),
            )?;
            if rows.is_empty() {
                println!("No messages on page {page}.");
            }
            for row in &rows {
                println!("{}", message_row(row));
            }
        }
        Command::CreateChat {
            name,
            kind,
            members,
            team,
        } => {
            let kind = ChatKind::parse(&kind).ok_or_else(|| anyhow!("unknown chat kind: {kind}"))?;
            let summary = create_chat(
                context.backend.as_ref(),
                CreateChatCommand {
                    creator_id: context.config.identity.user_id,
                    name,
                    kind,
                    member_ids: members,
                    team_id: team,
                },
            )?;
            println!("Created {} ({})", chat_row(&summary), summary.chat_id());
        }
    }

    Ok(())
}

fn run_shell(context: &AppContext) -> Result<()> {
    let _chatter = match context.config.local.teammate_every_secs {
        0 => None,
        secs => Some(DemoChatter::start(
            context.runtime.handle(),
            context.backend.clone(),
            Duration::from_secs(secs),
        )),
    };

    let (event_tx, event_rx) = std::sync::mpsc::channel();
    let dispatcher = Dispatcher::new(
        context.runtime.handle().clone(),
        context.backend.clone(),
        event_tx,
    );
    let state = ShellState::new(
        ChatSession::new(context.session_config()),
        MessageInputState::with_limit(context.config.chat.max_content_len),
    );
    let mut orchestrator = DefaultShellOrchestrator::new(state, ChatController::new(dispatcher));
    let mut event_source = ui::CrosstermEventSource::new(event_rx);

    ui::shell::start(context, &mut event_source, &mut orchestrator)
}

fn history_query(chat_id: Uuid, page: u32, page_size: usize) -> LoadMessagesQuery {
    LoadMessagesQuery::page(chat_id, PageRequest::numbered(page, page_size))
}

fn chat_row(chat: &ChatSummary) -> String {
    let preview = chat
        .last_message_preview
        .as_deref()
        .unwrap_or("No messages yet");
    format!(
        "[{}] {} ({} members): {}",
        chat.chat.kind.as_str(),
        chat.title(),
        chat.participant_count,
        preview
    )
}

fn message_row(message: &Message) -> String {
    let edited = if message.is_edited { " (edited)" } else { "" };
    format!(
        "{} {}: {}{}",
        message.created_at.with_timezone(&Local).format("%d.%m %H:%M"),
        message.sender_name(),
        message.display_content(),
        edited
    )
}
