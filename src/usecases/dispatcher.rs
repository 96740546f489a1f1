//! Runs backend calls off the shell thread and posts their results back as events.

use std::sync::{mpsc::Sender, Arc};

use tokio::runtime::Handle;
use uuid::Uuid;

use crate::{
    backend::ChatBackend,
    domain::{
        chat_session::{DeleteRequest, EditRequest, PageFetch, ReactionRequest, SendRequest},
        events::AppEvent,
    },
};

use super::{
    backend_events::BackendEvent,
    create_chat::{create_chat, CreateChatCommand},
    edit_message::{delete_message, edit_message},
    list_chats::{list_chats, ListChatsQuery},
    load_messages::{load_messages, LoadMessagesQuery},
    profiles::load_profile,
    reactions::apply_reaction,
    send_message::send_message,
};

const DISPATCH_RESULT_DROPPED: &str = "DISPATCH_RESULT_DROPPED";

pub struct Dispatcher<B: ChatBackend> {
    runtime: Handle,
    backend: Arc<B>,
    events: Sender<AppEvent>,
}

impl<B: ChatBackend> Dispatcher<B> {
    pub fn new(runtime: Handle, backend: Arc<B>, events: Sender<AppEvent>) -> Self {
        Self {
            runtime,
            backend,
            events,
        }
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn events(&self) -> Sender<AppEvent> {
        self.events.clone()
    }

    pub fn send(&self, request: SendRequest) {
        self.run("send_message", move |backend| BackendEvent::MessageSent {
            token: request.token,
            message_id: request.outgoing.id,
            result: send_message(backend, &request.outgoing),
        });
    }

    pub fn load_page(&self, fetch: PageFetch) {
        self.run("load_messages", move |backend| BackendEvent::PageLoaded {
            token: fetch.token,
            page: fetch.request.page,
            result: load_messages(backend, LoadMessagesQuery::page(fetch.chat_id, fetch.request)),
        });
    }

    pub fn edit(&self, request: EditRequest) {
        self.run("edit_message", move |backend| {
            let result = edit_message(backend, request.message_id, &request.content);
            BackendEvent::MessageEdited {
                token: request.token,
                message_id: request.message_id,
                content: request.content,
                result,
            }
        });
    }

    pub fn delete(&self, request: DeleteRequest) {
        self.run("delete_message", move |backend| BackendEvent::MessageDeleted {
            token: request.token,
            message_id: request.message_id,
            result: delete_message(backend, request.message_id),
        });
    }

    pub fn react(&self, request: ReactionRequest) {
        let token = match &request {
            ReactionRequest::Add { token, .. } | ReactionRequest::Remove { token, .. } => *token,
        };
        self.run("apply_reaction", move |backend| BackendEvent::ReactionApplied {
            token,
            result: apply_reaction(backend, &request),
        });
    }

    pub fn fetch_profile(&self, user_id: Uuid) {
        self.run("load_profile", move |backend| BackendEvent::ProfileLoaded {
            user_id,
            result: load_profile(backend, user_id),
        });
    }

    pub fn list_chats(&self, query: ListChatsQuery) {
        self.run("list_chats", move |backend| BackendEvent::ChatsLoaded {
            result: list_chats(backend, query),
        });
    }

    pub fn create_chat(&self, command: CreateChatCommand) {
        self.run("create_chat", move |backend| BackendEvent::ChatCreated {
            result: create_chat(backend, command),
        });
    }

    fn run<F>(&self, job: &'static str, call: F)
    where
        F: FnOnce(&B) -> BackendEvent + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();

        self.runtime.spawn_blocking(move || {
            let event = call(backend.as_ref());
            tracing::debug!(job, event = event.kind(), "backend call finished");

            if events.send(AppEvent::Backend(event)).is_err() {
                tracing::debug!(
                    code = DISPATCH_RESULT_DROPPED,
                    job,
                    "shell is gone; dropping backend result"
                );
            }
        });
    }
}
