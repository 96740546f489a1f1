//! Drives the open chat: turns user intents into session updates plus
//! background backend calls, and folds backend results back into state.

use uuid::Uuid;

use crate::{
    backend::{change_feed::ChangeFeedMonitor, ChangeFeed, ChatBackend, LinkControl},
    domain::{
        chat_session::{ChatSession, OutgoingDraft, SessionError, SessionToken},
        shell_state::ShellState,
    },
};

use super::{
    backend_events::BackendEvent,
    create_chat::CreateChatCommand,
    dispatcher::Dispatcher,
    list_chats::ListChatsQuery,
};

pub struct ChatController<B: ChatBackend> {
    dispatcher: Dispatcher<B>,
    feed: Option<ChangeFeedMonitor>,
}

impl<B: ChatBackend> ChatController<B> {
    pub fn new(dispatcher: Dispatcher<B>) -> Self {
        Self {
            dispatcher,
            feed: None,
        }
    }

    pub fn backend(&self) -> &B {
        self.dispatcher.backend()
    }

    /// Switches to `chat_id` with an empty cache and requests its newest page.
    ///
    /// The change feed is subscribed before the page request goes out so rows
    /// inserted in between still arrive.
    pub fn open_chat(&mut self, session: &mut ChatSession, chat_id: Uuid) -> SessionToken {
        self.feed = None;
        let token = session.open(chat_id);
        self.feed = Some(ChangeFeedMonitor::start(
            self.dispatcher.runtime(),
            self.dispatcher.backend().subscribe(),
            token,
            self.dispatcher.events(),
        ));

        tracing::info!(chat_id = %chat_id, generation = token.generation(), "chat opened");
        self.load_older(session);
        token
    }

    pub fn close_chat(&mut self, session: &mut ChatSession) {
        self.feed = None;
        if let Some(token) = session.close() {
            tracing::info!(chat_id = %token.chat_id(), "chat closed");
        }
    }

    pub fn send_text(&self, session: &mut ChatSession, text: &str) -> Result<Uuid, SessionError> {
        self.send(session, OutgoingDraft::text(text))
    }

    /// Renders the draft as pending, then dispatches the insert.
    pub fn send(&self, session: &mut ChatSession, draft: OutgoingDraft) -> Result<Uuid, SessionError> {
        let request = session.begin_send(draft)?;
        let message_id = request.outgoing.id;
        self.dispatcher.send(request);
        Ok(message_id)
    }

    pub fn retry(&self, session: &mut ChatSession, message_id: Uuid) -> Result<(), SessionError> {
        let request = session.begin_retry(message_id)?;
        self.dispatcher.send(request);
        Ok(())
    }

    pub fn discard(&self, session: &mut ChatSession, message_id: Uuid) -> Result<(), SessionError> {
        session.discard_failed(message_id)
    }

    /// Requests the next older page; false when one is in flight or history is exhausted.
    pub fn load_older(&self, session: &mut ChatSession) -> bool {
        match session.begin_load_page() {
            Some(fetch) => {
                tracing::debug!(
                    chat_id = %fetch.chat_id,
                    page = fetch.request.page,
                    "requesting history page"
                );
                self.dispatcher.load_page(fetch);
                true
            }
            None => false,
        }
    }

    pub fn edit(
        &self,
        session: &mut ChatSession,
        message_id: Uuid,
        content: &str,
    ) -> Result<(), SessionError> {
        let request = session.begin_edit(message_id, content)?;
        self.dispatcher.edit(request);
        Ok(())
    }

    pub fn delete(&self, session: &mut ChatSession, message_id: Uuid) -> Result<(), SessionError> {
        let request = session.begin_delete(message_id)?;
        self.dispatcher.delete(request);
        Ok(())
    }

    pub fn toggle_reaction(
        &self,
        session: &mut ChatSession,
        message_id: Uuid,
        emoji: &str,
    ) -> Result<(), SessionError> {
        let request = session.toggle_reaction(message_id, emoji)?;
        self.dispatcher.react(request);
        Ok(())
    }

    pub fn refresh_chats(&self, state: &mut ShellState) {
        state.chat_list_mut().set_loading();
        let user_id = state.session().user_id();
        self.dispatcher.list_chats(ListChatsQuery::first_page(user_id));
    }

    pub fn create_chat(&self, command: CreateChatCommand) {
        self.dispatcher.create_chat(command);
    }

    pub fn set_link_up(&self, state: &mut ShellState, up: bool) {
        self.dispatcher.backend().set_link_up(up);
        state.set_link_up(up);
        if up {
            state.session_mut().notices_mut().info("Back online");
        } else {
            state.session_mut().notices_mut().error("Offline: sends will fail until reconnected");
        }
    }

    /// Applies one backend result to the shell state.
    pub fn handle(&mut self, state: &mut ShellState, event: BackendEvent) {
        tracing::trace!(event = event.kind(), "applying backend event");

        match event {
            BackendEvent::MessageSent {
                token,
                message_id,
                result,
            } => {
                if let Err(error) = &result {
                    tracing::warn!(message_id = %message_id, error = %error, "message send failed");
                }
                state.session_mut().complete_send(token, message_id, result);
            }
            BackendEvent::PageLoaded {
                token,
                page,
                result,
            } => {
                state.session_mut().complete_page(token, page, result);
            }
            BackendEvent::MessageEdited {
                token,
                message_id,
                content,
                result,
            } => {
                state
                    .session_mut()
                    .complete_edit(token, message_id, &content, result);
            }
            BackendEvent::MessageDeleted {
                token,
                message_id,
                result,
            } => {
                state.session_mut().complete_delete(token, message_id, result);
            }
            BackendEvent::ReactionApplied { token, result } => {
                state.session_mut().complete_reaction(token, result);
            }
            BackendEvent::ProfileLoaded { user_id, result } => match result {
                Ok(profile) => state.session_mut().apply_profile(profile),
                Err(error) => {
                    tracing::debug!(user_id = %user_id, error = %error, "sender profile unavailable");
                    state.session_mut().profile_failed(user_id);
                }
            },
            BackendEvent::ChatsLoaded { result } => match result {
                Ok(chats) => state.chat_list_mut().set_ready(chats),
                Err(error) => {
                    state.chat_list_mut().set_error();
                    state
                        .session_mut()
                        .notices_mut()
                        .error(format!("Could not load chats: {error}"));
                }
            },
            BackendEvent::ChatCreated { result } => match result {
                Ok(summary) => {
                    let chat_id = summary.chat_id();
                    let title = summary.title().to_owned();
                    state.chat_list_mut().upsert_front(summary);
                    state
                        .session_mut()
                        .notices_mut()
                        .info(format!("Chat \"{title}\" is ready"));
                    self.open_chat(state.session_mut(), chat_id);
                }
                Err(error) => state
                    .session_mut()
                    .notices_mut()
                    .error(format!("Could not create chat: {error}")),
            },
            BackendEvent::RowChanged { token, change } => {
                state.session_mut().apply_change(token, change);
            }
            BackendEvent::FeedLagged { token, skipped } => {
                if state.session().is_current(token) {
                    tracing::warn!(
                        chat_id = %token.chat_id(),
                        skipped,
                        "live updates were missed; reloading chat"
                    );
                    state
                        .session_mut()
                        .notices_mut()
                        .info("Missed live updates, reloading chat");
                    self.open_chat(state.session_mut(), token.chat_id());
                }
            }
        }

        for user_id in state.session_mut().take_wanted_profiles() {
            self.dispatcher.fetch_profile(user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{
            mpsc::{self, Receiver},
            Arc,
        },
        time::{Duration, Instant},
    };

    use crate::{
        backend::{
            local::LocalBackend,
            seed::{seed_demo, JORDAN, JORDAN_CHAT, STAFF_CHAT, VARSITY_CHAT},
        },
        domain::{
            chat::ChatKind,
            chat_session::SessionConfig,
            events::AppEvent,
            message::DeliveryState,
            message_input_state::MessageInputState,
        },
        test_support::{profile, COACH},
    };

    struct Harness {
        runtime: tokio::runtime::Runtime,
        backend: Arc<LocalBackend>,
    }

    struct Tab {
        controller: ChatController<LocalBackend>,
        state: ShellState,
        events: Receiver<AppEvent>,
    }

    impl Harness {
        fn new(latency: Duration) -> Self {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("runtime");
            let backend = Arc::new(LocalBackend::new(COACH, latency));
            seed_demo(&backend, &profile(COACH, "Coach Carter")).expect("seed");
            Self { runtime, backend }
        }

        fn tab(&self) -> Tab {
            let (tx, rx) = mpsc::channel();
            let dispatcher =
                Dispatcher::new(self.runtime.handle().clone(), Arc::clone(&self.backend), tx);
            let session = ChatSession::new(SessionConfig {
                user: profile(COACH, "Coach Carter"),
                page_size: 50,
                max_content_len: 4000,
                orphan_reaction_limit: 16,
                notice_capacity: 16,
            });
            Tab {
                controller: ChatController::new(dispatcher),
                state: ShellState::new(session, MessageInputState::default()),
                events: rx,
            }
        }
    }

    impl Tab {
        /// Applies backend events until `done` holds or the deadline passes.
        fn pump_until(&mut self, done: impl Fn(&ShellState) -> bool) -> bool {
            let deadline = Instant::now() + Duration::from_secs(3);
            while !done(&self.state) {
                let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                    return false;
                };
                match self.events.recv_timeout(remaining) {
                    Ok(AppEvent::Backend(event)) => self.controller.handle(&mut self.state, event),
                    Ok(_) => {}
                    Err(_) => return false,
                }
            }
            true
        }

        /// Applies whatever arrives within `window`.
        fn drain_for(&mut self, window: Duration) {
            let deadline = Instant::now() + window;
            while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
                match self.events.recv_timeout(remaining) {
                    Ok(AppEvent::Backend(event)) => self.controller.handle(&mut self.state, event),
                    Ok(_) => {}
                    Err(_) => return,
                }
            }
        }

        fn open(&mut self, chat_id: Uuid) -> SessionToken {
            self.controller.open_chat(self.state.session_mut(), chat_id)
        }

        fn with_content<'a>(&'a self, text: &'a str) -> impl Iterator<Item = crate::domain::message::Message> + 'a {
            self.state
                .session()
                .snapshot()
                .into_iter()
                .filter(move |m| m.content.as_deref() == Some(text))
        }
    }

    #[test]
    fn opening_chat_loads_newest_page_then_older_pages() {
        let harness = Harness::new(Duration::ZERO);
        let mut tab = harness.tab();

        tab.open(VARSITY_CHAT);
        assert!(tab.pump_until(|s| s.session().snapshot().len() == 50));
        assert!(tab.state.session().has_more());

        assert!(tab.controller.load_older(tab.state.session_mut()));
        assert!(tab.pump_until(|s| s.session().snapshot().len() == 100));

        assert!(tab.controller.load_older(tab.state.session_mut()));
        assert!(tab.pump_until(|s| !s.session().is_loading_page()));

        assert_eq!(tab.state.session().snapshot().len(), 120);
        assert!(!tab.state.session().has_more());
        assert!(!tab.controller.load_older(tab.state.session_mut()));
    }

    #[test]
    fn sent_message_is_confirmed_once_after_ack_and_realtime_echo() {
        let harness = Harness::new(Duration::from_millis(20));
        let mut tab = harness.tab();
        tab.open(STAFF_CHAT);
        assert!(tab.pump_until(|s| s.session().snapshot().len() == 3));

        let id = tab
            .controller
            .send_text(tab.state.session_mut(), "Gym is booked")
            .expect("send");
        assert_eq!(
            tab.state.session().message(id).map(|m| m.delivery.clone()),
            Some(DeliveryState::Pending)
        );

        assert!(tab.pump_until(|s| s
            .session()
            .message(id)
            .is_some_and(|m| m.delivery == DeliveryState::Confirmed)));
        tab.drain_for(Duration::from_millis(100));

        assert_eq!(tab.with_content("Gym is booked").count(), 1);
        assert_eq!(tab.state.session().snapshot().len(), 4);
    }

    #[test]
    fn offline_send_fails_then_retry_delivers_single_copy() {
        let harness = Harness::new(Duration::ZERO);
        let mut tab = harness.tab();
        tab.open(STAFF_CHAT);
        assert!(tab.pump_until(|s| s.session().snapshot().len() == 3));

        tab.controller.set_link_up(&mut tab.state, false);
        let id = tab
            .controller
            .send_text(tab.state.session_mut(), "hello")
            .expect("send");
        assert!(tab.pump_until(|s| s
            .session()
            .message(id)
            .is_some_and(|m| m.delivery.is_failed())));
        assert!(tab
            .state
            .session()
            .notices()
            .latest()
            .is_some_and(|n| n.text.starts_with("Message not sent")));

        tab.controller.set_link_up(&mut tab.state, true);
        tab.controller
            .retry(tab.state.session_mut(), id)
            .expect("retry");
        assert!(tab.pump_until(|s| s
            .session()
            .message(id)
            .is_some_and(|m| m.delivery == DeliveryState::Confirmed)));
        tab.drain_for(Duration::from_millis(100));

        assert_eq!(tab.with_content("hello").count(), 1);
    }

    #[test]
    fn identical_sends_from_two_tabs_stay_two_messages() {
        let harness = Harness::new(Duration::from_millis(10));
        let mut tab_a = harness.tab();
        let mut tab_b = harness.tab();
        tab_a.open(STAFF_CHAT);
        tab_b.open(STAFF_CHAT);
        assert!(tab_a.pump_until(|s| s.session().snapshot().len() == 3));
        assert!(tab_b.pump_until(|s| s.session().snapshot().len() == 3));

        tab_a
            .controller
            .send_text(tab_a.state.session_mut(), "hi")
            .expect("send");
        tab_b
            .controller
            .send_text(tab_b.state.session_mut(), "hi")
            .expect("send");

        for tab in [&mut tab_a, &mut tab_b] {
            assert!(tab.pump_until(|s| {
                let copies: Vec<_> = s
                    .session()
                    .snapshot()
                    .into_iter()
                    .filter(|m| m.content.as_deref() == Some("hi"))
                    .collect();
                copies.len() == 2 && copies.iter().all(|m| m.delivery == DeliveryState::Confirmed)
            }));
            tab.drain_for(Duration::from_millis(50));
            assert_eq!(tab.with_content("hi").count(), 2);
        }
    }

    #[test]
    fn switching_chats_discards_results_of_the_previous_open() {
        let harness = Harness::new(Duration::from_millis(80));
        let mut tab = harness.tab();
        tab.open(STAFF_CHAT);
        assert!(tab.pump_until(|s| s.session().snapshot().len() == 3));

        tab.controller
            .send_text(tab.state.session_mut(), "for staff only")
            .expect("send");
        tab.open(JORDAN_CHAT);
        assert!(tab.pump_until(|s| s.session().snapshot().len() == 1));
        tab.drain_for(Duration::from_millis(250));

        assert_eq!(tab.with_content("for staff only").count(), 0);
        assert!(tab
            .state
            .session()
            .snapshot()
            .iter()
            .all(|m| m.chat_id == JORDAN_CHAT));
    }

    #[test]
    fn lagged_feed_reloads_current_chat_and_ignores_stale_lag() {
        let harness = Harness::new(Duration::ZERO);
        let mut tab = harness.tab();
        let first = tab.open(STAFF_CHAT);
        assert!(tab.pump_until(|s| s.session().snapshot().len() == 3));

        tab.controller.handle(
            &mut tab.state,
            BackendEvent::FeedLagged {
                token: first,
                skipped: 4,
            },
        );
        let reloaded = tab.state.session().token().expect("chat stays open");
        assert_ne!(reloaded, first);
        assert_eq!(reloaded.chat_id(), STAFF_CHAT);
        assert!(tab
            .state
            .session()
            .notices()
            .latest()
            .is_some_and(|n| n.text.starts_with("Missed live updates")));
        assert!(tab.pump_until(|s| s.session().snapshot().len() == 3));

        tab.controller.handle(
            &mut tab.state,
            BackendEvent::FeedLagged {
                token: first,
                skipped: 1,
            },
        );
        assert_eq!(tab.state.session().token(), Some(reloaded));
    }

    #[test]
    fn teammate_message_arrives_with_fetched_profile() {
        let harness = Harness::new(Duration::ZERO);
        let mut tab = harness.tab();
        tab.open(VARSITY_CHAT);
        assert!(tab.pump_until(|s| s.session().snapshot().len() == 50));

        let row = harness
            .backend
            .post_as(JORDAN, VARSITY_CHAT, "Running late!")
            .expect("post");

        assert!(tab.pump_until(|s| s
            .session()
            .message(row.id)
            .is_some_and(|m| m.sender_name() == "Jordan Miles")));
    }

    #[test]
    fn edit_delete_and_reaction_round_trip() {
        let harness = Harness::new(Duration::ZERO);
        let mut tab = harness.tab();
        tab.open(STAFF_CHAT);
        assert!(tab.pump_until(|s| s.session().snapshot().len() == 3));
        let id = tab
            .controller
            .send_text(tab.state.session_mut(), "Meet at 5")
            .expect("send");
        assert!(tab.pump_until(|s| s
            .session()
            .message(id)
            .is_some_and(|m| m.delivery == DeliveryState::Confirmed)));

        tab.controller
            .edit(tab.state.session_mut(), id, "Meet at 6")
            .expect("edit");
        assert!(tab.pump_until(|s| s.session().message(id).is_some_and(|m| m.is_edited
            && m.content.as_deref() == Some("Meet at 6"))));

        tab.controller
            .toggle_reaction(tab.state.session_mut(), id, "👍")
            .expect("react");
        assert!(tab.pump_until(|s| s
            .session()
            .message(id)
            .is_some_and(|m| m.reactions.len() == 1)));

        tab.controller
            .delete(tab.state.session_mut(), id)
            .expect("delete");
        assert!(tab.pump_until(|s| s.session().message(id).is_none()));
        tab.drain_for(Duration::from_millis(50));
        assert_eq!(tab.state.session().snapshot().len(), 3);
    }

    #[test]
    fn created_chat_is_listed_and_opened() {
        let harness = Harness::new(Duration::ZERO);
        let mut tab = harness.tab();
        tab.controller.refresh_chats(&mut tab.state);
        assert!(tab.pump_until(|s| s.chat_list().chats().len() == 3));

        tab.controller.create_chat(CreateChatCommand {
            creator_id: COACH,
            name: "Parents".to_owned(),
            kind: ChatKind::Group,
            member_ids: vec![JORDAN],
            team_id: None,
        });

        assert!(tab.pump_until(|s| s.chat_list().chats().len() == 4));
        assert_eq!(
            tab.state.chat_list().chats()[0].title(),
            "Parents"
        );
        assert_eq!(
            tab.state.session().chat_id(),
            Some(tab.state.chat_list().chats()[0].chat_id())
        );
    }
}
