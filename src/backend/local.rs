//! In-process stand-in for the hosted chat backend.
//!
//! Holds the chat tables behind one lock, enforces the row-level rules the
//! hosted service applies for the signed-in user, and publishes every row
//! change on a broadcast feed. Calls block for the configured latency so the
//! optimistic paths are observable.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    domain::{
        chat::{Chat, ChatKind, ChatSummary, Participant, ParticipantRole},
        chat_session::OutgoingMessage,
        events::RowChange,
        message::{DeliveryState, Message, MessagePatch, Reaction, SenderProfile},
    },
    usecases::{
        create_chat::{ChatCreator, CreateChatCommand},
        edit_message::MessageEditor,
        list_chats::ChatsSource,
        load_messages::MessagesSource,
        profiles::ProfileSource,
        reactions::ReactionWriter,
        send_message::MessageSender,
    },
};

use super::{ChangeEnvelope, ChangeFeed, GatewayError, LinkControl};

const CHANGE_FEED_CAPACITY: usize = 1024;
const MAX_STORED_CONTENT_LEN: usize = 4000;
const PREVIEW_LEN: usize = 60;

#[derive(Debug, Default)]
struct Tables {
    chats: HashMap<Uuid, Chat>,
    participants: Vec<Participant>,
    /// Insertion order doubles as the tie-breaker for equal timestamps.
    messages: Vec<Message>,
    reactions: Vec<Reaction>,
    profiles: HashMap<Uuid, SenderProfile>,
}

impl Tables {
    fn is_participant(&self, chat_id: Uuid, user_id: Uuid) -> bool {
        self.participants
            .iter()
            .any(|p| p.chat_id == chat_id && p.user_id == user_id)
    }

    fn message(&self, id: Uuid) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn message_mut(&mut self, id: Uuid) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    fn summary(&self, chat: &Chat, viewer: Uuid) -> ChatSummary {
        let members: Vec<Uuid> = self
            .participants
            .iter()
            .filter(|p| p.chat_id == chat.id)
            .map(|p| p.user_id)
            .collect();

        let last = self
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.chat_id == chat.id)
            .max_by_key(|(seq, m)| (m.created_at, *seq))
            .map(|(_, m)| m);

        let mut chat = chat.clone();
        if chat.kind == ChatKind::Private && chat.name.is_empty() {
            if let Some(other) = members
                .iter()
                .find(|id| **id != viewer)
                .and_then(|id| self.profiles.get(id))
            {
                chat.name = other.display_name.clone();
            }
        }

        ChatSummary {
            chat,
            participant_count: members.len(),
            last_message_preview: last.map(|m| preview(&m.display_content())),
            last_message_at: last.map(|m| m.created_at),
        }
    }
}

#[derive(Debug)]
pub struct LocalBackend {
    auth_user: Uuid,
    latency: Duration,
    link_up: AtomicBool,
    tables: Mutex<Tables>,
    changes: broadcast::Sender<ChangeEnvelope>,
}

impl LocalBackend {
    /// Backend session signed in as `auth_user`.
    pub fn new(auth_user: Uuid, latency: Duration) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            auth_user,
            latency,
            link_up: AtomicBool::new(true),
            tables: Mutex::new(Tables::default()),
            changes,
        }
    }

    pub fn auth_user(&self) -> Uuid {
        self.auth_user
    }

    pub fn put_profile(&self, profile: SenderProfile) -> Result<(), GatewayError> {
        self.tables()?.profiles.insert(profile.user_id, profile);
        Ok(())
    }

    /// Stores a chat and its members without access checks.
    pub fn put_chat(&self, chat: Chat, members: &[(Uuid, ParticipantRole)]) -> Result<(), GatewayError> {
        let mut tables = self.tables()?;
        for (user_id, role) in members {
            tables.participants.push(Participant {
                chat_id: chat.id,
                user_id: *user_id,
                role: *role,
                joined_at: chat.updated_at,
            });
        }
        tables.chats.insert(chat.id, chat);
        Ok(())
    }

    /// Stores a historical row without publishing it.
    pub fn put_message(&self, mut row: Message) -> Result<(), GatewayError> {
        let mut tables = self.tables()?;
        row.sender = None;
        row.delivery = DeliveryState::Confirmed;
        let reactions = std::mem::take(&mut row.reactions);
        tables.reactions.extend(reactions);
        if let Some(chat) = tables.chats.get_mut(&row.chat_id) {
            chat.updated_at = chat.updated_at.max(row.created_at);
        }
        tables.messages.push(row);
        Ok(())
    }

    /// Inserts a message on behalf of another member and publishes it.
    pub fn post_as(
        &self,
        sender_id: Uuid,
        chat_id: Uuid,
        content: &str,
    ) -> Result<Message, GatewayError> {
        let outgoing = OutgoingMessage {
            id: Uuid::new_v4(),
            chat_id,
            sender_id,
            content: Some(content.to_owned()),
            kind: Default::default(),
            media: None,
            created_at: Utc::now(),
        };
        self.store_message(&outgoing)
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, GatewayError> {
        self.tables
            .lock()
            .map_err(|_| GatewayError::InvalidData("backend state poisoned".to_owned()))
    }

    /// Simulates the round trip; fails fast while the link is down.
    fn round_trip(&self) -> Result<(), GatewayError> {
        if !self.is_link_up() {
            return Err(GatewayError::Unavailable);
        }
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        if !self.is_link_up() {
            return Err(GatewayError::Unavailable);
        }
        Ok(())
    }

    fn publish(&self, chat_id: Uuid, change: RowChange) {
        let kind = change.kind();
        // No receivers simply means no chat is open.
        if self.changes.send(ChangeEnvelope { chat_id, change }).is_err() {
            tracing::trace!(change = kind, "row change published without subscribers");
        }
    }

    fn store_message(&self, outgoing: &OutgoingMessage) -> Result<Message, GatewayError> {
        let row = {
            let mut tables = self.tables()?;
            if !tables.chats.contains_key(&outgoing.chat_id) {
                return Err(GatewayError::NotFound("chat"));
            }
            if !tables.is_participant(outgoing.chat_id, outgoing.sender_id) {
                return Err(GatewayError::Unauthorized);
            }
            if let Some(existing) = tables.message(outgoing.id) {
                // Replayed insert with the same client id.
                if existing.chat_id == outgoing.chat_id && existing.sender_id == outgoing.sender_id
                {
                    return Ok(existing.clone());
                }
                return Err(GatewayError::Rejected("duplicate message id".to_owned()));
            }
            if outgoing
                .content
                .as_deref()
                .is_some_and(|text| text.chars().count() > MAX_STORED_CONTENT_LEN)
            {
                return Err(GatewayError::Rejected(format!(
                    "content exceeds {MAX_STORED_CONTENT_LEN} characters"
                )));
            }

            let mut row = Message::text(
                outgoing.id,
                outgoing.chat_id,
                outgoing.sender_id,
                String::new(),
                outgoing.created_at,
            );
            row.content = outgoing.content.clone();
            row.kind = outgoing.kind;
            row.media = outgoing.media.clone();

            if let Some(chat) = tables.chats.get_mut(&outgoing.chat_id) {
                chat.updated_at = chat.updated_at.max(outgoing.created_at);
            }
            tables.messages.push(row.clone());
            row
        };

        self.publish(row.chat_id, RowChange::MessageInserted(row.clone()));
        Ok(row)
    }
}

impl MessageSender for LocalBackend {
    fn insert_message(&self, outgoing: &OutgoingMessage) -> Result<Message, GatewayError> {
        self.round_trip()?;
        if outgoing.sender_id != self.auth_user {
            return Err(GatewayError::Unauthorized);
        }
        self.store_message(outgoing)
    }
}

impl MessagesSource for LocalBackend {
    fn list_messages(
        &self,
        chat_id: Uuid,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Message>, GatewayError> {
        self.round_trip()?;
        let tables = self.tables()?;
        if !tables.chats.contains_key(&chat_id) {
            return Err(GatewayError::NotFound("chat"));
        }
        if !tables.is_participant(chat_id, self.auth_user) {
            return Err(GatewayError::Unauthorized);
        }

        let mut rows: Vec<(usize, &Message)> = tables
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.chat_id == chat_id)
            .collect();
        rows.sort_by(|(a_seq, a), (b_seq, b)| {
            b.created_at.cmp(&a.created_at).then(b_seq.cmp(a_seq))
        });

        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, m)| {
                let mut row = m.clone();
                row.reactions = tables
                    .reactions
                    .iter()
                    .filter(|r| r.message_id == row.id)
                    .cloned()
                    .collect();
                row.sender = tables.profiles.get(&row.sender_id).cloned();
                row
            })
            .collect())
    }
}

impl MessageEditor for LocalBackend {
    fn update_message_content(
        &self,
        message_id: Uuid,
        content: &str,
    ) -> Result<(), GatewayError> {
        self.round_trip()?;
        let (chat_id, patch) = {
            let mut tables = self.tables()?;
            let auth_user = self.auth_user;
            let row = tables
                .message_mut(message_id)
                .ok_or(GatewayError::NotFound("message"))?;
            if row.sender_id != auth_user {
                return Err(GatewayError::Unauthorized);
            }
            if row.is_recalled {
                return Err(GatewayError::Rejected("message was recalled".to_owned()));
            }
            if content.chars().count() > MAX_STORED_CONTENT_LEN {
                return Err(GatewayError::Rejected(format!(
                    "content exceeds {MAX_STORED_CONTENT_LEN} characters"
                )));
            }

            let now = Utc::now();
            row.content = Some(content.to_owned());
            row.is_edited = true;
            row.edited_at = Some(now);
            (
                row.chat_id,
                MessagePatch {
                    id: row.id,
                    content: row.content.clone(),
                    is_edited: true,
                    edited_at: Some(now),
                    is_recalled: row.is_recalled,
                    is_archived: row.is_archived,
                },
            )
        };

        self.publish(chat_id, RowChange::MessageUpdated(patch));
        Ok(())
    }

    fn delete_message(&self, message_id: Uuid) -> Result<(), GatewayError> {
        self.round_trip()?;
        let chat_id = {
            let mut tables = self.tables()?;
            let row = tables
                .message(message_id)
                .ok_or(GatewayError::NotFound("message"))?;
            if row.sender_id != self.auth_user {
                return Err(GatewayError::Unauthorized);
            }
            let chat_id = row.chat_id;
            tables.messages.retain(|m| m.id != message_id);
            tables.reactions.retain(|r| r.message_id != message_id);
            chat_id
        };

        self.publish(chat_id, RowChange::MessageDeleted { id: message_id });
        Ok(())
    }
}

impl ReactionWriter for LocalBackend {
    fn add_reaction(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        emoji: &str,
    ) -> Result<Reaction, GatewayError> {
        self.round_trip()?;
        if user_id != self.auth_user {
            return Err(GatewayError::Unauthorized);
        }

        let (chat_id, reaction) = {
            let mut tables = self.tables()?;
            let chat_id = tables
                .message(message_id)
                .map(|m| m.chat_id)
                .ok_or(GatewayError::NotFound("message"))?;
            if !tables.is_participant(chat_id, user_id) {
                return Err(GatewayError::Unauthorized);
            }
            if let Some(existing) = tables
                .reactions
                .iter()
                .find(|r| r.message_id == message_id && r.user_id == user_id && r.emoji == emoji)
            {
                return Ok(existing.clone());
            }

            let reaction = Reaction {
                id: Uuid::new_v4(),
                message_id,
                user_id,
                emoji: emoji.to_owned(),
                created_at: Utc::now(),
            };
            tables.reactions.push(reaction.clone());
            (chat_id, reaction)
        };

        self.publish(chat_id, RowChange::ReactionInserted(reaction.clone()));
        Ok(reaction)
    }

    fn remove_reaction(&self, reaction_id: Uuid) -> Result<(), GatewayError> {
        self.round_trip()?;
        let (chat_id, message_id) = {
            let mut tables = self.tables()?;
            let reaction = tables
                .reactions
                .iter()
                .find(|r| r.id == reaction_id)
                .cloned()
                .ok_or(GatewayError::NotFound("reaction"))?;
            if reaction.user_id != self.auth_user {
                return Err(GatewayError::Unauthorized);
            }
            let chat_id = tables
                .message(reaction.message_id)
                .map(|m| m.chat_id)
                .ok_or(GatewayError::NotFound("message"))?;
            tables.reactions.retain(|r| r.id != reaction_id);
            (chat_id, reaction.message_id)
        };

        self.publish(
            chat_id,
            RowChange::ReactionDeleted {
                id: reaction_id,
                message_id,
            },
        );
        Ok(())
    }
}

impl ProfileSource for LocalBackend {
    fn fetch_profile(&self, user_id: Uuid) -> Result<SenderProfile, GatewayError> {
        self.round_trip()?;
        self.tables()?
            .profiles
            .get(&user_id)
            .cloned()
            .ok_or(GatewayError::NotFound("profile"))
    }
}

impl ChatsSource for LocalBackend {
    fn list_chats(
        &self,
        user_id: Uuid,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ChatSummary>, GatewayError> {
        self.round_trip()?;
        if user_id != self.auth_user {
            return Err(GatewayError::Unauthorized);
        }

        let tables = self.tables()?;
        let mut summaries: Vec<ChatSummary> = tables
            .chats
            .values()
            .filter(|chat| !chat.is_archived && tables.is_participant(chat.id, user_id))
            .map(|chat| tables.summary(chat, user_id))
            .collect();
        summaries.sort_by(|a, b| {
            activity(b)
                .cmp(&activity(a))
                .then_with(|| a.chat.name.cmp(&b.chat.name))
        });

        Ok(summaries.into_iter().skip(offset).take(limit).collect())
    }
}

impl ChatCreator for LocalBackend {
    fn create_chat(&self, command: &CreateChatCommand) -> Result<ChatSummary, GatewayError> {
        self.round_trip()?;
        if command.creator_id != self.auth_user {
            return Err(GatewayError::Unauthorized);
        }

        let mut tables = self.tables()?;
        if let Some(missing) = command
            .member_ids
            .iter()
            .chain(std::iter::once(&command.creator_id))
            .find(|id| !tables.profiles.contains_key(*id))
        {
            tracing::debug!(user_id = %missing, "chat member has no profile");
            return Err(GatewayError::NotFound("profile"));
        }

        if command.kind == ChatKind::Private {
            let existing = tables
                .chats
                .values()
                .filter(|chat| chat.kind == ChatKind::Private && !chat.is_archived)
                .find(|chat| {
                    tables.is_participant(chat.id, command.creator_id)
                        && command
                            .member_ids
                            .iter()
                            .all(|id| tables.is_participant(chat.id, *id))
                });
            if let Some(chat) = existing {
                return Ok(tables.summary(chat, command.creator_id));
            }
        }

        let now = Utc::now();
        let chat = Chat {
            id: Uuid::new_v4(),
            name: command.name.clone(),
            kind: command.kind,
            created_by: command.creator_id,
            team_id: command.team_id,
            is_archived: false,
            updated_at: now,
        };

        tables.participants.push(Participant {
            chat_id: chat.id,
            user_id: command.creator_id,
            role: ParticipantRole::Admin,
            joined_at: now,
        });
        for member in &command.member_ids {
            tables.participants.push(Participant {
                chat_id: chat.id,
                user_id: *member,
                role: ParticipantRole::Member,
                joined_at: now,
            });
        }
        tables.chats.insert(chat.id, chat.clone());

        Ok(tables.summary(&chat, command.creator_id))
    }
}

impl ChangeFeed for LocalBackend {
    fn subscribe(&self) -> broadcast::Receiver<ChangeEnvelope> {
        self.changes.subscribe()
    }
}

impl LinkControl for LocalBackend {
    fn set_link_up(&self, up: bool) {
        let was_up = self.link_up.swap(up, Ordering::SeqCst);
        if was_up != up {
            tracing::info!(link_up = up, "backend link switched");
        }
    }

    fn is_link_up(&self) -> bool {
        self.link_up.load(Ordering::SeqCst)
    }
}

fn activity(summary: &ChatSummary) -> DateTime<Utc> {
    summary
        .last_message_at
        .unwrap_or(summary.chat.updated_at)
        .max(summary.chat.updated_at)
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_LEN).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::message::MessageKind,
        test_support::{at, profile, text_message, CHAT, COACH, OTHER_CHAT, PLAYER},
    };

    fn backend() -> LocalBackend {
        let backend = LocalBackend::new(COACH, Duration::ZERO);
        backend.put_profile(profile(COACH, "Coach Carter")).expect("profile");
        backend.put_profile(profile(PLAYER, "Jordan Miles")).expect("profile");
        backend
            .put_chat(
                Chat {
                    id: CHAT,
                    name: "Varsity".to_owned(),
                    kind: ChatKind::Team,
                    created_by: COACH,
                    team_id: Some(Uuid::from_u128(0xf0)),
                    is_archived: false,
                    updated_at: at(0),
                },
                &[(COACH, ParticipantRole::Admin), (PLAYER, ParticipantRole::Member)],
            )
            .expect("chat");
        backend
    }

    fn outgoing(id: u128, content: &str) -> OutgoingMessage {
        OutgoingMessage {
            id: Uuid::from_u128(id),
            chat_id: CHAT,
            sender_id: COACH,
            content: Some(content.to_owned()),
            kind: MessageKind::Text,
            media: None,
            created_at: at(id as i64),
        }
    }

    #[test]
    fn insert_keeps_client_id_and_publishes_row() {
        let backend = backend();
        let mut feed = backend.subscribe();

        let row = backend.insert_message(&outgoing(1, "hi")).expect("insert");

        assert_eq!(row.id, Uuid::from_u128(1));
        let envelope = feed.try_recv().expect("published");
        assert_eq!(envelope.chat_id, CHAT);
        assert_eq!(envelope.change, RowChange::MessageInserted(row));
    }

    #[test]
    fn replayed_insert_is_idempotent() {
        let backend = backend();

        backend.insert_message(&outgoing(1, "hi")).expect("insert");
        backend.insert_message(&outgoing(1, "hi")).expect("replay");

        let rows = backend.list_messages(CHAT, 0, 50).expect("list");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn insert_into_foreign_chat_is_unauthorized() {
        let backend = backend();
        backend
            .put_chat(
                Chat {
                    id: OTHER_CHAT,
                    name: "Staff".to_owned(),
                    kind: ChatKind::Group,
                    created_by: PLAYER,
                    team_id: None,
                    is_archived: false,
                    updated_at: at(0),
                },
                &[(PLAYER, ParticipantRole::Admin)],
            )
            .expect("chat");
        let mut message = outgoing(1, "hi");
        message.chat_id = OTHER_CHAT;

        assert_eq!(
            backend.insert_message(&message),
            Err(GatewayError::Unauthorized)
        );
    }

    #[test]
    fn link_down_fails_every_call() {
        let backend = backend();
        backend.set_link_up(false);

        assert_eq!(
            backend.insert_message(&outgoing(1, "hi")),
            Err(GatewayError::Unavailable)
        );
        assert_eq!(
            backend.list_messages(CHAT, 0, 50),
            Err(GatewayError::Unavailable)
        );
    }

    #[test]
    fn pages_are_newest_first_with_offset() {
        let backend = backend();
        for n in 0..5u128 {
            backend
                .put_message(text_message(n, PLAYER, &format!("m{n}"), at(n as i64)))
                .expect("seed");
        }

        let page: Vec<_> = backend
            .list_messages(CHAT, 1, 2)
            .expect("list")
            .into_iter()
            .map(|m| m.content.unwrap_or_default())
            .collect();

        assert_eq!(page, vec!["m3", "m2"]);
    }

    #[test]
    fn listed_rows_carry_sender_profile_and_reactions() {
        let backend = backend();
        backend
            .put_message(text_message(1, PLAYER, "ready", at(1)))
            .expect("seed");
        backend
            .add_reaction(Uuid::from_u128(1), COACH, "👍")
            .expect("react");

        let rows = backend.list_messages(CHAT, 0, 50).expect("list");

        assert_eq!(rows[0].sender_name(), "Jordan Miles");
        assert_eq!(rows[0].reactions.len(), 1);
    }

    #[test]
    fn only_author_can_edit_or_delete() {
        let backend = backend();
        backend
            .put_message(text_message(1, PLAYER, "theirs", at(1)))
            .expect("seed");

        assert_eq!(
            backend.update_message_content(Uuid::from_u128(1), "mine"),
            Err(GatewayError::Unauthorized)
        );
        assert_eq!(
            backend.delete_message(Uuid::from_u128(1)),
            Err(GatewayError::Unauthorized)
        );
    }

    #[test]
    fn edit_publishes_patch() {
        let backend = backend();
        backend.insert_message(&outgoing(1, "5pm")).expect("insert");
        let mut feed = backend.subscribe();

        backend
            .update_message_content(Uuid::from_u128(1), "6pm")
            .expect("edit");

        match feed.try_recv().expect("published").change {
            RowChange::MessageUpdated(patch) => {
                assert_eq!(patch.content.as_deref(), Some("6pm"));
                assert!(patch.is_edited);
            }
            other => panic!("unexpected change: {other:?}"),
        }
    }

    #[test]
    fn duplicate_reaction_returns_existing_row() {
        let backend = backend();
        backend.insert_message(&outgoing(1, "go")).expect("insert");

        let first = backend
            .add_reaction(Uuid::from_u128(1), COACH, "🔥")
            .expect("react");
        let second = backend
            .add_reaction(Uuid::from_u128(1), COACH, "🔥")
            .expect("react");

        assert_eq!(first.id, second.id);
    }

    #[test]
    fn chat_list_uses_counterpart_name_for_private_chats() {
        let backend = backend();
        let summary = backend
            .create_chat(&CreateChatCommand {
                creator_id: COACH,
                name: String::new(),
                kind: ChatKind::Private,
                member_ids: vec![PLAYER],
                team_id: None,
            })
            .expect("create");

        assert_eq!(summary.title(), "Jordan Miles");
        assert_eq!(summary.participant_count, 2);

        let again = backend
            .create_chat(&CreateChatCommand {
                creator_id: COACH,
                name: String::new(),
                kind: ChatKind::Private,
                member_ids: vec![PLAYER],
                team_id: None,
            })
            .expect("create");
        assert_eq!(again.chat_id(), summary.chat_id());

        let chats = backend.list_chats(COACH, 50, 0).expect("list");
        assert_eq!(chats.len(), 2);
    }

    #[test]
    fn chat_list_is_ordered_by_latest_activity() {
        let backend = backend();
        let staff = backend
            .create_chat(&CreateChatCommand {
                creator_id: COACH,
                name: "Staff".to_owned(),
                kind: ChatKind::Group,
                member_ids: vec![PLAYER],
                team_id: None,
            })
            .expect("create");
        backend.insert_message(&outgoing(1, "first")).expect("insert");
        let mut later = outgoing(2, "bump");
        later.created_at = Utc::now() + chrono::Duration::seconds(60);
        backend.insert_message(&later).expect("insert");

        let chats = backend.list_chats(COACH, 50, 0).expect("list");

        assert_eq!(chats[0].chat_id(), CHAT);
        assert_eq!(chats[0].last_message_preview.as_deref(), Some("bump"));
        assert_eq!(chats[1].chat_id(), staff.chat_id());
    }
}
