//! State of the open conversation: the message cache plus everything that writes into it.
//!
//! Three paths mutate the cache: optimistic sends, realtime row changes and
//! history pages. All of them run on the shell thread. Every request handed
//! out carries a [`SessionToken`]; results presented with a token from a
//! previous `open` are dropped before they touch any state.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::{
    events::RowChange,
    message::{
        DeliveryState, EditRecord, MediaRef, Message, MessageKind, MessagePatch, Reaction,
        SenderProfile,
    },
    message_cache::{CacheWrite, MessageCache},
    notices::NoticeQueue,
    orphan_reactions::OrphanReactions,
    pagination::{PageRequest, PaginationState},
};

pub const DEFAULT_MAX_CONTENT_LEN: usize = 4000;

/// Identifies one `open` of one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken {
    chat_id: Uuid,
    generation: u64,
}

impl SessionToken {
    pub fn chat_id(&self) -> Uuid {
        self.chat_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub user: SenderProfile,
    pub page_size: usize,
    pub max_content_len: usize,
    pub orphan_reaction_limit: usize,
    pub notice_capacity: usize,
}

/// What the user submitted from the input line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutgoingDraft {
    pub content: Option<String>,
    pub kind: MessageKind,
    pub media: Option<MediaRef>,
}

impl OutgoingDraft {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Trims the text and checks it against the content rules.
    fn normalized(self, max_len: usize) -> Result<Self, DraftError> {
        let content = self
            .content
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());

        if content.is_none() && self.media.is_none() {
            return Err(DraftError::Empty);
        }

        if let Some(text) = &content {
            if text.chars().count() > max_len {
                return Err(DraftError::TooLong { max: max_len });
            }
        }

        Ok(Self { content, ..self })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("message is empty")]
    Empty,
    #[error("message is longer than {max} characters")]
    TooLong { max: usize },
}

/// Row the send path asks the backend to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub content: Option<String>,
    pub kind: MessageKind,
    pub media: Option<MediaRef>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub token: SessionToken,
    pub outgoing: OutgoingMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFetch {
    pub token: SessionToken,
    pub chat_id: Uuid,
    pub request: PageRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub token: SessionToken,
    pub message_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub token: SessionToken,
    pub message_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionRequest {
    Add {
        token: SessionToken,
        message_id: Uuid,
        user_id: Uuid,
        emoji: String,
    },
    Remove {
        token: SessionToken,
        message_id: Uuid,
        reaction_id: Uuid,
    },
}

/// Result of a reaction write as acknowledged by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionChange {
    Added(Reaction),
    Removed { reaction_id: Uuid, message_id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no chat is open")]
    NotOpen,
    #[error("message is not loaded")]
    UnknownMessage,
    #[error("only failed messages can be retried")]
    NotRetryable,
    #[error("only your own messages can be changed")]
    NotOwnMessage,
    #[error("message is still being delivered")]
    NotDelivered,
    #[error("recalled messages cannot be edited")]
    Recalled,
    #[error("nothing changed")]
    Unchanged,
    #[error(transparent)]
    Draft(#[from] DraftError),
}

/// One edit request that has not been both acknowledged and echoed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
struct InFlightEdit {
    content: String,
    requested_at: DateTime<Utc>,
    acked: bool,
    echoed: bool,
}

/// Local edits of one message racing the backend, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingEdit {
    content: Option<String>,
    is_edited: bool,
    edited_at: Option<DateTime<Utc>>,
    history_len: usize,
    in_flight: Vec<InFlightEdit>,
}

impl PendingEdit {
    fn is_settled(&self) -> bool {
        self.in_flight.iter().all(|edit| edit.acked && edit.echoed)
    }

    fn prune(&mut self) {
        self.in_flight.retain(|edit| !(edit.acked && edit.echoed));
    }

    /// Marks the oldest unechoed request with this content and returns its
    /// position. `None` means the content is foreign.
    fn mark_echoed(&mut self, content: Option<&str>) -> Option<usize> {
        let content = content?;
        let index = self
            .in_flight
            .iter()
            .position(|edit| !edit.echoed && edit.content == content)?;
        self.in_flight[index].echoed = true;
        Some(index)
    }

    /// Rebuilds content and history from the snapshot plus the surviving requests.
    fn replay(&self, message: &mut Message) {
        message.edit_history.truncate(self.history_len);
        let mut current = self.content.clone();
        for edit in &self.in_flight {
            message.edit_history.push(EditRecord {
                content: current.replace(edit.content.clone()),
                replaced_at: edit.requested_at,
            });
        }
        message.content = current;

        match self.in_flight.last() {
            Some(edit) => {
                message.is_edited = true;
                message.edited_at = Some(edit.requested_at);
            }
            None => {
                message.is_edited = self.is_edited;
                message.edited_at = self.edited_at;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenChat {
    token: SessionToken,
    cache: MessageCache,
    pagination: PaginationState,
    orphans: OrphanReactions,
    pending_edits: HashMap<Uuid, PendingEdit>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    config: SessionConfig,
    generation: u64,
    open: Option<OpenChat>,
    profiles: HashMap<Uuid, SenderProfile>,
    requested_profiles: HashSet<Uuid>,
    wanted_profiles: Vec<Uuid>,
    notices: NoticeQueue,
}

impl ChatSession {
    pub fn new(config: SessionConfig) -> Self {
        let mut profiles = HashMap::new();
        profiles.insert(config.user.user_id, config.user.clone());

        Self {
            notices: NoticeQueue::with_capacity(config.notice_capacity),
            config,
            generation: 0,
            open: None,
            profiles,
            requested_profiles: HashSet::new(),
            wanted_profiles: Vec::new(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.config.user.user_id
    }

    pub fn notices(&self) -> &NoticeQueue {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut NoticeQueue {
        &mut self.notices
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Starts a fresh cache for `chat_id`, invalidating every outstanding token.
    pub fn open(&mut self, chat_id: Uuid) -> SessionToken {
        self.generation += 1;
        let token = SessionToken {
            chat_id,
            generation: self.generation,
        };

        self.open = Some(OpenChat {
            token,
            cache: MessageCache::new(chat_id),
            pagination: PaginationState::new(self.config.page_size),
            orphans: OrphanReactions::new(self.config.orphan_reaction_limit),
            pending_edits: HashMap::new(),
        });
        token
    }

    /// Drops the cache. Results still in flight for it will be ignored.
    pub fn close(&mut self) -> Option<SessionToken> {
        self.generation += 1;
        self.open.take().map(|chat| chat.token)
    }

    pub fn token(&self) -> Option<SessionToken> {
        self.open.as_ref().map(|chat| chat.token)
    }

    pub fn chat_id(&self) -> Option<Uuid> {
        self.token().map(|token| token.chat_id)
    }

    pub fn is_current(&self, token: SessionToken) -> bool {
        self.token() == Some(token)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Cached messages, oldest first. Empty when no chat is open.
    pub fn snapshot(&self) -> Vec<Message> {
        self.open
            .as_ref()
            .map(|chat| chat.cache.snapshot())
            .unwrap_or_default()
    }

    pub fn message(&self, id: Uuid) -> Option<&Message> {
        self.open.as_ref().and_then(|chat| chat.cache.get(id))
    }

    pub fn has_more(&self) -> bool {
        self.open
            .as_ref()
            .is_some_and(|chat| chat.pagination.has_more())
    }

    pub fn is_loading_page(&self) -> bool {
        self.open
            .as_ref()
            .is_some_and(|chat| chat.pagination.is_loading())
    }

    pub fn buffered_reactions(&self) -> usize {
        self.open.as_ref().map_or(0, |chat| chat.orphans.len())
    }

    /// Sender ids that showed up without a cached profile, each returned once.
    pub fn take_wanted_profiles(&mut self) -> Vec<Uuid> {
        std::mem::take(&mut self.wanted_profiles)
    }

    // -------------------------------------------------------------------------
    // Optimistic send
    // -------------------------------------------------------------------------

    /// Appends a pending message and returns the insert to dispatch.
    pub fn begin_send(&mut self, draft: OutgoingDraft) -> Result<SendRequest, SessionError> {
        let draft = draft.normalized(self.config.max_content_len)?;
        let user = self.config.user.clone();
        let chat = self.open.as_mut().ok_or(SessionError::NotOpen)?;

        let outgoing = OutgoingMessage {
            id: Uuid::new_v4(),
            chat_id: chat.token.chat_id,
            sender_id: user.user_id,
            content: draft.content,
            kind: draft.kind,
            media: draft.media,
            created_at: Utc::now(),
        };

        let mut placeholder = Message::text(
            outgoing.id,
            outgoing.chat_id,
            outgoing.sender_id,
            String::new(),
            outgoing.created_at,
        );
        placeholder.content = outgoing.content.clone();
        placeholder.kind = outgoing.kind;
        placeholder.media = outgoing.media.clone();
        placeholder.sender = Some(user);
        placeholder.delivery = DeliveryState::Pending;
        chat.cache.upsert(placeholder);

        tracing::debug!(message_id = %outgoing.id, chat_id = %outgoing.chat_id, "optimistic message appended");

        Ok(SendRequest {
            token: chat.token,
            outgoing,
        })
    }

    /// Applies the insert result for `message_id`. Returns false when ignored.
    pub fn complete_send<E: fmt::Display>(
        &mut self,
        token: SessionToken,
        message_id: Uuid,
        result: Result<Message, E>,
    ) -> bool {
        let Some(chat) = self.current_mut(token) else {
            tracing::debug!(message_id = %message_id, "dropping send result for a closed chat");
            return false;
        };

        if !chat.cache.contains(message_id) {
            return false;
        }

        match result {
            Ok(row) if row.id == message_id => {
                if let Some(message) = chat.cache.get_mut(message_id) {
                    if message.delivery.is_pending() {
                        message.delivery = DeliveryState::Confirmed;
                    }
                }
            }
            Ok(row) => {
                // Server ignored the client id; the placeholder moves to the server id.
                if chat.cache.contains(row.id) || chat.cache.is_tombstoned(row.id) {
                    chat.cache.take(message_id);
                } else {
                    chat.cache.rekey(message_id, row.id);
                    if let Some(message) = chat.cache.get_mut(row.id) {
                        message.delivery = DeliveryState::Confirmed;
                    }
                }
            }
            Err(error) => {
                let reason = error.to_string();
                if let Some(message) = chat.cache.get_mut(message_id) {
                    message.delivery = DeliveryState::Failed {
                        reason: reason.clone(),
                    };
                }
                self.notices.error(format!("Message not sent: {reason}"));
            }
        }

        true
    }

    /// Re-arms a failed message under its original id.
    pub fn begin_retry(&mut self, message_id: Uuid) -> Result<SendRequest, SessionError> {
        let chat = self.open.as_mut().ok_or(SessionError::NotOpen)?;
        let token = chat.token;
        let message = chat
            .cache
            .get_mut(message_id)
            .ok_or(SessionError::UnknownMessage)?;

        if !message.delivery.is_failed() {
            return Err(SessionError::NotRetryable);
        }

        message.delivery = DeliveryState::Pending;
        Ok(SendRequest {
            token,
            outgoing: OutgoingMessage {
                id: message.id,
                chat_id: message.chat_id,
                sender_id: message.sender_id,
                content: message.content.clone(),
                kind: message.kind,
                media: message.media.clone(),
                created_at: message.created_at,
            },
        })
    }

    /// Drops a failed message that never reached the backend.
    pub fn discard_failed(&mut self, message_id: Uuid) -> Result<(), SessionError> {
        let chat = self.open.as_mut().ok_or(SessionError::NotOpen)?;
        let message = chat
            .cache
            .get(message_id)
            .ok_or(SessionError::UnknownMessage)?;

        if !message.delivery.is_failed() {
            return Err(SessionError::NotRetryable);
        }

        chat.cache.take(message_id);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Realtime
    // -------------------------------------------------------------------------

    /// Merges one change-feed event. Returns false when the event was ignored.
    pub fn apply_change(&mut self, token: SessionToken, change: RowChange) -> bool {
        if !self.is_current(token) {
            return false;
        }

        match change {
            RowChange::MessageInserted(row) => self.merge_inserted(row),
            RowChange::MessageUpdated(patch) => self.merge_update(patch),
            RowChange::MessageDeleted { id } => self.merge_delete(id),
            RowChange::ReactionInserted(reaction) => {
                self.merge_reaction(ReactionChange::Added(reaction))
            }
            RowChange::ReactionDeleted { id, message_id } => {
                self.merge_reaction(ReactionChange::Removed {
                    reaction_id: id,
                    message_id,
                })
            }
        }
    }

    fn merge_inserted(&mut self, mut row: Message) -> bool {
        let profile = self.profile_for(row.sender_id);
        let Some(chat) = self.open.as_mut() else {
            return false;
        };

        if row.chat_id != chat.token.chat_id {
            return false;
        }

        if let Some(existing) = chat.cache.get(row.id) {
            for reaction in &existing.reactions {
                if !row.reactions.iter().any(|r| r.id == reaction.id) {
                    row.reactions.push(reaction.clone());
                }
            }
            if row.edit_history.is_empty() {
                row.edit_history = existing.edit_history.clone();
            }
            if row.sender.is_none() {
                row.sender = existing.sender.clone();
            }
        }

        if row.sender.is_none() {
            row.sender = profile;
        }
        row.delivery = DeliveryState::Confirmed;

        let id = row.id;
        if chat.cache.upsert(row) == CacheWrite::Tombstoned {
            return false;
        }

        attach_orphans(chat, id);
        true
    }

    fn merge_update(&mut self, patch: MessagePatch) -> bool {
        let Some(chat) = self.open.as_mut() else {
            return false;
        };

        let Some(message) = chat.cache.get_mut(patch.id) else {
            tracing::debug!(message_id = %patch.id, "ignoring update for message that is not loaded");
            return false;
        };

        let echoed = chat
            .pending_edits
            .get_mut(&patch.id)
            .and_then(|pending| pending.mark_echoed(patch.content.as_deref()));
        if let Some(index) = echoed {
            // Content and history already hold this edit and any newer local ones.
            if let Some(pending) = chat.pending_edits.get_mut(&patch.id) {
                if index + 1 == pending.in_flight.len() {
                    message.edited_at = patch.edited_at.or(message.edited_at);
                }
                if pending.is_settled() {
                    chat.pending_edits.remove(&patch.id);
                } else {
                    pending.prune();
                }
            }
            message.is_recalled = patch.is_recalled;
            message.is_archived = patch.is_archived;
            return true;
        }

        if chat.pending_edits.remove(&patch.id).is_some() {
            tracing::debug!(message_id = %patch.id, "foreign update overrides local edits");
        }

        if message.content != patch.content {
            message.edit_history.push(EditRecord {
                content: message.content.take(),
                replaced_at: patch.edited_at.unwrap_or_else(Utc::now),
            });
        }

        message.content = patch.content;
        message.is_edited = patch.is_edited;
        message.edited_at = patch.edited_at;
        message.is_recalled = patch.is_recalled;
        message.is_archived = patch.is_archived;
        true
    }

    fn merge_delete(&mut self, id: Uuid) -> bool {
        let Some(chat) = self.open.as_mut() else {
            return false;
        };

        chat.orphans.discard_for(id);
        chat.pending_edits.remove(&id);
        chat.cache.delete(id).is_some()
    }

    fn merge_reaction(&mut self, change: ReactionChange) -> bool {
        let Some(chat) = self.open.as_mut() else {
            return false;
        };

        match change {
            ReactionChange::Added(reaction) => {
                if chat.cache.is_tombstoned(reaction.message_id) {
                    return false;
                }
                match chat.cache.get_mut(reaction.message_id) {
                    Some(message) => message.attach_reaction(reaction),
                    None => {
                        tracing::debug!(
                            message_id = %reaction.message_id,
                            reaction_id = %reaction.id,
                            "buffering reaction for message that is not loaded"
                        );
                        if let Some(evicted) = chat.orphans.push(reaction) {
                            tracing::debug!(reaction_id = %evicted.id, "orphan reaction evicted");
                        }
                        false
                    }
                }
            }
            ReactionChange::Removed {
                reaction_id,
                message_id,
            } => match chat.cache.get_mut(message_id) {
                Some(message) => message.detach_reaction(reaction_id),
                None => chat.orphans.remove(reaction_id),
            },
        }
    }

    // -------------------------------------------------------------------------
    // Pagination
    // -------------------------------------------------------------------------

    /// Claims the next history page; None while loading or when history is exhausted.
    pub fn begin_load_page(&mut self) -> Option<PageFetch> {
        let chat = self.open.as_mut()?;
        let request = chat.pagination.begin()?;

        Some(PageFetch {
            token: chat.token,
            chat_id: chat.token.chat_id,
            request,
        })
    }

    /// Merges a page of rows delivered newest first.
    pub fn complete_page<E: fmt::Display>(
        &mut self,
        token: SessionToken,
        page: u32,
        result: Result<Vec<Message>, E>,
    ) -> bool {
        if !self.is_current(token) {
            tracing::debug!(page, "dropping page for a closed chat");
            return false;
        }

        match result {
            Ok(rows) => {
                let rows: Vec<Message> = rows
                    .into_iter()
                    .rev()
                    .map(|mut row| {
                        match &row.sender {
                            Some(profile) => {
                                self.profiles
                                    .entry(profile.user_id)
                                    .or_insert_with(|| profile.clone());
                            }
                            None => row.sender = self.profile_for(row.sender_id),
                        }
                        row
                    })
                    .collect();

                let Some(chat) = self.open.as_mut() else {
                    return false;
                };
                if !chat.pagination.complete(page, rows.len()) {
                    return false;
                }

                let mut added = 0usize;
                for row in rows {
                    let id = row.id;
                    if chat.cache.insert_if_absent(row) {
                        attach_orphans(chat, id);
                        added += 1;
                    }
                }
                tracing::debug!(page, added, has_more = chat.pagination.has_more(), "history page merged");
            }
            Err(error) => {
                let Some(chat) = self.open.as_mut() else {
                    return false;
                };
                if !chat.pagination.fail(page) {
                    return false;
                }
                self.notices
                    .error(format!("Could not load older messages: {error}"));
            }
        }

        true
    }

    // -------------------------------------------------------------------------
    // Edit / delete
    // -------------------------------------------------------------------------

    /// Applies an edit locally and returns the update to dispatch.
    pub fn begin_edit(
        &mut self,
        message_id: Uuid,
        content: &str,
    ) -> Result<EditRequest, SessionError> {
        let content = OutgoingDraft::text(content)
            .normalized(self.config.max_content_len)?
            .content
            .ok_or(DraftError::Empty)?;
        let user_id = self.user_id();
        let chat = self.open.as_mut().ok_or(SessionError::NotOpen)?;
        let token = chat.token;
        let message = chat
            .cache
            .get_mut(message_id)
            .ok_or(SessionError::UnknownMessage)?;

        check_own_delivered(message, user_id)?;
        if message.is_recalled {
            return Err(SessionError::Recalled);
        }
        if message.content.as_deref() == Some(content.as_str()) {
            return Err(SessionError::Unchanged);
        }

        let now = Utc::now();
        chat.pending_edits
            .entry(message_id)
            .or_insert_with(|| PendingEdit {
                content: message.content.clone(),
                is_edited: message.is_edited,
                edited_at: message.edited_at,
                history_len: message.edit_history.len(),
                in_flight: Vec::new(),
            })
            .in_flight
            .push(InFlightEdit {
                content: content.clone(),
                requested_at: now,
                acked: false,
                echoed: false,
            });

        message.edit_history.push(EditRecord {
            content: message.content.replace(content.clone()),
            replaced_at: now,
        });
        message.is_edited = true;
        message.edited_at = Some(now);

        Ok(EditRequest {
            token,
            message_id,
            content,
        })
    }

    /// Confirms or rolls back one optimistic edit.
    ///
    /// A failed edit is undone only while no foreign update has replaced the
    /// message since the edit began; later local edits stay applied.
    pub fn complete_edit<E: fmt::Display>(
        &mut self,
        token: SessionToken,
        message_id: Uuid,
        content: &str,
        result: Result<(), E>,
    ) -> bool {
        let Some(chat) = self.current_mut(token) else {
            return false;
        };

        let failed = result.as_ref().err().map(ToString::to_string);
        if let Some(pending) = chat.pending_edits.get_mut(&message_id) {
            let index = pending
                .in_flight
                .iter()
                .position(|edit| !edit.acked && edit.content == content);
            match (index, &failed) {
                (Some(index), None) => pending.in_flight[index].acked = true,
                (Some(index), Some(_)) => {
                    pending.in_flight.remove(index);
                    if let Some(message) = chat.cache.get_mut(message_id) {
                        pending.replay(message);
                    }
                }
                (None, _) => {}
            }

            if pending.in_flight.is_empty() || pending.is_settled() {
                chat.pending_edits.remove(&message_id);
            } else {
                pending.prune();
            }
        }

        if let Some(error) = failed {
            self.notices.error(format!("Edit failed: {error}"));
        }
        true
    }

    pub fn begin_delete(&mut self, message_id: Uuid) -> Result<DeleteRequest, SessionError> {
        let user_id = self.user_id();
        let chat = self.open.as_mut().ok_or(SessionError::NotOpen)?;
        let message = chat
            .cache
            .get(message_id)
            .ok_or(SessionError::UnknownMessage)?;

        check_own_delivered(message, user_id)?;
        Ok(DeleteRequest {
            token: chat.token,
            message_id,
        })
    }

    pub fn complete_delete<E: fmt::Display>(
        &mut self,
        token: SessionToken,
        message_id: Uuid,
        result: Result<(), E>,
    ) -> bool {
        if !self.is_current(token) {
            return false;
        }

        match result {
            Ok(()) => {
                self.merge_delete(message_id);
            }
            Err(error) => self.notices.error(format!("Delete failed: {error}")),
        }
        true
    }

    // -------------------------------------------------------------------------
    // Reactions
    // -------------------------------------------------------------------------

    /// Adds `emoji` from the current user, or removes it when already present.
    pub fn toggle_reaction(
        &mut self,
        message_id: Uuid,
        emoji: &str,
    ) -> Result<ReactionRequest, SessionError> {
        let user_id = self.user_id();
        let chat = self.open.as_ref().ok_or(SessionError::NotOpen)?;
        let message = chat
            .cache
            .get(message_id)
            .ok_or(SessionError::UnknownMessage)?;

        if message.delivery != DeliveryState::Confirmed {
            return Err(SessionError::NotDelivered);
        }

        Ok(match message.reaction_by(user_id, emoji) {
            Some(existing) => ReactionRequest::Remove {
                token: chat.token,
                message_id,
                reaction_id: existing.id,
            },
            None => ReactionRequest::Add {
                token: chat.token,
                message_id,
                user_id,
                emoji: emoji.to_owned(),
            },
        })
    }

    pub fn complete_reaction<E: fmt::Display>(
        &mut self,
        token: SessionToken,
        result: Result<ReactionChange, E>,
    ) -> bool {
        if !self.is_current(token) {
            return false;
        }

        match result {
            Ok(change) => {
                self.merge_reaction(change);
            }
            Err(error) => self.notices.error(format!("Reaction failed: {error}")),
        }
        true
    }

    // -------------------------------------------------------------------------
    // Profiles
    // -------------------------------------------------------------------------

    /// Caches a profile and attaches it to every loaded message from that user.
    pub fn apply_profile(&mut self, profile: SenderProfile) {
        if let Some(chat) = self.open.as_mut() {
            for message in chat.cache.messages_mut() {
                if message.sender_id == profile.user_id {
                    message.sender = Some(profile.clone());
                }
            }
        }
        self.profiles.insert(profile.user_id, profile);
    }

    /// Forgets a failed lookup so the next message from `user_id` asks again.
    pub fn profile_failed(&mut self, user_id: Uuid) {
        self.requested_profiles.remove(&user_id);
    }

    fn profile_for(&mut self, user_id: Uuid) -> Option<SenderProfile> {
        if let Some(profile) = self.profiles.get(&user_id) {
            return Some(profile.clone());
        }

        if self.requested_profiles.insert(user_id) {
            self.wanted_profiles.push(user_id);
        }
        None
    }

    fn current_mut(&mut self, token: SessionToken) -> Option<&mut OpenChat> {
        self.open.as_mut().filter(|chat| chat.token == token)
    }
}

fn attach_orphans(chat: &mut OpenChat, message_id: Uuid) {
    let orphans = chat.orphans.take_for(message_id);
    if orphans.is_empty() {
        return;
    }

    if let Some(message) = chat.cache.get_mut(message_id) {
        for reaction in orphans {
            message.attach_reaction(reaction);
        }
    }
}

fn check_own_delivered(message: &Message, user_id: Uuid) -> Result<(), SessionError> {
    if message.sender_id != user_id {
        return Err(SessionError::NotOwnMessage);
    }
    if message.delivery != DeliveryState::Confirmed {
        return Err(SessionError::NotDelivered);
    }
    Ok(())
}
