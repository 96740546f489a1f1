use std::collections::VecDeque;

use uuid::Uuid;

use super::message::Reaction;

pub const DEFAULT_ORPHAN_REACTION_LIMIT: usize = 256;

/// Reactions that arrived before their parent message was loaded.
///
/// Bounded FIFO: once full, the oldest buffered reaction is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanReactions {
    limit: usize,
    items: VecDeque<Reaction>,
}

impl OrphanReactions {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            items: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Buffers a reaction. Returns the evicted reaction, if any.
    pub fn push(&mut self, reaction: Reaction) -> Option<Reaction> {
        if self.limit == 0 {
            return Some(reaction);
        }

        if self.items.iter().any(|item| item.id == reaction.id) {
            return None;
        }

        let evicted = if self.items.len() == self.limit {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(reaction);
        evicted
    }

    pub fn remove(&mut self, reaction_id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != reaction_id);
        before != self.items.len()
    }

    /// Removes and returns every buffered reaction for `message_id`.
    pub fn take_for(&mut self, message_id: Uuid) -> Vec<Reaction> {
        let (matched, rest): (Vec<_>, Vec<_>) = self
            .items
            .drain(..)
            .partition(|item| item.message_id == message_id);
        self.items = rest.into();
        matched
    }

    pub fn discard_for(&mut self, message_id: Uuid) {
        self.items.retain(|item| item.message_id != message_id);
    }
}
