//! Per-chat message store shared by sending, realtime merging and paging.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::message::Message;

/// Outcome of writing a message into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWrite {
    Inserted,
    Replaced,
    /// The id was deleted earlier in this session.
    Tombstoned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheEntry {
    /// Insertion order; breaks ties between equal timestamps.
    seq: u64,
    message: Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageCache {
    chat_id: Uuid,
    entries: HashMap<Uuid, CacheEntry>,
    tombstones: HashSet<Uuid>,
    next_seq: u64,
}

impl MessageCache {
    pub fn new(chat_id: Uuid) -> Self {
        Self {
            chat_id,
            entries: HashMap::new(),
            tombstones: HashSet::new(),
            next_seq: 0,
        }
    }

    pub fn chat_id(&self) -> Uuid {
        self.chat_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn is_tombstoned(&self, id: Uuid) -> bool {
        self.tombstones.contains(&id)
    }

    pub fn get(&self, id: Uuid) -> Option<&Message> {
        self.entries.get(&id).map(|entry| &entry.message)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Message> {
        self.entries.get_mut(&id).map(|entry| &mut entry.message)
    }

    /// Writes a message under its id, keeping the original insertion slot on replace.
    pub fn upsert(&mut self, message: Message) -> CacheWrite {
        if self.tombstones.contains(&message.id) {
            return CacheWrite::Tombstoned;
        }

        match self.entries.get_mut(&message.id) {
            Some(entry) => {
                entry.message = message;
                CacheWrite::Replaced
            }
            None => {
                let seq = self.bump_seq();
                self.entries.insert(message.id, CacheEntry { seq, message });
                CacheWrite::Inserted
            }
        }
    }

    /// Inserts only when the id is neither cached nor tombstoned.
    pub fn insert_if_absent(&mut self, message: Message) -> bool {
        if self.tombstones.contains(&message.id) || self.entries.contains_key(&message.id) {
            return false;
        }

        let seq = self.bump_seq();
        self.entries.insert(message.id, CacheEntry { seq, message });
        true
    }

    /// Removes an entry and tombstones its id for the rest of the session.
    pub fn delete(&mut self, id: Uuid) -> Option<Message> {
        self.tombstones.insert(id);
        self.entries.remove(&id).map(|entry| entry.message)
    }

    /// Removes an entry without tombstoning it.
    pub fn take(&mut self, id: Uuid) -> Option<Message> {
        self.entries.remove(&id).map(|entry| entry.message)
    }

    /// Moves an entry to a new id, keeping its insertion slot.
    pub fn rekey(&mut self, from: Uuid, to: Uuid) -> bool {
        if self.entries.contains_key(&to) || self.tombstones.contains(&to) {
            return false;
        }

        let Some(mut entry) = self.entries.remove(&from) else {
            return false;
        };
        entry.message.id = to;
        self.entries.insert(to, entry);
        true
    }

    pub fn earliest_created_at(&self) -> Option<DateTime<Utc>> {
        self.entries
            .values()
            .map(|entry| entry.message.created_at)
            .min()
    }

    pub fn messages_mut(&mut self) -> impl Iterator<Item = &mut Message> {
        self.entries.values_mut().map(|entry| &mut entry.message)
    }

    /// Messages ordered by creation time, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        let mut entries: Vec<&CacheEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| {
            a.message
                .created_at
                .cmp(&b.message.created_at)
                .then(a.seq.cmp(&b.seq))
        });
        entries.into_iter().map(|entry| entry.message.clone()).collect()
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}
