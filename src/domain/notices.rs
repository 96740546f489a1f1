use std::collections::VecDeque;

use chrono::{DateTime, Utc};

pub const DEFAULT_NOTICE_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A user-facing toast shown in the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeQueue {
    capacity: usize,
    items: VecDeque<Notice>,
}

impl Default for NoticeQueue {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_NOTICE_CAPACITY)
    }
}

impl NoticeQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            items: VecDeque::new(),
        }
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(NoticeLevel::Info, text.into());
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(NoticeLevel::Error, text.into());
    }

    pub fn latest(&self) -> Option<&Notice> {
        self.items.back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter()
    }

    fn push(&mut self, level: NoticeLevel, text: String) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(Notice {
            level,
            text,
            at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_latest_notice_on_top() {
        let mut queue = NoticeQueue::default();
        queue.info("chat opened");
        queue.error("send failed");

        let latest = queue.latest().expect("latest notice");
        assert_eq!(latest.level, NoticeLevel::Error);
        assert_eq!(latest.text, "send failed");
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let mut queue = NoticeQueue::with_capacity(2);
        queue.info("one");
        queue.info("two");
        queue.info("three");

        let texts: Vec<_> = queue.iter().map(|n| n.text.as_str()).collect();
        assert_eq!(texts, vec!["two", "three"]);
    }
}
