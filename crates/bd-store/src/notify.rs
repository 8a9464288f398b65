//! Transient user-facing messages with per-message expiry.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

/// How long a message stays visible.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(4);

/// Message severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl Notification {
    /// Whether the message is still within its display window at `now`.
    pub fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Messages in arrival order plus a min-heap of expiry instants, drained by
/// [`NotificationQueue::tick`]. Heap entries for dismissed messages are
/// skipped when they surface.
#[derive(Clone, Debug)]
pub struct NotificationQueue {
    ttl: Duration,
    next_id: u64,
    messages: Vec<Notification>,
    expiries: BinaryHeap<Reverse<(Instant, u64)>>,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(NOTIFICATION_TTL)
    }
}

impl NotificationQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: 0,
            messages: Vec::new(),
            expiries: BinaryHeap::new(),
        }
    }

    /// Append a message created at `now` and return its id.
    pub fn push(&mut self, kind: NotificationKind, message: impl Into<String>, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let expires_at = now + self.ttl;
        self.messages.push(Notification {
            id,
            kind,
            message: message.into(),
            created_at: now,
            expires_at,
        });
        self.expiries.push(Reverse((expires_at, id)));
        id
    }

    /// Remove a message before it expires.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.messages.len();
        self.messages.retain(|message| message.id != id);
        before != self.messages.len()
    }

    /// Drop every message whose expiry is at or before `now`. Returns how
    /// many were removed.
    pub fn tick(&mut self, now: Instant) -> usize {
        let mut removed = 0;
        while let Some(Reverse((expires_at, id))) = self.expiries.peek().copied() {
            if expires_at > now {
                break;
            }
            self.expiries.pop();
            if self.dismiss(id) {
                removed += 1;
            }
        }
        removed
    }

    /// Messages still on screen at `now`, oldest first.
    pub fn visible(&self, now: Instant) -> impl Iterator<Item = &Notification> {
        self.messages
            .iter()
            .filter(move |message| message.is_live(now))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop all messages and pending expiries.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.expiries.clear();
    }
}
