use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::types::{MessageId, RoomId, RoomKind, User, UserId};

/// One conversation between the current user and one or more participants.
///
/// Created when the room list is fetched and never destroyed client-side
/// during a session; `messages` starts empty and is populated lazily (full
/// history fetch) or incrementally (realtime inserts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub kind: RoomKind,
    pub display_name: String,
    /// Participants excluding the current user, keyed by user id.
    /// Last write wins on attribute updates.
    pub participants: HashMap<UserId, User>,
    /// Ordered ascending by `sent_at_millis`; this invariant must hold
    /// after every mutation.
    pub messages: Vec<Message>,
    /// Most recently known message, kept independently of whether it is
    /// loaded into `messages` so the room list renders before history.
    pub last_message: Option<Message>,
    pub unread_count: u32,
    pub is_pinned: bool,
    pub is_muted: bool,
}

impl Room {
    pub fn new(id: RoomId, kind: RoomKind, display_name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            display_name: display_name.into(),
            participants: HashMap::new(),
            messages: Vec::new(),
            last_message: None,
            unread_count: 0,
            is_pinned: false,
            is_muted: false,
        }
    }

    pub fn message_index(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| &m.id == id)
    }

    pub fn contains_message(&self, id: &MessageId) -> bool {
        self.message_index(id).is_some()
    }

    /// Restore the chronological ordering invariant.  The sort is stable so
    /// ties on `sent_at_millis` keep their insertion order.
    pub fn sort_messages(&mut self) {
        self.messages.sort_by_key(|m| m.sent_at_millis);
    }

    /// Timestamp of the newest message currently held, if any.
    pub fn max_sent_at(&self) -> Option<i64> {
        self.messages.iter().map(|m| m.sent_at_millis).max()
    }

    /// Timestamp used for recency ordering of the room list.
    pub fn preview_sent_at(&self) -> Option<i64> {
        self.last_message.as_ref().map(|m| m.sent_at_millis)
    }

    pub fn display_name_for(&self, user_id: &UserId) -> Option<&str> {
        self.participants
            .get(user_id)
            .map(|u| u.display_name.as_str())
    }
}
