use serde::{Deserialize, Serialize};

use crate::types::{now_millis, ContentKind, DeliveryStatus, MessageId, Sender};
use crate::types::UserId;

/// Reference to an uploaded file carried by a document message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachmentRef {
    pub url: String,
    pub name: Option<String>,
}

/// An emoji reaction left by a participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reaction {
    pub user_id: UserId,
    pub emoji: String,
}

/// Link to the message this one replies to.  The snapshot is an embedded
/// copy for display without a second fetch; it is attached whenever the
/// referenced message is available locally and is never nested further
/// than one level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyRef {
    pub id: MessageId,
    pub snapshot: Option<Box<Message>>,
}

/// One chat event belonging to exactly one room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    /// Resolved human name; always `None` for self-sent messages, and a
    /// display nullable for realtime payloads that omit joined relations.
    pub sender_display_name: Option<String>,
    pub content_kind: ContentKind,
    pub text: Option<String>,
    pub attachment: Option<AttachmentRef>,
    /// Epoch milliseconds — the single source of truth for ordering.
    pub sent_at_millis: i64,
    pub delivery: DeliveryStatus,
    pub reply_to: Option<ReplyRef>,
    pub reactions: Vec<Reaction>,
    pub is_deleted: bool,
}

impl Message {
    /// Build an optimistic text message for a local send, shown immediately
    /// and later reconciled against the server-confirmed copy.
    pub fn outgoing_text(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::optimistic(),
            sender: Sender::Me,
            sender_display_name: None,
            content_kind: ContentKind::Text,
            text: Some(text.into()),
            attachment: None,
            sent_at_millis: now_millis(),
            delivery: DeliveryStatus::Sent,
            reply_to: None,
            reactions: Vec::new(),
            is_deleted: false,
        }
    }

    pub fn is_optimistic(&self) -> bool {
        self.id.is_optimistic()
    }

    /// Convert this message into a tombstone: content, attachment and
    /// reactions are cleared but id, position and timestamp are retained so
    /// ordering and reply references stay intact.
    pub fn tombstone(&mut self) {
        self.is_deleted = true;
        self.text = None;
        self.attachment = None;
        self.reactions.clear();
    }
}
