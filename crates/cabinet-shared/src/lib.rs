//! # cabinet-shared
//!
//! Canonical in-memory domain model for the chat engine: rooms, messages,
//! participants and their identifiers.  Pure data — all normalization from
//! backend wire shapes lives in `cabinet-chat`, all I/O in `cabinet-net`.

pub mod message;
pub mod room;
pub mod types;

pub use message::{AttachmentRef, Message, Reaction, ReplyRef};
pub use room::Room;
pub use types::{
    now_millis, ContentKind, DeliveryStatus, MessageId, RoomId, RoomKind, Sender, User, UserId,
    OPTIMISTIC_ID_PREFIX,
};
