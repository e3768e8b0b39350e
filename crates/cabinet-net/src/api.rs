use async_trait::async_trait;
use serde_json::Value;

use cabinet_shared::{RoomId, UserId};

use crate::error::Result;
use crate::subscription::{MessageHandler, Subscription};

/// Backend collaborator for the chat engine.
///
/// Listing and count methods return raw `serde_json::Value` records on
/// purpose: the portal backend mixes snake_case and camelCase field naming
/// between its REST and realtime paths, and the normalization boundary for
/// that lives in `cabinet-chat`, not here.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Fetch the summaries of every room the current client belongs to.
    async fn list_rooms(&self) -> Result<Vec<Value>>;

    /// Fetch the unread-message count for one room.
    async fn unread_count(&self, room: &RoomId) -> Result<u32>;

    /// Persist the pinned flag for a room.  Fire-and-forget from the
    /// engine's perspective.
    async fn update_room_pin(&self, room: &RoomId, pinned: bool) -> Result<()>;

    /// Persist the muted flag for a room.  Fire-and-forget as well.
    async fn update_room_mute(&self, room: &RoomId, muted: bool) -> Result<()>;

    /// Open a realtime subscription for one room.  Registration is
    /// synchronous; events are delivered to `handler` until the returned
    /// handle is unsubscribed.
    fn subscribe_to_messages(
        &self,
        room: &RoomId,
        handler: MessageHandler,
    ) -> Result<Box<dyn Subscription>>;
}

/// Resolver for the current user's stable identifier.
///
/// Injected explicitly (never read from a hidden global) so the normalizers
/// can be exercised with any identity in tests.
pub trait Identity: Send + Sync {
    /// `None` when no user is authenticated.
    fn current_user_id(&self) -> Option<UserId>;
}
