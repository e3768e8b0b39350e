use serde_json::Value;

/// Kind of realtime mutation delivered for a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageEventKind {
    Insert,
    Update,
    Delete,
}

/// Callback invoked by the transport for every event on a subscription.
///
/// Handlers run inside the transport's delivery loop and must be
/// synchronous, fast and panic-free: an escaped panic would break delivery
/// for every subsequent event on that subscription.
pub type MessageHandler = Box<dyn Fn(Value, MessageEventKind) + Send + Sync>;

/// Handle to an open per-room subscription.
///
/// Every handle opened for a subscription generation must be explicitly
/// unsubscribed when that generation is torn down, so no events leak into
/// the next one.
pub trait Subscription: Send {
    fn unsubscribe(&self);
}
