use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marker prefix carried by locally-generated message ids until the
/// server-assigned copy arrives and replaces the placeholder.
pub const OPTIMISTIC_ID_PREFIX: &str = "optimistic-";

// Backend identifiers are opaque strings; newtypes keep them from being
// mixed up at call sites.

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a placeholder id for a locally-created message that has not
    /// been confirmed by the backend yet.
    pub fn optimistic() -> Self {
        Self(format!("{}{}", OPTIMISTIC_ID_PREFIX, Uuid::new_v4()))
    }

    pub fn is_optimistic(&self) -> bool {
        self.0.starts_with(OPTIMISTIC_ID_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a message.  The substitution of the current user's id with
/// [`Sender::Me`] happens once, at normalization time, and is never
/// re-derived downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Sender {
    Me,
    Other(UserId),
}

impl Sender {
    pub fn is_me(&self) -> bool {
        matches!(self, Sender::Me)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoomKind {
    Individual,
    Group,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Document,
}

/// Aggregate delivery state derived from per-recipient records: `Read` when
/// every recipient has read, `Delivered` when any recipient has received,
/// `Sent` otherwise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Read,
}

/// A chat participant other than the current user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub role: Option<String>,
}

/// Current time as epoch milliseconds, the unit all message ordering uses.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
