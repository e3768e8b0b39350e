//! Field-alias probing over raw backend records.
//!
//! The portal backend mixes snake_case and camelCase naming between its
//! REST and realtime paths, and carries several timestamp field aliases.
//! Every accessor here takes an alias list in priority order and returns
//! the first present value; nothing outside this module and the
//! normalizers in [`crate::normalize`] is allowed to know about aliases.

use serde_json::Value;

// ---------------------------------------------------------------------------
// Alias tables
// ---------------------------------------------------------------------------

pub const MESSAGE_ID: &[&str] = &["id", "messageId", "message_id"];
pub const SENDER_ID: &[&str] = &["senderId", "sender_id"];
pub const SENDER_NAME: &[&str] = &["senderName", "sender_name"];
pub const SENDER_OBJECT: &[&str] = &["sender"];
pub const SENT_AT: &[&str] = &["sentAt", "sent_at", "createdAt", "created_at"];
pub const TYPE_TAG: &[&str] = &["type", "messageType", "message_type"];
pub const TEXT: &[&str] = &["content", "text", "body"];
pub const FILE_URL: &[&str] = &["fileUrl", "file_url", "attachmentUrl", "attachment_url"];
pub const FILE_NAME: &[&str] = &["fileName", "file_name"];
pub const REPLY_OBJECT: &[&str] = &["repliedMessage", "replied_message", "replyTo", "reply_to"];
pub const REPLY_ID: &[&str] = &[
    "repliedMessageId",
    "replied_message_id",
    "replyToId",
    "reply_to_id",
    "replyTo",
    "reply_to",
];
pub const RECIPIENT_STATES: &[&str] = &["participantStates", "participant_states", "recipients"];
pub const RECIPIENT_USER: &[&str] = &["userId", "user_id"];
pub const RECIPIENT_READ: &[&str] = &["isRead", "is_read"];
pub const RECIPIENT_RECEIVED: &[&str] =
    &["isReceived", "is_received", "isDelivered", "is_delivered"];
pub const IS_DELETED: &[&str] = &["isDeleted", "is_deleted"];
pub const REACTIONS: &[&str] = &["reactions"];
pub const EMOJI: &[&str] = &["emoji"];

pub const ROOM_ID: &[&str] = &["id", "roomId", "room_id"];
pub const ROOM_TITLE: &[&str] = &["title", "name", "displayName", "display_name"];
pub const CONTEXT_TYPE: &[&str] = &["contextType", "context_type", "roomType", "room_type"];
pub const MEMBERS: &[&str] = &["members", "participants"];
pub const MEMBER_ID: &[&str] = &["userId", "user_id", "id"];
pub const MEMBER_NAME: &[&str] = &["name", "displayName", "display_name", "fullName", "full_name"];
pub const MEMBER_ROLE: &[&str] = &["role"];
pub const LAST_MESSAGE: &[&str] = &["lastMessage", "last_message"];
pub const IS_PINNED: &[&str] = &["isPinned", "is_pinned"];
pub const IS_MUTED: &[&str] = &["isMuted", "is_muted"];

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

/// First alias holding a string.  Numbers are accepted for id-like fields
/// and stringified, since some backend paths serialize ids numerically.
pub fn str_field(raw: &Value, aliases: &[&str]) -> Option<String> {
    for key in aliases {
        match raw.get(key) {
            Some(Value::String(s)) => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// First alias holding a boolean.
pub fn bool_field(raw: &Value, aliases: &[&str]) -> Option<bool> {
    aliases.iter().find_map(|key| raw.get(key).and_then(Value::as_bool))
}

/// First alias holding an array.
pub fn array_field<'a>(raw: &'a Value, aliases: &[&str]) -> Option<&'a Vec<Value>> {
    aliases.iter().find_map(|key| raw.get(key).and_then(Value::as_array))
}

/// First alias holding an object.
pub fn object_field<'a>(raw: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .find_map(|key| raw.get(key).filter(|v| v.is_object()))
}

/// First alias holding a parseable timestamp, as epoch milliseconds.
///
/// Accepts epoch milliseconds, epoch seconds (disambiguated by magnitude)
/// and RFC 3339 strings.
pub fn timestamp_field(raw: &Value, aliases: &[&str]) -> Option<i64> {
    aliases
        .iter()
        .find_map(|key| raw.get(key).and_then(parse_timestamp))
}

// Values below this magnitude are epoch seconds; epoch milliseconds for
// any date after 1971 exceed it.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().map(normalize_epoch),
        Value::String(s) => {
            if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
                return Some(dt.timestamp_millis());
            }
            s.parse::<i64>().ok().map(normalize_epoch)
        }
        _ => None,
    }
}

fn normalize_epoch(n: i64) -> i64 {
    if n.abs() < MILLIS_THRESHOLD {
        n * 1000
    } else {
        n
    }
}
