//! Realtime reconciliation: the synchronous state machine applied to every
//! `(raw event, kind)` pair delivered on a room subscription.
//!
//! Runs inside the transport's delivery callback, so it must stay fast,
//! synchronous and panic-free; malformed records are skipped, never thrown.

use serde_json::Value;
use tracing::{debug, warn};

use cabinet_net::MessageEventKind;
use cabinet_shared::{Message, MessageId, Room, RoomId, Sender, UserId};

use crate::normalize::normalize_message;
use crate::store::{resolve_replies, RoomsState};
use crate::wire;

/// Apply one realtime event to the store.
///
/// `active_room` is the room currently open in the UI, read fresh for every
/// event by the caller — it governs whether an insert increments the unread
/// badge or lands directly in the visible list.
pub fn apply_event(
    state: &mut RoomsState,
    room_id: &RoomId,
    raw: &Value,
    kind: MessageEventKind,
    self_id: Option<&UserId>,
    active_room: Option<&RoomId>,
) {
    let is_active = active_room == Some(room_id);
    let Some(room) = state.room_mut(room_id) else {
        debug!(room = %room_id, "Realtime event for unknown room, dropping");
        return;
    };

    match kind {
        MessageEventKind::Insert => apply_insert(room, raw, self_id, is_active),
        MessageEventKind::Update => apply_update(room, raw, self_id),
        MessageEventKind::Delete => apply_delete(room, raw),
    }
}

fn apply_insert(room: &mut Room, raw: &Value, self_id: Option<&UserId>, is_active: bool) {
    let Some(mut message) = normalize_message(raw, self_id) else {
        return;
    };
    backfill_sender_name(room, &mut message);

    // Optimistic placeholder replacement: a self send confirmed by the
    // server replaces the matching local placeholder in place instead of
    // appending a duplicate.
    if message.sender.is_me() {
        if let Some(index) = optimistic_match(room, &message) {
            room.messages[index] = message.clone();
            room.sort_messages();
            resolve_replies(room);
            room.last_message = Some(message);
            return;
        }
    }

    // The preview tracks every insert, even one already known by id.
    if room.contains_message(&message.id) {
        debug!(room = %room.id, message = %message.id, "Duplicate insert, keeping existing copy");
        room.last_message = Some(message);
        return;
    }

    if is_active {
        // Guard against a backend clock or payload timestamp that would
        // sort the new message above ones already displayed.
        let floor = room.max_sent_at().unwrap_or(message.sent_at_millis);
        if message.sent_at_millis < floor {
            message.sent_at_millis = floor;
        }
    } else if !message.sender.is_me() {
        // The single place the unread badge is ever incremented.
        room.unread_count += 1;
    }

    room.messages.push(message.clone());
    room.sort_messages();
    resolve_replies(room);
    room.last_message = Some(message);
}

fn apply_update(room: &mut Room, raw: &Value, self_id: Option<&UserId>) {
    let Some(mut message) = normalize_message(raw, self_id) else {
        return;
    };
    backfill_sender_name(room, &mut message);

    let Some(index) = room.message_index(&message.id) else {
        debug!(room = %room.id, message = %message.id, "Update for unknown message, dropping");
        return;
    };
    room.messages[index] = message.clone();
    // An update should not normally change order; re-sorting is the
    // invariant-preserving step, not an optimization to skip.
    room.sort_messages();
    resolve_replies(room);

    if room.last_message.as_ref().is_some_and(|m| m.id == message.id) {
        room.last_message = Some(message);
    }
}

fn apply_delete(room: &mut Room, raw: &Value) {
    let Some(id) = wire::str_field(raw, wire::MESSAGE_ID).map(MessageId::new) else {
        warn!(room = %room.id, "Delete event missing message id, skipping");
        return;
    };
    let Some(index) = room.message_index(&id) else {
        debug!(room = %room.id, message = %id, "Delete for unknown message, dropping");
        return;
    };
    // Tombstone, not removal: position and id are retained so ordering and
    // replies pointing at this message stay intact.  Unread counter and
    // preview are untouched on this path.
    room.messages[index].tombstone();
}

/// Realtime payloads omit joined relations; resolve the sender name from
/// the room's participants when the event did not carry one.
fn backfill_sender_name(room: &Room, message: &mut Message) {
    if message.sender_display_name.is_some() {
        return;
    }
    if let Sender::Other(user_id) = &message.sender {
        message.sender_display_name = room.display_name_for(user_id).map(str::to_string);
    }
}

/// Find a local optimistic placeholder matching a confirmed self send:
/// optimistic id, self sender, identical text.
fn optimistic_match(room: &Room, confirmed: &Message) -> Option<usize> {
    room.messages
        .iter()
        .position(|m| m.is_optimistic() && m.sender.is_me() && m.text == confirmed.text)
}
