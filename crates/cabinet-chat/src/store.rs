//! In-memory room collection and its mutation operations.
//!
//! All mutations restore the two store invariants before returning: each
//! room's message list is sorted ascending by `sent_at_millis`, and the
//! room list is ordered pinned-first then by preview recency.

use std::collections::HashSet;

use tracing::warn;

use cabinet_shared::{Message, MessageId, ReplyRef, Room, RoomId, User};

use crate::participants::participants_from_messages;

/// Lifecycle of the initial load: `Idle → Loading → {Ready | Error}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
    Ready,
    Error(String),
}

/// The per-client collection of rooms plus load lifecycle state.
#[derive(Debug)]
pub struct RoomsState {
    pub rooms: Vec<Room>,
    pub phase: LoadPhase,
}

impl RoomsState {
    pub fn new() -> Self {
        Self {
            rooms: Vec::new(),
            phase: LoadPhase::Idle,
        }
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| &r.id == id)
    }

    pub fn room_mut(&mut self, id: &RoomId) -> Option<&mut Room> {
        self.rooms.iter_mut().find(|r| &r.id == id)
    }

    /// Order the room list: pinned rooms first, then by preview recency,
    /// rooms without any known message last.
    pub fn sort_rooms(&mut self) {
        self.rooms.sort_by(|a, b| {
            b.is_pinned.cmp(&a.is_pinned).then_with(|| {
                b.preview_sent_at()
                    .unwrap_or(i64::MIN)
                    .cmp(&a.preview_sent_at().unwrap_or(i64::MIN))
            })
        });
    }

    /// Replace a room's message list wholesale (after a full history
    /// fetch), optionally replacing its participants.
    pub fn set_room_messages(
        &mut self,
        room_id: &RoomId,
        messages: Vec<Message>,
        participants: Option<Vec<User>>,
    ) {
        let Some(room) = self.room_mut(room_id) else {
            warn!(room = %room_id, "set_room_messages for unknown room");
            return;
        };
        room.messages = messages;
        room.sort_messages();
        apply_participants(room, participants);
        resolve_replies(room);
    }

    /// Reconcile a freshly fetched history page against messages that
    /// arrived via realtime during the fetch: keep all fresh messages,
    /// append any held message not in the fresh set, re-sort, and
    /// re-resolve reply references.  Idempotent and commutative with
    /// respect to realtime arrival order.
    pub fn set_room_messages_with_merge(
        &mut self,
        room_id: &RoomId,
        fresh: Vec<Message>,
        participants: Option<Vec<User>>,
    ) {
        let Some(room) = self.room_mut(room_id) else {
            warn!(room = %room_id, "set_room_messages_with_merge for unknown room");
            return;
        };

        let fresh_ids: HashSet<MessageId> = fresh.iter().map(|m| m.id.clone()).collect();
        let mut merged = fresh;
        for held in room.messages.drain(..) {
            if !fresh_ids.contains(&held.id) {
                merged.push(held);
            }
        }
        room.messages = merged;
        room.sort_messages();
        apply_participants(room, participants);
        resolve_replies(room);
    }

    /// Append an optimistic local send.  Never touches the unread counter
    /// (the sender must not see their own send increment their badge) and
    /// updates the preview.
    pub fn append_message(&mut self, room_id: &RoomId, message: Message) {
        let Some(room) = self.room_mut(room_id) else {
            warn!(room = %room_id, "append_message for unknown room");
            return;
        };
        room.last_message = Some(message.clone());
        room.messages.push(message);
        room.sort_messages();
    }

    /// Flip the pinned flag locally and re-sort the room list.  Returns the
    /// new value for the caller's backend sync, `None` for unknown rooms.
    pub fn toggle_pin(&mut self, room_id: &RoomId) -> Option<bool> {
        let room = self.room_mut(room_id)?;
        room.is_pinned = !room.is_pinned;
        let pinned = room.is_pinned;
        self.sort_rooms();
        Some(pinned)
    }

    /// Flip the muted flag locally.  Returns the new value for the caller's
    /// backend sync, `None` for unknown rooms.
    pub fn toggle_mute(&mut self, room_id: &RoomId) -> Option<bool> {
        let room = self.room_mut(room_id)?;
        room.is_muted = !room.is_muted;
        Some(room.is_muted)
    }

    /// Direct unread setter: hydration from the backend or an explicit
    /// mark-as-read (count 0) from the UI.
    pub fn set_unread_count(&mut self, room_id: &RoomId, count: u32) {
        let Some(room) = self.room_mut(room_id) else {
            warn!(room = %room_id, "set_unread_count for unknown room");
            return;
        };
        room.unread_count = count;
    }
}

impl Default for RoomsState {
    fn default() -> Self {
        Self::new()
    }
}

/// Explicitly supplied participants replace the map; otherwise a room that
/// has none yet gets the fallback derivation from its message senders.
/// Participants from the room summary are never overwritten implicitly.
fn apply_participants(room: &mut Room, participants: Option<Vec<User>>) {
    match participants {
        Some(users) => {
            room.participants.clear();
            for user in users {
                room.participants.insert(user.id.clone(), user);
            }
        }
        None if room.participants.is_empty() => {
            for user in participants_from_messages(&room.messages) {
                room.participants.insert(user.id.clone(), user);
            }
        }
        None => {}
    }
}

/// Attach an embedded snapshot to every reply reference whose target is
/// present locally.  Snapshots are capped at one level of nesting.
pub(crate) fn resolve_replies(room: &mut Room) {
    for i in 0..room.messages.len() {
        let Some(reply) = &room.messages[i].reply_to else {
            continue;
        };
        if reply.snapshot.is_some() {
            continue;
        }
        let target = reply.id.clone();
        let Some(j) = room.message_index(&target) else {
            continue;
        };
        let snapshot = snapshot_of(&room.messages[j]);
        if let Some(reply) = room.messages[i].reply_to.as_mut() {
            reply.snapshot = Some(snapshot);
        }
    }
}

fn snapshot_of(message: &Message) -> Box<Message> {
    let mut snapshot = message.clone();
    // Cap nesting: the snapshot's own reply keeps only the bare id.
    snapshot.reply_to = snapshot.reply_to.map(|r| ReplyRef {
        id: r.id,
        snapshot: None,
    });
    Box::new(snapshot)
}
