//! The orchestration service consumed by the UI layer: wires room loading,
//! unread-count hydration and per-room realtime subscriptions together,
//! and exposes the store's mutation operations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use cabinet_net::{ChatApi, Identity, MessageHandler, Subscription};
use cabinet_shared::{Message, Room, RoomId, User};

use crate::normalize::normalize_room;
use crate::reconcile;
use crate::store::{LoadPhase, RoomsState};

/// Recover from a poisoned lock instead of propagating the panic; the
/// store stays usable with whatever state the poisoning writer left.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-client chat room state, kept consistent across REST history
/// fetches, realtime push events and optimistic local sends.
///
/// All state access is synchronous; the async surface is limited to
/// [`ChatRooms::refresh`] and the fire-and-forget pin/mute sync (which
/// therefore must run inside a tokio runtime).
pub struct ChatRooms {
    api: Arc<dyn ChatApi>,
    identity: Arc<dyn Identity>,
    state: Arc<Mutex<RoomsState>>,
    /// The room currently open in the UI.  Shared with every delivery
    /// callback and read fresh per event, so navigation does not require
    /// re-subscribing.
    active_room: Arc<Mutex<Option<RoomId>>>,
    /// Subscription generation.  Bumped by every `refresh()`; stale
    /// continuations and stale delivery callbacks compare against it and
    /// drop their work.
    generation: Arc<AtomicU64>,
    subscriptions: Mutex<Vec<Box<dyn Subscription>>>,
    changed: watch::Sender<u64>,
}

impl ChatRooms {
    pub fn new(api: Arc<dyn ChatApi>, identity: Arc<dyn Identity>) -> Self {
        let (changed, _) = watch::channel(0);
        Self {
            api,
            identity,
            state: Arc::new(Mutex::new(RoomsState::new())),
            active_room: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            subscriptions: Mutex::new(Vec::new()),
            changed,
        }
    }

    // ------------------------------------------------------------------
    // Read surface
    // ------------------------------------------------------------------

    /// Current room list, pinned first then by preview recency.
    pub fn rooms(&self) -> Vec<Room> {
        lock(&self.state).rooms.clone()
    }

    pub fn room(&self, room_id: &RoomId) -> Option<Room> {
        lock(&self.state).room(room_id).cloned()
    }

    pub fn phase(&self) -> LoadPhase {
        lock(&self.state).phase.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.phase() == LoadPhase::Loading
    }

    /// Load error of the most recent `refresh()`, if it failed.
    pub fn error(&self) -> Option<String> {
        match self.phase() {
            LoadPhase::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Version channel bumped after every state mutation, for UIs that
    /// want to await re-render signals.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.changed.subscribe()
    }

    pub fn active_room(&self) -> Option<RoomId> {
        lock(&self.active_room).clone()
    }

    /// Record which room is open in the UI.  Inserts for the active room
    /// land in the visible list without touching its unread badge.
    pub fn set_active_room(&self, room_id: Option<RoomId>) {
        *lock(&self.active_room) = room_id;
    }

    // ------------------------------------------------------------------
    // Load / refresh
    // ------------------------------------------------------------------

    /// Full reload: re-fetch the room list, re-hydrate unread counts, and
    /// replace all realtime subscriptions.
    ///
    /// Failures surface through [`ChatRooms::error`]; a refresh started
    /// while another is in flight wins, and the older one discards its
    /// results at the next generation check.
    pub async fn refresh(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.teardown_subscriptions();

        lock(&self.state).phase = LoadPhase::Loading;
        self.notify();

        let raw_rooms = match self.api.list_rooms().await {
            Ok(raws) => raws,
            Err(e) => {
                if self.is_current(generation) {
                    warn!(error = %e, "Room list fetch failed");
                    lock(&self.state).phase = LoadPhase::Error(e.to_string());
                    self.notify();
                }
                return;
            }
        };
        if !self.is_current(generation) {
            debug!("Discarding stale room list result");
            return;
        }

        let self_id = self.identity.current_user_id();
        let mut rooms: Vec<Room> = raw_rooms
            .iter()
            .filter_map(|raw| normalize_room(raw, self_id.as_ref()))
            .collect();

        // Second phase: hydrate unread counters concurrently.  Each fetch
        // is independently fail-soft and degrades that room's count to 0.
        let counts = join_all(rooms.iter().map(|room| {
            let api = self.api.clone();
            let room_id = room.id.clone();
            async move {
                match api.unread_count(&room_id).await {
                    Ok(count) => count,
                    Err(e) => {
                        warn!(room = %room_id, error = %e, "Unread count fetch failed, defaulting to 0");
                        0
                    }
                }
            }
        }))
        .await;
        if !self.is_current(generation) {
            debug!("Discarding stale unread count results");
            return;
        }
        for (room, count) in rooms.iter_mut().zip(counts) {
            room.unread_count = count;
        }

        let room_ids: Vec<RoomId> = rooms.iter().map(|room| room.id.clone()).collect();
        {
            let mut state = lock(&self.state);
            state.rooms = rooms;
            state.sort_rooms();
            state.phase = LoadPhase::Ready;
        }

        let mut opened = Vec::new();
        for room_id in room_ids {
            match self.subscribe_room(room_id.clone(), generation) {
                Ok(subscription) => opened.push(subscription),
                Err(e) => warn!(room = %room_id, error = %e, "Realtime subscription failed"),
            }
        }
        info!(rooms = opened.len(), "Room list loaded");

        if self.is_current(generation) {
            lock(&self.subscriptions).extend(opened);
        } else {
            for subscription in &opened {
                subscription.unsubscribe();
            }
        }
        self.notify();
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Replace a room's history wholesale after a full fetch.
    pub fn set_room_messages(
        &self,
        room_id: &RoomId,
        messages: Vec<Message>,
        participants: Option<Vec<User>>,
    ) {
        lock(&self.state).set_room_messages(room_id, messages, participants);
        self.notify();
    }

    /// Reconcile a fetched history page against realtime messages that
    /// arrived while the fetch was in flight.
    pub fn set_room_messages_with_merge(
        &self,
        room_id: &RoomId,
        messages: Vec<Message>,
        participants: Option<Vec<User>>,
    ) {
        lock(&self.state).set_room_messages_with_merge(room_id, messages, participants);
        self.notify();
    }

    /// Append an optimistic local send.
    pub fn append_message(&self, room_id: &RoomId, message: Message) {
        lock(&self.state).append_message(room_id, message);
        self.notify();
    }

    /// Set a room's unread counter directly (mark-as-read uses 0).
    pub fn set_unread_count(&self, room_id: &RoomId, count: u32) {
        lock(&self.state).set_unread_count(room_id, count);
        self.notify();
    }

    /// Flip a room's pinned flag locally and sync the backend best-effort.
    /// Sync failure is logged, never rolled back or surfaced.
    pub fn toggle_pin(&self, room_id: &RoomId) {
        let Some(pinned) = lock(&self.state).toggle_pin(room_id) else {
            warn!(room = %room_id, "toggle_pin for unknown room");
            return;
        };
        self.notify();

        let api = self.api.clone();
        let room_id = room_id.clone();
        tokio::spawn(async move {
            if let Err(e) = api.update_room_pin(&room_id, pinned).await {
                warn!(room = %room_id, error = %e, "Pin sync failed, keeping local state");
            }
        });
    }

    /// Flip a room's muted flag locally and sync the backend best-effort.
    pub fn toggle_mute(&self, room_id: &RoomId) {
        let Some(muted) = lock(&self.state).toggle_mute(room_id) else {
            warn!(room = %room_id, "toggle_mute for unknown room");
            return;
        };
        self.notify();

        let api = self.api.clone();
        let room_id = room_id.clone();
        tokio::spawn(async move {
            if let Err(e) = api.update_room_mute(&room_id, muted).await {
                warn!(room = %room_id, error = %e, "Mute sync failed, keeping local state");
            }
        });
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn notify(&self) {
        self.changed.send_modify(|version| *version = version.wrapping_add(1));
    }

    fn teardown_subscriptions(&self) {
        let drained: Vec<Box<dyn Subscription>> = lock(&self.subscriptions).drain(..).collect();
        for subscription in &drained {
            subscription.unsubscribe();
        }
    }

    /// Open the realtime subscription for one room.  The delivery callback
    /// is synchronous: it checks its generation, reads the active room
    /// fresh, and applies the event through the reconciliation engine.
    fn subscribe_room(
        &self,
        room_id: RoomId,
        generation: u64,
    ) -> cabinet_net::Result<Box<dyn Subscription>> {
        let state = self.state.clone();
        let active_room = self.active_room.clone();
        let identity = self.identity.clone();
        let generations = self.generation.clone();
        let changed = self.changed.clone();
        let callback_room = room_id.clone();

        let handler: MessageHandler = Box::new(move |raw, kind| {
            if generations.load(Ordering::SeqCst) != generation {
                debug!(room = %callback_room, "Event for stale subscription generation, dropping");
                return;
            }
            let self_id = identity.current_user_id();
            let active = lock(&active_room).clone();
            {
                let mut state = lock(&state);
                reconcile::apply_event(
                    &mut state,
                    &callback_room,
                    &raw,
                    kind,
                    self_id.as_ref(),
                    active.as_ref(),
                );
            }
            changed.send_modify(|version| *version = version.wrapping_add(1));
        });

        self.api.subscribe_to_messages(&room_id, handler)
    }
}

impl Drop for ChatRooms {
    fn drop(&mut self) {
        self.teardown_subscriptions();
    }
}
