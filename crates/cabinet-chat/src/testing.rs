//! Scriptable test doubles for the backend collaborators.
//!
//! `MockApi` serves canned room summaries and unread counts, records
//! pin/mute sync calls, and captures subscription handlers so tests can
//! push realtime events through the engine.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use cabinet_net::{
    ApiError, ChatApi, Identity, MessageEventKind, MessageHandler, Result, Subscription,
};
use cabinet_shared::{RoomId, UserId};

type SharedHandler = Arc<dyn Fn(Value, MessageEventKind) + Send + Sync>;

struct HandlerSlot {
    active: Arc<AtomicBool>,
    handler: SharedHandler,
}

#[derive(Default)]
pub(crate) struct MockApi {
    pub rooms: Mutex<Vec<Value>>,
    pub unread: Mutex<HashMap<String, u32>>,
    pub failing_unread: Mutex<HashSet<String>>,
    pub fail_room_list: AtomicBool,
    pub fail_flag_sync: AtomicBool,
    pub pin_calls: Mutex<Vec<(String, bool)>>,
    pub mute_calls: Mutex<Vec<(String, bool)>>,
    handlers: Mutex<HashMap<String, Vec<HandlerSlot>>>,
}

impl MockApi {
    pub fn with_rooms(rooms: Vec<Value>) -> Arc<Self> {
        let api = Self::default();
        *api.rooms.lock().unwrap() = rooms;
        Arc::new(api)
    }

    /// Deliver an event to every live subscription for `room`, the way the
    /// transport would.
    pub fn push_event(&self, room: &str, raw: Value, kind: MessageEventKind) {
        for handler in self.live_handlers(room) {
            handler(raw.clone(), kind);
        }
    }

    /// Deliver an event to every handler ever registered for `room`,
    /// including unsubscribed ones — simulates a transport that keeps
    /// delivering after unsubscribe so engine-side gating can be tested.
    pub fn push_event_ignoring_unsubscribe(&self, room: &str, raw: Value, kind: MessageEventKind) {
        let handlers: Vec<SharedHandler> = {
            let map = self.handlers.lock().unwrap();
            map.get(room)
                .map(|slots| slots.iter().map(|s| s.handler.clone()).collect())
                .unwrap_or_default()
        };
        for handler in handlers {
            handler(raw.clone(), kind);
        }
    }

    pub fn live_subscription_count(&self) -> usize {
        let map = self.handlers.lock().unwrap();
        map.values()
            .flatten()
            .filter(|slot| slot.active.load(Ordering::SeqCst))
            .count()
    }

    fn live_handlers(&self, room: &str) -> Vec<SharedHandler> {
        let map = self.handlers.lock().unwrap();
        map.get(room)
            .map(|slots| {
                slots
                    .iter()
                    .filter(|s| s.active.load(Ordering::SeqCst))
                    .map(|s| s.handler.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatApi for MockApi {
    async fn list_rooms(&self) -> Result<Vec<Value>> {
        if self.fail_room_list.load(Ordering::SeqCst) {
            return Err(ApiError::Backend("room list unavailable".into()));
        }
        Ok(self.rooms.lock().unwrap().clone())
    }

    async fn unread_count(&self, room: &RoomId) -> Result<u32> {
        if self.failing_unread.lock().unwrap().contains(room.as_str()) {
            return Err(ApiError::Backend("unread count unavailable".into()));
        }
        Ok(*self.unread.lock().unwrap().get(room.as_str()).unwrap_or(&0))
    }

    async fn update_room_pin(&self, room: &RoomId, pinned: bool) -> Result<()> {
        self.pin_calls
            .lock()
            .unwrap()
            .push((room.to_string(), pinned));
        if self.fail_flag_sync.load(Ordering::SeqCst) {
            return Err(ApiError::Backend("pin sync rejected".into()));
        }
        Ok(())
    }

    async fn update_room_mute(&self, room: &RoomId, muted: bool) -> Result<()> {
        self.mute_calls
            .lock()
            .unwrap()
            .push((room.to_string(), muted));
        if self.fail_flag_sync.load(Ordering::SeqCst) {
            return Err(ApiError::Backend("mute sync rejected".into()));
        }
        Ok(())
    }

    fn subscribe_to_messages(
        &self,
        room: &RoomId,
        handler: MessageHandler,
    ) -> Result<Box<dyn Subscription>> {
        let active = Arc::new(AtomicBool::new(true));
        let slot = HandlerSlot {
            active: active.clone(),
            handler: Arc::from(handler),
        };
        self.handlers
            .lock()
            .unwrap()
            .entry(room.to_string())
            .or_default()
            .push(slot);
        Ok(Box::new(MockSubscription { active }))
    }
}

struct MockSubscription {
    active: Arc<AtomicBool>,
}

impl Subscription for MockSubscription {
    fn unsubscribe(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

pub(crate) struct MockIdentity(pub Option<UserId>);

impl Identity for MockIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.0.clone()
    }
}

pub(crate) fn identity(id: &str) -> Arc<MockIdentity> {
    Arc::new(MockIdentity(Some(UserId::new(id))))
}

/// A summary record the way the listing endpoint shapes it.
pub(crate) fn room_summary(id: &str, title: &str, pinned: bool, preview_at: i64) -> Value {
    json!({
        "id": id,
        "title": title,
        "isPinned": pinned,
        "contextType": "SERVICE",
        "members": [
            { "userId": "me", "name": "Moi" },
            { "userId": "u1", "name": "Ana", "role": "accountant" }
        ],
        "lastMessage": {
            "id": format!("{id}-last"),
            "senderId": "u1",
            "content": "latest",
            "sentAt": preview_at
        }
    })
}
