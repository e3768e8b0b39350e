//! # cabinet-net
//!
//! The boundary to the portal backend: the [`ChatApi`] collaborator trait
//! covering room listing, unread counts, pin/mute sync and per-room
//! realtime subscriptions, plus the [`Identity`] resolver.
//!
//! This crate deliberately contains no backend implementation — concrete
//! REST/realtime clients (and test doubles) are injected by the embedding
//! application.  Raw records cross this boundary as `serde_json::Value`;
//! all wire-shape normalization happens in `cabinet-chat`.

pub mod api;
pub mod subscription;

mod error;

pub use api::{ChatApi, Identity};
pub use error::{ApiError, Result};
pub use subscription::{MessageEventKind, MessageHandler, Subscription};
