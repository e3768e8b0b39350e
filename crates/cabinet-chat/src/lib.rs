//! # cabinet-chat
//!
//! The client-side message-state reconciliation engine of the portal:
//! merges paginated REST history with realtime push events, deduplicates
//! optimistic local sends against server-confirmed copies, tracks per-room
//! unread counters across the active-room exception, and keeps every
//! room's message list in chronological order regardless of network
//! arrival order.
//!
//! Layering, leaf to root:
//!
//! - [`wire`] — field-alias probing over raw backend records; the only
//!   place snake_case/camelCase and timestamp-alias handling is allowed.
//! - [`normalize`] — wire records to canonical [`cabinet_shared`] models.
//! - [`participants`] — fallback participant derivation from messages.
//! - [`store`] — the in-memory room collection and its mutations.
//! - [`reconcile`] — the synchronous realtime event state machine.
//! - [`rooms`] — the [`ChatRooms`] orchestration service consumed by UIs.

use tracing_subscriber::{fmt, EnvFilter};

pub mod normalize;
pub mod participants;
pub mod reconcile;
pub mod rooms;
pub mod store;
pub mod wire;

#[cfg(test)]
pub(crate) mod testing;

pub use participants::participants_from_messages;
pub use rooms::ChatRooms;
pub use store::{LoadPhase, RoomsState};

/// Install the default log subscriber for an embedding application.
/// `RUST_LOG` overrides the built-in filter.  Call once at startup.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cabinet_chat=debug,cabinet_net=info,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
