//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Dispatcher` (submitted/rejected/close/drained) and
//!   `core::worker` (slot, attempts, backoff, outcome).
//! - **Consumers**: the subscriber listener spawned by `DispatcherBuilder::build`,
//!   which fans out to the `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
