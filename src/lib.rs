// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fanout: in-process publish/subscribe event bus
//!
//! This crate provides:
//! - `EventBus` - deliver events to filter- and kind-scoped registrations,
//!   running each registration's handlers concurrently
//! - Dead-letter feedback: handler failures and delivery shortfalls are
//!   re-published as events on the same bus, so failure observers are just
//!   another subscription
//! - `EventLog` - structured audit trail of delivered events

pub mod bus;
pub mod error;
pub mod event;
pub mod filter;
pub mod handler;
pub mod log;
pub mod registry;

// Re-exports
pub use bus::EventBus;
pub use error::{format_error, DeliveryError, HandlerError};
pub use event::{
    CustomEvent, DeadLetterEvent, ErrorEvent, Event, EventKind, LogEvent, APP_DOMAIN, DEAD_LETTER,
    NOT_FOUND,
};
pub use filter::Filter;
pub use handler::{handler_fn, EventHandler, Handler};
pub use log::{EventLog, EventRecord};
pub use registry::{Registration, Registry};
