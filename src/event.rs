// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event model: a tagged union over a shared payload record
//!
//! Every event carries a name (matched against subscription filters), a
//! human message, a structured data map, an optional error, and a domain
//! tag. The variant tag doubles as the registration identity, so no
//! runtime type inspection is needed anywhere.

use crate::error::DeliveryError;
use crate::filter::Filter;
use crate::handler::Handler;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Shared error reference carried by events as data
pub type EventError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Placeholder returned by [`Event::get`] for absent keys.
///
/// Callers must treat it as a valid absence signal, not an error.
pub static NOT_FOUND: LazyLock<Value> = LazyLock::new(|| Value::String("???".to_string()));

/// Domain tag for application log events
pub const APP_DOMAIN: &str = "app";

/// Name and domain of dead-letter events
pub const DEAD_LETTER: &str = "dead-letter";

/// Discriminator used for registration identity.
///
/// Replaces reflection on concrete types: every event variant reports its
/// kind, and a registration fires only for an exactly equal kind (or for
/// any kind when registered without one).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    Log,
    Error,
    DeadLetter,
    /// User-defined event family, identified by label
    Custom(String),
}

impl EventKind {
    pub fn custom(label: impl Into<String>) -> Self {
        Self::Custom(label.into())
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Log => f.write_str("log"),
            EventKind::Error => f.write_str("error"),
            EventKind::DeadLetter => f.write_str(DEAD_LETTER),
            EventKind::Custom(label) => f.write_str(label),
        }
    }
}

/// Base record shared by every event variant
#[derive(Debug, Clone, Default)]
struct Payload {
    name: String,
    message: String,
    data: HashMap<String, Value>,
    error: Option<EventError>,
    domain: String,
}

/// Free-text application log line
#[derive(Debug, Clone)]
pub struct LogEvent {
    payload: Payload,
}

impl LogEvent {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            payload: Payload {
                name: name.into(),
                message: message.into(),
                domain: APP_DOMAIN.to_string(),
                ..Payload::default()
            },
        }
    }

    pub fn with_data(mut self, data: HashMap<String, Value>) -> Self {
        self.payload.data = data;
        self
    }
}

/// A failure somewhere in the application, published as data
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    payload: Payload,
}

impl ErrorEvent {
    pub fn new<E>(source: impl Into<String>, error: E, message: impl Into<String>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            payload: Payload {
                name: "error".to_string(),
                message: message.into(),
                error: Some(Arc::new(error)),
                domain: source.into(),
                ..Payload::default()
            },
        }
    }
}

/// User-defined event built on the shared payload
#[derive(Debug, Clone)]
pub struct CustomEvent {
    kind: String,
    payload: Payload,
}

impl CustomEvent {
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            payload: Payload {
                name: name.into(),
                message: message.into(),
                ..Payload::default()
            },
        }
    }

    pub fn with_data(mut self, data: HashMap<String, Value>) -> Self {
        self.payload.data = data;
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.payload.domain = domain.into();
        self
    }
}

/// Delivery failure re-published on the bus.
///
/// Constructed only by the dispatcher. Wraps the event whose delivery
/// failed, the triggering error, and the handlers the event did not reach.
/// The handlers are shared references for inspection by dead-letter
/// subscribers, not transferred ownership.
#[derive(Clone)]
pub struct DeadLetterEvent {
    payload: Payload,
    original: Arc<Event>,
    error: DeliveryError,
    missed: Vec<Handler>,
}

impl DeadLetterEvent {
    pub(crate) fn new(original: Arc<Event>, error: DeliveryError, missed: Vec<Handler>) -> Self {
        let data = HashMap::from([
            (
                "event".to_string(),
                Value::String(original.name().to_string()),
            ),
            ("missed".to_string(), Value::from(missed.len())),
        ]);
        Self {
            payload: Payload {
                name: DEAD_LETTER.to_string(),
                message: error.to_string(),
                data,
                error: None,
                domain: DEAD_LETTER.to_string(),
            },
            original,
            error,
            missed,
        }
    }

    /// The event whose delivery failed
    pub fn original(&self) -> &Event {
        &self.original
    }

    pub fn error(&self) -> &DeliveryError {
        &self.error
    }

    /// Handlers whose calls failed, in registration order
    pub fn missed_handlers(&self) -> &[Handler] {
        &self.missed
    }
}

impl std::fmt::Debug for DeadLetterEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeadLetterEvent")
            .field("original", &self.original.name())
            .field("error", &self.error)
            .field("missed", &self.missed.len())
            .finish()
    }
}

/// A unit of information flowing through the bus
#[derive(Debug, Clone)]
pub enum Event {
    Log(LogEvent),
    Error(ErrorEvent),
    DeadLetter(DeadLetterEvent),
    Custom(CustomEvent),
}

impl Event {
    fn payload(&self) -> &Payload {
        match self {
            Event::Log(event) => &event.payload,
            Event::Error(event) => &event.payload,
            Event::DeadLetter(event) => &event.payload,
            Event::Custom(event) => &event.payload,
        }
    }

    /// Discriminator used for registration identity
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Log(_) => EventKind::Log,
            Event::Error(_) => EventKind::Error,
            Event::DeadLetter(_) => EventKind::DeadLetter,
            Event::Custom(event) => EventKind::Custom(event.kind.clone()),
        }
    }

    /// Event name; immutable once constructed
    pub fn name(&self) -> &str {
        &self.payload().name
    }

    pub fn message(&self) -> &str {
        &self.payload().message
    }

    /// Structured payload entries
    pub fn data(&self) -> &HashMap<String, Value> {
        &self.payload().data
    }

    /// Look up a payload entry; absent keys yield [`NOT_FOUND`]
    pub fn get(&self, key: &str) -> &Value {
        self.payload().data.get(key).unwrap_or(&NOT_FOUND)
    }

    /// Error carried as data; the bus never raises it
    pub fn error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Event::DeadLetter(event) => Some(event.error()),
            other => other.payload().error.as_ref().map(|e| e.as_ref()),
        }
    }

    pub fn domain(&self) -> &str {
        &self.payload().domain
    }

    /// Whether the event's name passes the subscription filter
    pub fn matches(&self, filter: &Filter) -> bool {
        filter.matches(self.name())
    }

    pub fn as_dead_letter(&self) -> Option<&DeadLetterEvent> {
        match self {
            Event::DeadLetter(event) => Some(event),
            _ => None,
        }
    }
}

impl From<LogEvent> for Event {
    fn from(event: LogEvent) -> Self {
        Event::Log(event)
    }
}

impl From<ErrorEvent> for Event {
    fn from(event: ErrorEvent) -> Self {
        Event::Error(event)
    }
}

impl From<DeadLetterEvent> for Event {
    fn from(event: DeadLetterEvent) -> Self {
        Event::DeadLetter(event)
    }
}

impl From<CustomEvent> for Event {
    fn from(event: CustomEvent) -> Self {
        Event::Custom(event)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
