// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registration table mapping subscription identities to handler lists

use crate::event::{Event, EventKind};
use crate::filter::Filter;
use crate::handler::Handler;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Subscription identity: filter plus event kind (None = any kind)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct RegistrationKey {
    filter: Filter,
    kind: Option<EventKind>,
}

/// A subscription binding a filter and an event kind to an ordered list
/// of handlers
#[derive(Clone)]
pub struct Registration {
    filter: Filter,
    kind: Option<EventKind>,
    handlers: Vec<Handler>,
}

impl Registration {
    fn new(filter: Filter, kind: Option<EventKind>, handler: Handler) -> Self {
        Self {
            filter,
            kind,
            handlers: vec![handler],
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// `None` means the registration fires for every event kind
    pub fn kind(&self) -> Option<&EventKind> {
        self.kind.as_ref()
    }

    /// Handlers in registration order; this is the launch order of the
    /// fan-out
    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    /// Whether the event passes both the kind gate and the name filter.
    ///
    /// Kind equality is exact: a registration for one kind never fires
    /// for another.
    pub fn accepts(&self, event: &Event) -> bool {
        let kind_ok = match &self.kind {
            None => true,
            Some(kind) => *kind == event.kind(),
        };
        kind_ok && event.matches(&self.filter)
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("filter", &self.filter)
            .field("kind", &self.kind)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Owns the subscription map.
///
/// Two registrations with identical filter and kind merge their handler
/// lists; the same filter with a different kind stays a distinct entry.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<RegistrationKey, Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the handler to the entry with this identity, creating the
    /// entry if it does not exist
    pub fn register(&mut self, filter: Filter, kind: Option<EventKind>, handler: Handler) {
        let key = RegistrationKey {
            filter: filter.clone(),
            kind: kind.clone(),
        };
        match self.entries.entry(key) {
            Entry::Occupied(mut entry) => entry.get_mut().handlers.push(handler),
            Entry::Vacant(entry) => {
                entry.insert(Registration::new(filter, kind, handler));
            }
        }
    }

    /// Cloned view of all registrations; order unspecified
    pub fn snapshot(&self) -> Vec<Registration> {
        self.entries.values().cloned().collect()
    }

    /// Every registered handler across all entries
    pub fn all_handlers(&self) -> Vec<Handler> {
        self.entries
            .values()
            .flat_map(|registration| registration.handlers.iter().cloned())
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
