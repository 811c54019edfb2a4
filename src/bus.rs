// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus: concurrent fan-out delivery with a dead-letter feedback loop
//!
//! Registrations are scanned sequentially; the handlers of one matching
//! registration all run concurrently and are awaited together before the
//! scan moves on. Failures never reach the publisher; they are converted
//! into dead-letter events and re-published through the same pipeline, so
//! a dead-letter subscriber is just another registration.

use crate::error::{DeliveryError, HandlerError};
use crate::event::{DeadLetterEvent, ErrorEvent, Event, EventKind, LogEvent};
use crate::filter::Filter;
use crate::handler::Handler;
use crate::registry::{Registration, Registry};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::task::JoinSet;

/// Every published event is expected to reach at least this many
/// destinations: its primary handler and an audit path. Fewer successes
/// is itself a delivery failure.
const MIN_DELIVERIES: u64 = 2;

/// Cap on chained dead-letter re-publishes. Past it the dead-letter is
/// dropped and reported through the diagnostic sink only.
const MAX_DEAD_LETTER_DEPTH: usize = 4;

/// In-process publish/subscribe bus.
///
/// `Clone` shares the underlying registration table and counters, so a
/// bus can be handed to every component that publishes or subscribes.
pub struct EventBus {
    registry: Arc<RwLock<Registry>>,
    sent: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::new())),
            sent: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribe a handler to events matching the filter and kind.
    ///
    /// `kind: None` subscribes to every kind; dead-letter sinks and audit
    /// logs use this together with the `"*"` filter.
    ///
    /// Registering the same (filter, kind) identity twice appends to the
    /// existing handler list instead of creating a duplicate entry.
    pub fn register(&self, filter: impl Into<Filter>, kind: Option<EventKind>, handler: Handler) {
        let mut registry = self.registry.write().unwrap_or_else(|e| e.into_inner());
        registry.register(filter.into(), kind, handler);
    }

    /// Deliver an event to every matching registration, running each
    /// registration's handlers concurrently.
    ///
    /// Fire-and-forget: the call returns nothing, and failures surface
    /// only as dead-letter events published on this bus. The call does
    /// block until every matching handler has finished.
    pub async fn send(&self, event: Event) {
        let deliveries = AtomicU64::new(0);
        self.deliver(Arc::new(event), &deliveries, 0).await;
    }

    /// Publish a free-text application log event
    pub async fn send_app_log(&self, message: impl Into<String>) {
        self.send(Event::Log(LogEvent::new("app", message))).await;
    }

    /// Publish an error event for `source`, followed by an application
    /// log line carrying the same message
    pub async fn send_error<E>(
        &self,
        source: impl Into<String>,
        error: E,
        message: impl Into<String>,
    ) where
        E: std::error::Error + Send + Sync + 'static,
    {
        let message = message.into();
        self.send(Event::Error(ErrorEvent::new(source, error, message.clone())))
            .await;
        self.send_app_log(message).await;
    }

    /// Log an error through the diagnostic sink, then publish it as an
    /// error event followed by an application log line
    pub async fn report_error<E>(&self, source: impl Into<String>, error: E, message: &str)
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        tracing::error!("{}", crate::error::format_error(&error, message));
        self.send_error(source, error, message).await;
    }

    /// Snapshot of all registrations; order unspecified
    pub fn registrations(&self) -> Vec<Registration> {
        self.registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot()
    }

    /// Every registered handler, primarily for tests
    pub fn all_handlers(&self) -> Vec<Handler> {
        self.registry
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .all_handlers()
    }

    /// Empty the registration table; the sent counter is untouched
    pub fn clear_registrations(&self) {
        self.registry
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Discard all registrations and zero the sent counter.
    ///
    /// Used for test isolation. In-flight handler calls from an earlier
    /// `send` are not awaited or cancelled.
    pub fn reset(&self) {
        self.clear_registrations();
        self.sent.store(0, Ordering::SeqCst);
    }

    /// Cumulative count of successful handler deliveries
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }

    /// Recursive delivery pipeline. `deliveries` is the per-send success
    /// counter, shared with the dead-letter deliveries this send triggers
    /// so the shortfall rule sees the whole chain.
    fn deliver<'a>(
        &'a self,
        event: Arc<Event>,
        deliveries: &'a AtomicU64,
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            if depth > MAX_DEAD_LETTER_DEPTH {
                tracing::warn!(
                    event = %event.name(),
                    depth,
                    "dead-letter depth cap reached, dropping event"
                );
                return;
            }

            // Iterate over a snapshot so concurrent register() calls
            // cannot invalidate the scan.
            let snapshot = {
                let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
                registry.snapshot()
            };

            for registration in snapshot.iter().filter(|r| r.accepts(&event)) {
                if let Some((error, missed)) =
                    self.fan_out(registration, &event, deliveries).await
                {
                    tracing::warn!(
                        event = %event.name(),
                        error = %error,
                        missed = missed.len(),
                        "handler failure, publishing dead-letter"
                    );
                    let dead = DeadLetterEvent::new(
                        Arc::clone(&event),
                        DeliveryError::Handler(error),
                        missed,
                    );
                    self.deliver(Arc::new(Event::DeadLetter(dead)), deliveries, depth + 1)
                        .await;
                }
            }

            // Shortfall: the event should have reached its primary
            // handler and an audit path. Dead-letter events are exempt,
            // otherwise a bus with no subscribers would recurse forever.
            if event.as_dead_letter().is_none()
                && deliveries.load(Ordering::SeqCst) < MIN_DELIVERIES
            {
                tracing::warn!(event = %event.name(), "delivery shortfall, publishing dead-letter");
                let error = DeliveryError::NoHandlers(event.name().to_string());
                let dead = DeadLetterEvent::new(Arc::clone(&event), error, Vec::new());
                self.deliver(Arc::new(Event::DeadLetter(dead)), deliveries, depth + 1)
                    .await;
            }
        })
    }

    /// Run one registration's handlers concurrently and wait for all of
    /// them.
    ///
    /// Returns the first failure in launch order together with the
    /// handlers whose calls failed, or `None` when every handler
    /// succeeded. This tracks the exact failed set rather than the
    /// launch-order tail from the first failure, so concurrent successes
    /// after a failure are never over-reported as missed.
    async fn fan_out(
        &self,
        registration: &Registration,
        event: &Arc<Event>,
        deliveries: &AtomicU64,
    ) -> Option<(HandlerError, Vec<Handler>)> {
        let mut tasks = JoinSet::new();
        for (index, handler) in registration.handlers().iter().enumerate() {
            let handler = Arc::clone(handler);
            let event = Arc::clone(event);
            let sent = Arc::clone(&self.sent);
            tasks.spawn(async move {
                let result = handler.handle(event).await;
                if result.is_ok() {
                    sent.fetch_add(1, Ordering::SeqCst);
                }
                (index, result)
            });
        }

        let mut failures: Vec<(usize, HandlerError)> = Vec::new();
        let mut succeeded = 0u64;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => succeeded += 1,
                Ok((index, Err(error))) => failures.push((index, error)),
                Err(join_error) => {
                    // A handler that panicked counts as a failed call
                    failures.push((usize::MAX, HandlerError::new(join_error.to_string())));
                }
            }
        }
        deliveries.fetch_add(succeeded, Ordering::SeqCst);

        if failures.is_empty() {
            return None;
        }
        failures.sort_by_key(|(index, _)| *index);
        let missed: Vec<Handler> = failures
            .iter()
            .filter_map(|(index, _)| registration.handlers().get(*index).cloned())
            .collect();
        let (_, first) = failures.remove(0);
        Some((first, missed))
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            sent: Arc::clone(&self.sent),
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
