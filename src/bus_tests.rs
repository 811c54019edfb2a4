// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::event::CustomEvent;
use crate::handler::handler_fn;
use std::sync::atomic::AtomicUsize;
use std::sync::Mutex;

fn order_event(name: &str, message: &str) -> Event {
    Event::from(CustomEvent::new("order", name, message))
}

fn order_kind() -> Option<EventKind> {
    Some(EventKind::custom("order"))
}

fn ok_handler() -> Handler {
    handler_fn(|_| async { Ok(()) })
}

fn counting_handler(count: Arc<AtomicUsize>) -> Handler {
    handler_fn(move |_| {
        let count = Arc::clone(&count);
        async move {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
}

#[test]
fn register_twice_merges_into_one_registration() {
    let bus = EventBus::new();
    bus.register("suzy", order_kind(), ok_handler());
    bus.register("suzy", order_kind(), ok_handler());

    assert_eq!(bus.registrations().len(), 1);
    assert_eq!(bus.all_handlers().len(), 2);
}

#[test]
fn same_filter_different_kind_registers_separately() {
    let bus = EventBus::new();
    bus.register("suzy", order_kind(), ok_handler());
    bus.register("suzy", Some(EventKind::Log), ok_handler());

    assert_eq!(bus.registrations().len(), 2);
}

#[tokio::test]
async fn single_success_fires_the_shortfall_dead_letter() {
    let bus = EventBus::new();
    bus.register("suzy", order_kind(), ok_handler());

    let failed = Arc::new(AtomicUsize::new(0));
    bus.register(
        "*",
        Some(EventKind::DeadLetter),
        counting_handler(Arc::clone(&failed)),
    );

    bus.send(order_event("suzy", "Reg 1")).await;

    // One success is below the two-destination policy, so a shortfall
    // dead-letter goes out and reaches the sink. The delivered dead-letter
    // lifts the chain to two successes, so no further one fires.
    assert_eq!(failed.load(Ordering::SeqCst), 1);
    assert_eq!(bus.sent(), 2);
}

#[tokio::test]
async fn non_matching_filter_is_not_invoked() {
    let bus = EventBus::new();
    let calls = Arc::new(AtomicUsize::new(0));
    bus.register("2suzy", order_kind(), counting_handler(Arc::clone(&calls)));
    bus.register("suzy", order_kind(), ok_handler());

    bus.send(order_event("suzy", "Reg 1")).await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(bus.sent(), 1);
}

#[tokio::test]
async fn kind_gate_blocks_other_kinds() {
    let bus = EventBus::new();
    let calls = Arc::new(AtomicUsize::new(0));
    bus.register("*", Some(EventKind::Log), counting_handler(Arc::clone(&calls)));

    bus.send(order_event("suzy", "Reg 1")).await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_handler_produces_a_dead_letter_with_exact_missed_handlers() {
    let bus = EventBus::new();

    bus.register(
        "suzy",
        order_kind(),
        handler_fn(|event: Arc<Event>| async move {
            if event.message() != "Reg 1" {
                return Err(HandlerError::new(format!(
                    "expected Reg 1, got {}",
                    event.message()
                )));
            }
            Ok(())
        }),
    );
    bus.register(
        "suzy",
        order_kind(),
        handler_fn(|event: Arc<Event>| async move {
            if event.message() != "Reg 2" {
                return Err(HandlerError::new(format!(
                    "expected Reg 2, got {}",
                    event.message()
                )));
            }
            Ok(())
        }),
    );

    let failed = Arc::new(AtomicUsize::new(0));
    let missed_counts = Arc::new(Mutex::new(Vec::new()));
    let messages = Arc::new(Mutex::new(Vec::new()));
    {
        let failed = Arc::clone(&failed);
        let missed_counts = Arc::clone(&missed_counts);
        let messages = Arc::clone(&messages);
        bus.register(
            "*",
            Some(EventKind::DeadLetter),
            handler_fn(move |event: Arc<Event>| {
                let failed = Arc::clone(&failed);
                let missed_counts = Arc::clone(&missed_counts);
                let messages = Arc::clone(&messages);
                async move {
                    failed.fetch_add(1, Ordering::SeqCst);
                    if let Some(dead) = event.as_dead_letter() {
                        missed_counts
                            .lock()
                            .unwrap()
                            .push(dead.missed_handlers().len());
                        messages.lock().unwrap().push(event.message().to_string());
                    }
                    Ok(())
                }
            }),
        );
    }

    bus.send(order_event("suzy", "Reg 1")).await;

    // Exact failed-handler tracking: only the handler that returned an
    // error is reported missed, not the whole tail after it.
    assert_eq!(failed.load(Ordering::SeqCst), 1, "one dead-letter expected");
    assert_eq!(*missed_counts.lock().unwrap(), vec![1]);
    assert_eq!(
        *messages.lock().unwrap(),
        vec!["expected Reg 2, got Reg 1".to_string()]
    );
    assert_eq!(bus.sent(), 2, "the suzy event plus the dead-letter");
}

#[tokio::test]
async fn dead_letter_wraps_the_original_event() {
    let bus = EventBus::new();
    bus.register(
        "suzy",
        order_kind(),
        handler_fn(|_| async { Err(HandlerError::new("boom")) }),
    );

    let originals = Arc::new(Mutex::new(Vec::new()));
    {
        let originals = Arc::clone(&originals);
        bus.register(
            "*",
            Some(EventKind::DeadLetter),
            handler_fn(move |event: Arc<Event>| {
                let originals = Arc::clone(&originals);
                async move {
                    if let Some(dead) = event.as_dead_letter() {
                        originals.lock().unwrap().push(dead.original().name().to_string());
                    }
                    Ok(())
                }
            }),
        );
    }

    bus.send(order_event("suzy", "Reg 1")).await;

    // Two dead-letters: the handler failure during the scan, then the
    // shortfall once the scan ends with a single success in the chain.
    assert_eq!(*originals.lock().unwrap(), vec!["suzy".to_string(), "suzy".to_string()]);
    assert_eq!(bus.sent(), 2);
}

#[tokio::test]
async fn no_subscribers_terminates_after_a_suppressed_dead_letter() {
    let bus = EventBus::new();

    bus.send(order_event("suzy", "Reg 1")).await;

    assert_eq!(bus.sent(), 0);
    assert!(bus.registrations().is_empty());
}

#[tokio::test]
async fn failing_wildcard_handler_is_depth_capped() {
    let bus = EventBus::new();
    bus.register(
        "*",
        None,
        handler_fn(|_| async { Err(HandlerError::new("always fails")) }),
    );

    // Every delivery fails and chains another dead-letter; the depth cap
    // must stop the chain instead of recursing forever.
    bus.send(order_event("suzy", "Reg 1")).await;

    assert_eq!(bus.sent(), 0);
}

#[tokio::test]
async fn send_error_emits_error_event_and_app_log() {
    let bus = EventBus::new();
    let errors = Arc::new(AtomicUsize::new(0));
    let logs = Arc::new(AtomicUsize::new(0));
    bus.register("error", Some(EventKind::Error), counting_handler(Arc::clone(&errors)));
    bus.register("app", Some(EventKind::Log), counting_handler(Arc::clone(&logs)));

    bus.send_error("db", std::io::Error::other("boom"), "save failed")
        .await;

    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(logs.load(Ordering::SeqCst), 1);
    assert_eq!(bus.sent(), 2);
}

#[tokio::test]
async fn reset_clears_registrations_and_counter() {
    let bus = EventBus::new();
    bus.register("suzy", order_kind(), ok_handler());
    bus.send(order_event("suzy", "Reg 1")).await;
    assert_eq!(bus.sent(), 1);

    bus.reset();

    assert!(bus.registrations().is_empty());
    assert_eq!(bus.sent(), 0);
}

#[tokio::test]
async fn clear_registrations_keeps_the_counter() {
    let bus = EventBus::new();
    bus.register("suzy", order_kind(), ok_handler());
    bus.send(order_event("suzy", "Reg 1")).await;

    bus.clear_registrations();

    assert!(bus.registrations().is_empty());
    assert_eq!(bus.sent(), 1);
}

#[test]
fn clone_shares_state() {
    let bus1 = EventBus::new();
    let bus2 = bus1.clone();

    bus1.register("suzy", order_kind(), ok_handler());

    assert_eq!(bus2.registrations().len(), 1);
    bus2.reset();
    assert!(bus1.registrations().is_empty());
}
