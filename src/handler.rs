// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler abstraction: opaque, side-effecting consumers of events

use crate::error::HandlerError;
use crate::event::Event;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Consumer of matching events.
///
/// May fail; failures are converted into dead-letter events on the same
/// bus, never propagated to the publisher.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Arc<Event>) -> Result<(), HandlerError>;
}

/// Shared handler reference.
///
/// Registrations and dead-letter events hold these without taking
/// ownership, so one handler can appear in several places.
pub type Handler = Arc<dyn EventHandler>;

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, event: Arc<Event>) -> Result<(), HandlerError> {
        (self.0)(event).await
    }
}

/// Wrap an async closure as a [`Handler`]
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}
