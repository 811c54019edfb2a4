// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for handlers and delivery

use thiserror::Error;

/// Error returned by an event handler.
///
/// Opaque to the bus: it is captured as dead-letter data, never raised
/// back to the publisher.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HandlerError(String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Why a delivery produced a dead-letter
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// A handler returned an error for a specific event
    #[error(transparent)]
    Handler(#[from] HandlerError),
    /// Fewer successful deliveries than the bus expects for an event
    #[error("no handler(s) for event {0} found")]
    NoHandlers(String),
}

/// Render an error together with its context message
pub fn format_error(error: &dyn std::error::Error, message: &str) -> String {
    format!("{message}. Details: {error}")
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
