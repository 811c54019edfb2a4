// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Audit trail of delivered events
//!
//! The bus expects every event to reach at least two destinations; an
//! attached `EventLog` is the canonical second one. Records are rendered
//! to JSONL, so carried errors and handler lists appear as strings and
//! counts rather than live references.

use crate::bus::EventBus;
use crate::error::HandlerError;
use crate::event::Event;
use crate::filter::Filter;
use crate::handler::handler_fn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// A logged event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic sequence number
    pub sequence: u64,
    /// Event timestamp (milliseconds since log creation)
    pub timestamp_ms: u64,
    /// Event family label
    pub kind: String,
    /// The event name
    pub name: String,
    pub message: String,
    pub domain: String,
    /// Rendered error, when the event carried one
    pub error: Option<String>,
    pub data: HashMap<String, Value>,
}

/// Append-only event log
pub struct EventLog {
    path: PathBuf,
    sequence: u64,
    start_time: Instant,
}

impl EventLog {
    /// Open or create an event log at the given path
    pub fn open(path: PathBuf) -> std::io::Result<Self> {
        // Count existing entries to resume the sequence
        let sequence = if path.exists() {
            let file = File::open(&path)?;
            BufReader::new(file).lines().count() as u64
        } else {
            0
        };

        Ok(Self {
            path,
            sequence,
            start_time: Instant::now(),
        })
    }

    /// Append an event to the log
    pub fn append(&mut self, event: &Event) -> std::io::Result<EventRecord> {
        self.sequence += 1;

        let record = EventRecord {
            sequence: self.sequence,
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            kind: event.kind().to_string(),
            name: event.name().to_string(),
            message: event.message().to_string(),
            domain: event.domain().to_string(),
            error: event.error().map(|e| e.to_string()),
            data: event.data().clone(),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(&record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(file, "{}", json)?;

        Ok(record)
    }

    /// Read all events from the log
    pub fn read_all(&self) -> std::io::Result<Vec<EventRecord>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let record: EventRecord = serde_json::from_str(&line)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            records.push(record);
        }

        Ok(records)
    }

    /// Query events whose name matches the filter
    pub fn query(&self, filter: &Filter) -> std::io::Result<Vec<EventRecord>> {
        let all = self.read_all()?;
        Ok(all
            .into_iter()
            .filter(|record| filter.matches(&record.name))
            .collect())
    }

    /// Query events after a sequence number
    pub fn after(&self, sequence: u64) -> std::io::Result<Vec<EventRecord>> {
        let all = self.read_all()?;
        Ok(all
            .into_iter()
            .filter(|record| record.sequence > sequence)
            .collect())
    }

    /// Get current sequence number
    pub fn current_sequence(&self) -> u64 {
        self.sequence
    }

    /// Register this log on the bus as a wildcard subscriber so every
    /// event published there lands in the audit trail
    pub fn attach(self, bus: &EventBus) -> Arc<Mutex<EventLog>> {
        let log = Arc::new(Mutex::new(self));
        let sink = Arc::clone(&log);
        bus.register(
            "*",
            None,
            handler_fn(move |event: Arc<Event>| {
                let sink = Arc::clone(&sink);
                async move {
                    let mut log = sink.lock().unwrap_or_else(|e| e.into_inner());
                    log.append(&event)
                        .map(|_| ())
                        .map_err(|e| HandlerError::new(e.to_string()))
                }
            }),
        );
        log
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
