// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Name filters for event subscriptions

/// Pattern tested against an event's name
/// Supports:
///   - Match-all: "*"
///   - Prefix: "pipeline" matches "pipeline-start", "pipelines"
///   - Exclusion: "!pipeline" matches every name that does NOT start with "pipeline"
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Filter(String);

impl Filter {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// Check if this filter matches an event name
    pub fn matches(&self, event_name: &str) -> bool {
        if self.0 == "*" {
            return true;
        }

        if let Some(stripped) = self.0.strip_prefix('!') {
            let prefix = stripped.trim_start_matches('!');
            return !event_name.starts_with(prefix);
        }

        event_name.starts_with(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Filter {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

impl From<String> for Filter {
    fn from(pattern: String) -> Self {
        Self(pattern)
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
