//! Deprecation signals.

use std::sync::Mutex;

use tracing::warn;

/// Receives deprecation notices raised by finder calls.
pub trait DeprecationObserver: Send + Sync {
    fn deprecated(&self, message: &str);
}

/// Logs each notice at `WARN`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDeprecations;

impl DeprecationObserver for TracingDeprecations {
    fn deprecated(&self, message: &str) {
        warn!(target: "docmap::deprecation", "{message}");
    }
}

/// Keeps every notice in memory.
#[derive(Debug, Default)]
pub struct RecordingDeprecations {
    messages: Mutex<Vec<String>>,
}

impl RecordingDeprecations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl DeprecationObserver for RecordingDeprecations {
    fn deprecated(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}
