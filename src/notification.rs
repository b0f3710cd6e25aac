//! Progress reporting for long-running saves.
//!
//! The engine only ever talks to a [`ProgressSink`]; how messages reach the
//! user (toast, log line, nothing) is up to the caller.

use tracing::{error, info};

/// Terminal state of an operation reported through a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Error(String),
}

pub trait ProgressSink: Send + Sync {
    fn progress(&self, message: &str);

    fn finish(&self, outcome: Outcome);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn progress(&self, _message: &str) {}

    fn finish(&self, _outcome: Outcome) {}
}

/// Sink that writes progress to the tracing subscriber, tagged with an operation label.
#[derive(Debug, Clone)]
pub struct TracingProgressSink {
    label: String,
}

impl TracingProgressSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl ProgressSink for TracingProgressSink {
    fn progress(&self, message: &str) {
        info!(operation = %self.label, "{}", message);
    }

    fn finish(&self, outcome: Outcome) {
        match outcome {
            Outcome::Success(message) => info!(operation = %self.label, "✅ {}", message),
            Outcome::Error(message) => error!(operation = %self.label, "❌ {}", message),
        }
    }
}
