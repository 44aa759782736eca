//! Test-harness reporting.

use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, info};

/// Sink for validation logs and failures.
///
/// The validator never panics on a failed check; it calls
/// [`mark_failed`](Reporter::mark_failed) and keeps going, so every
/// validation in a test runs before the test is declared failed.
pub trait Reporter: Send + Sync {
    /// Record a diagnostic line.
    fn log(&self, line: &str);

    /// Record a failure reason and mark the test as failed.
    fn mark_failed(&self, reason: &str);
}

/// Emits lines at `info` and failures at `error` through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn log(&self, line: &str) {
        info!(target: "infracheck", "{line}");
    }

    fn mark_failed(&self, reason: &str) {
        error!(target: "infracheck", "{reason}");
    }
}

/// Keeps every line and failure in memory.
///
/// Typical use is one reporter per `#[test]`, shared by all validations in
/// it, followed by [`assert_passed`](Self::assert_passed) at the end.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    lines: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
    failed: AtomicBool,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Panic with every recorded failure if any validation failed.
    ///
    /// # Panics
    ///
    /// Panics when at least one failure was recorded.
    pub fn assert_passed(&self) {
        if self.failed() {
            panic!("validation failed:\n{}", self.failures().join("\n"));
        }
    }
}

impl Reporter for RecordingReporter {
    fn log(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_owned());
    }

    fn mark_failed(&self, reason: &str) {
        self.failed.store(true, Ordering::SeqCst);
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(reason.to_owned());
    }
}
