//! Outcome of writes that are issued once and never retried.
//!
//! Presence heartbeats, close-time writes and index fan-out all go through
//! [`BestEffort`] so callers can see partial failure without it ever being
//! raised as an error.

use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestEffortFailure {
    pub target: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestEffort {
    operation: &'static str,
    attempted: usize,
    failures: Vec<BestEffortFailure>,
}

impl BestEffort {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            attempted: 0,
            failures: Vec::new(),
        }
    }

    /// Outcome of a single write.
    pub fn single<E: Display>(
        operation: &'static str,
        target: impl Display,
        result: Result<(), E>,
    ) -> Self {
        let mut outcome = Self::new(operation);
        outcome.record(target, result);
        outcome
    }

    /// Record one write.  Failures are logged here so callers may drop the
    /// outcome without losing the trace.
    pub fn record<E: Display>(&mut self, target: impl Display, result: Result<(), E>) {
        self.attempted += 1;
        if let Err(e) = result {
            tracing::warn!(
                operation = self.operation,
                target = %target,
                error = %e,
                "Best-effort write failed, not retrying"
            );
            self.failures.push(BestEffortFailure {
                target: target.to_string(),
                error: e.to_string(),
            });
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn succeeded(&self) -> usize {
        self.attempted - self.failures.len()
    }

    pub fn failures(&self) -> &[BestEffortFailure] {
        &self.failures
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
