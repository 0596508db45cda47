//! Global atomic counters for Agent Depot.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. before a CLI command exits).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters, no allocations, no locking.
pub struct Metrics {
    stagings_attempted: AtomicU64,
    stagings_failed: AtomicU64,
    invocations: AtomicU64,
    invocation_failures: AtomicU64,
    validations: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            stagings_attempted: AtomicU64::new(0),
            stagings_failed: AtomicU64::new(0),
            invocations: AtomicU64::new(0),
            invocation_failures: AtomicU64::new(0),
            validations: AtomicU64::new(0),
        }
    }

    pub fn inc_stagings_attempted(&self) {
        self.stagings_attempted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "stagings_attempted", "counter incremented");
    }

    pub fn inc_stagings_failed(&self) {
        self.stagings_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "stagings_failed", "counter incremented");
    }

    pub fn inc_invocations(&self) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "invocations", "counter incremented");
    }

    pub fn inc_invocation_failures(&self) {
        self.invocation_failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "invocation_failures", "counter incremented");
    }

    pub fn inc_validations(&self) {
        self.validations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "validations", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            stagings_attempted = self.stagings_attempted(),
            stagings_failed = self.stagings_failed(),
            invocations = self.invocations(),
            invocation_failures = self.invocation_failures(),
            validations = self.validations(),
        );
    }

    pub fn stagings_attempted(&self) -> u64 {
        self.stagings_attempted.load(Ordering::Relaxed)
    }

    pub fn stagings_failed(&self) -> u64 {
        self.stagings_failed.load(Ordering::Relaxed)
    }

    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    pub fn invocation_failures(&self) -> u64 {
        self.invocation_failures.load(Ordering::Relaxed)
    }

    pub fn validations(&self) -> u64 {
        self.validations.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.stagings_attempted.store(0, Ordering::Relaxed);
        self.stagings_failed.store(0, Ordering::Relaxed);
        self.invocations.store(0, Ordering::Relaxed);
        self.invocation_failures.store(0, Ordering::Relaxed);
        self.validations.store(0, Ordering::Relaxed);
    }
}
