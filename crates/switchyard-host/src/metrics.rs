use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct DispatchMetrics {
    pub dispatches: AtomicU64,
    pub invocations: AtomicU64,
    pub skipped_invocations: AtomicU64,
    pub invoke_errors: AtomicU64,
    pub failures: AtomicU64,
    pub rejected_methods: AtomicU64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DispatchMetricsSnapshot {
    pub dispatches: u64,
    pub invocations: u64,
    pub skipped_invocations: u64,
    pub invoke_errors: u64,
    pub failures: u64,
    pub rejected_methods: u64,
}

impl DispatchMetrics {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            dispatches: self.dispatches.load(Ordering::Relaxed),
            invocations: self.invocations.load(Ordering::Relaxed),
            skipped_invocations: self.skipped_invocations.load(Ordering::Relaxed),
            invoke_errors: self.invoke_errors.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            rejected_methods: self.rejected_methods.load(Ordering::Relaxed),
        }
    }
}
