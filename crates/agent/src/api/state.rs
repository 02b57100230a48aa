use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

/// Shared observable state for the patrol loop and the exposition server.
/// Cloning is cheap and all clones share the same counters.
#[derive(Clone)]
pub struct PatrolState {
    inner: Arc<Inner>,
}

struct Inner {
    passes: AtomicU64,
    pass_failures: AtomicU64,
    consecutive_failures: AtomicU64,
    rules_applied: AtomicU64,
    exploding: DashMap<(String, String), u64>,
}

impl PatrolState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                passes: AtomicU64::new(0),
                pass_failures: AtomicU64::new(0),
                consecutive_failures: AtomicU64::new(0),
                rules_applied: AtomicU64::new(0),
                exploding: DashMap::new(),
            }),
        }
    }

    pub fn increment_passes(&self) {
        self.inner.passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn passes(&self) -> u64 {
        self.inner.passes.load(Ordering::Relaxed)
    }

    pub fn increment_pass_failures(&self) {
        self.inner.pass_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pass_failures(&self) -> u64 {
        self.inner.pass_failures.load(Ordering::Relaxed)
    }

    pub fn set_consecutive_failures(&self, v: u64) {
        self.inner.consecutive_failures.store(v, Ordering::Relaxed);
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.inner.consecutive_failures.load(Ordering::Relaxed)
    }

    pub fn increment_rules_applied(&self) {
        self.inner.rules_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rules_applied(&self) -> u64 {
        self.inner.rules_applied.load(Ordering::Relaxed)
    }

    /// Records the distinct-value count for a detected exploding label.
    pub fn set_exploding(&self, metric: &str, label: &str, distinct: u64) {
        self.inner
            .exploding
            .insert((metric.to_string(), label.to_string()), distinct);
    }

    /// Clears the gauge entry for (metric, label); true when one existed.
    pub fn reset_exploding(&self, metric: &str, label: &str) -> bool {
        self.inner
            .exploding
            .remove(&(metric.to_string(), label.to_string()))
            .is_some()
    }

    /// Snapshot of the exploding-label gauge, sorted for stable exposition.
    pub fn exploding_snapshot(&self) -> Vec<((String, String), u64)> {
        let mut out: Vec<_> = self
            .inner
            .exploding
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        out.sort();
        out
    }
}

impl Default for PatrolState {
    fn default() -> Self {
        Self::new()
    }
}
