use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Default)]
pub struct Metrics {
    activations: AtomicU64,
    duplicate_activations: AtomicU64,
    activation_failures: AtomicU64,
    toggles: AtomicU64,
    toggle_failures: AtomicU64,
    command_timeouts: AtomicU64,
    permission_denials: AtomicU64,
    discarded_results: AtomicU64,
    triggers_matched: AtomicU64,
    triggers_ignored: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_activations(&self) {
        self.activations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_duplicate_activations(&self) {
        self.duplicate_activations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_activation_failures(&self) {
        self.activation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_toggles(&self) {
        self.toggles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_toggle_failures(&self) {
        self.toggle_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_command_timeouts(&self) {
        self.command_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_permission_denials(&self) {
        self.permission_denials.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_discarded_results(&self) {
        self.discarded_results.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_triggers_matched(&self) {
        self.triggers_matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_triggers_ignored(&self) {
        self.triggers_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            activations: self.activations.load(Ordering::Relaxed),
            duplicate_activations: self.duplicate_activations.load(Ordering::Relaxed),
            activation_failures: self.activation_failures.load(Ordering::Relaxed),
            toggles: self.toggles.load(Ordering::Relaxed),
            toggle_failures: self.toggle_failures.load(Ordering::Relaxed),
            command_timeouts: self.command_timeouts.load(Ordering::Relaxed),
            permission_denials: self.permission_denials.load(Ordering::Relaxed),
            discarded_results: self.discarded_results.load(Ordering::Relaxed),
            triggers_matched: self.triggers_matched.load(Ordering::Relaxed),
            triggers_ignored: self.triggers_ignored.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub activations: u64,
    pub duplicate_activations: u64,
    pub activation_failures: u64,
    pub toggles: u64,
    pub toggle_failures: u64,
    pub command_timeouts: u64,
    pub permission_denials: u64,
    pub discarded_results: u64,
    pub triggers_matched: u64,
    pub triggers_ignored: u64,
}

impl MetricsSnapshot {
    pub fn toggle_success_rate(&self) -> f64 {
        if self.toggles == 0 {
            return 1.0;
        }
        1.0 - (self.toggle_failures as f64 / self.toggles as f64)
    }
}
