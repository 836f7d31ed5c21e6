//! Counters and per-check timings for the scoring pipeline

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

pub const DOCUMENTS_ANALYZED: &str = "documents_analyzed";
pub const CHECKS_RUN: &str = "checks_run";
pub const CHECKS_DEGRADED: &str = "checks_degraded";
pub const CHECKS_TIMED_OUT: &str = "checks_timed_out";
pub const PERSISTENCE_FAILURES: &str = "persistence_failures";

/// Thread-safe metrics collector, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    counters: Arc<RwLock<HashMap<String, u64>>>,
    timers: Arc<RwLock<HashMap<String, Duration>>>,
    gauges: Arc<RwLock<HashMap<String, f64>>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_counter(&self, name: &str) {
        self.add_to_counter(name, 1);
    }

    pub fn add_to_counter(&self, name: &str, value: u64) {
        *self.counters.write().entry(name.to_string()).or_insert(0) += value;
    }

    pub fn set_gauge(&self, name: &str, value: f64) {
        self.gauges.write().insert(name.to_string(), value);
    }

    /// Record the latest duration of `name`.
    pub fn record_duration(&self, name: &str, duration: Duration) {
        self.timers.write().insert(name.to_string(), duration);
    }

    /// Time a closure under `name`.
    pub fn time<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record_duration(name, start.elapsed());
        out
    }

    pub fn get_counter(&self, name: &str) -> u64 {
        self.counters.read().get(name).copied().unwrap_or(0)
    }

    pub fn get_gauge(&self, name: &str) -> f64 {
        self.gauges.read().get(name).copied().unwrap_or(0.0)
    }

    pub fn get_timer(&self, name: &str) -> Option<Duration> {
        self.timers.read().get(name).copied()
    }

    pub fn reset(&self) {
        self.counters.write().clear();
        self.timers.write().clear();
        self.gauges.write().clear();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.read().clone(),
            timers: self.timers.read().clone(),
            gauges: self.gauges.read().clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, u64>,
    pub timers: HashMap<String, Duration>,
    pub gauges: HashMap<String, f64>,
}
