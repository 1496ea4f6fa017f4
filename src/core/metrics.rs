use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Process-lifetime counters for the sync engine.
#[derive(Debug)]
pub struct SyncMetrics {
    cycles_started: AtomicU64,
    cycles_failed: AtomicU64,
    logins: AtomicU64,
    pages_fetched: AtomicU64,
    pages_failed: AtomicU64,
    new_listings: AtomicU64,
    notifications_sent: AtomicU64,
    notifications_failed: AtomicU64,
    total_cycle_ms: AtomicU64,
    cycle_samples: AtomicU64,
    start_time: Instant,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub cycles_started: u64,
    pub cycles_failed: u64,
    pub logins: u64,
    pub pages_fetched: u64,
    pub pages_failed: u64,
    pub new_listings: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub average_cycle_ms: f64,
    pub uptime_secs: u64,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self {
            cycles_started: AtomicU64::new(0),
            cycles_failed: AtomicU64::new(0),
            logins: AtomicU64::new(0),
            pages_fetched: AtomicU64::new(0),
            pages_failed: AtomicU64::new(0),
            new_listings: AtomicU64::new(0),
            notifications_sent: AtomicU64::new(0),
            notifications_failed: AtomicU64::new(0),
            total_cycle_ms: AtomicU64::new(0),
            cycle_samples: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn increment_cycles_started(&self) {
        self.cycles_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cycles_failed(&self) {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_logins(&self) {
        self.logins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_pages_fetched(&self, count: u64) {
        self.pages_fetched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_pages_failed(&self, count: u64) {
        self.pages_failed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_new_listings(&self, count: u64) {
        self.new_listings.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_notifications(&self, sent: u64, failed: u64) {
        self.notifications_sent.fetch_add(sent, Ordering::Relaxed);
        self.notifications_failed.fetch_add(failed, Ordering::Relaxed);
    }

    pub fn record_cycle_duration(&self, duration: Duration) {
        self.total_cycle_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        self.cycle_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_logins(&self) -> u64 {
        self.logins.load(Ordering::Relaxed)
    }

    pub fn get_average_cycle_ms(&self) -> f64 {
        let total = self.total_cycle_ms.load(Ordering::Relaxed);
        let samples = self.cycle_samples.load(Ordering::Relaxed);

        if samples == 0 {
            0.0
        } else {
            total as f64 / samples as f64
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_started: self.cycles_started.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            logins: self.get_logins(),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            new_listings: self.new_listings.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
            average_cycle_ms: self.get_average_cycle_ms(),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for SyncMetrics {
    fn default() -> Self {
        Self::new()
    }
}
