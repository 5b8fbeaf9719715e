// Library metrics module
//
// Counters for the addition and removal pipelines, logged on shutdown

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Pipeline counters
///
/// Uses atomic operations so concurrent pipelines can record without locks.
#[derive(Debug)]
pub struct Metrics {
    /// Blogs persisted and inserted into the registry
    pub blogs_added: AtomicUsize,

    /// Candidates rejected because the name was already taken
    pub duplicates_rejected: AtomicUsize,

    /// Candidate URLs that failed validation
    pub invalid_urls: AtomicUsize,

    /// Online probes or metadata refreshes that failed
    pub probe_failures: AtomicUsize,

    /// Index writes that failed
    pub persistence_failures: AtomicUsize,

    pub blogs_removed: AtomicUsize,

    /// Removals stopped by a content or index deletion failure
    pub removal_failures: AtomicUsize,

    /// Time spent in probe + metadata refresh, in milliseconds
    pub total_probe_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            blogs_added: AtomicUsize::new(0),
            duplicates_rejected: AtomicUsize::new(0),
            invalid_urls: AtomicUsize::new(0),
            probe_failures: AtomicUsize::new(0),
            persistence_failures: AtomicUsize::new(0),
            blogs_removed: AtomicUsize::new(0),
            removal_failures: AtomicUsize::new(0),
            total_probe_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_blog_added(&self) {
        self.blogs_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_url(&self) {
        self.invalid_urls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_probe_failure(&self) {
        self.probe_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_blog_removed(&self) {
        self.blogs_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_removal_failure(&self) {
        self.removal_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record how long one candidate's network-bound steps took
    pub fn record_probe_time(&self, duration: Duration) {
        self.total_probe_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average probe time over every candidate that reached the probe step
    pub fn avg_probe_time_ms(&self) -> f64 {
        let total = self.total_probe_time_ms.load(Ordering::Relaxed);
        let count = self.blogs_added.load(Ordering::Relaxed)
            + self.duplicates_rejected.load(Ordering::Relaxed)
            + self.probe_failures.load(Ordering::Relaxed)
            + self.persistence_failures.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Library Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Additions: {} added, {} duplicates, {} invalid URLs, {} probe failures, {} persistence failures",
            self.blogs_added.load(Ordering::Relaxed),
            self.duplicates_rejected.load(Ordering::Relaxed),
            self.invalid_urls.load(Ordering::Relaxed),
            self.probe_failures.load(Ordering::Relaxed),
            self.persistence_failures.load(Ordering::Relaxed)
        );
        tracing::info!("Average probe time: {:.2}ms", self.avg_probe_time_ms());
        tracing::info!(
            "Removals: {} removed, {} failed",
            self.blogs_removed.load(Ordering::Relaxed),
            self.removal_failures.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
