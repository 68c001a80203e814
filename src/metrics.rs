use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use once_cell::sync::Lazy;

/// Global runtime metrics for the pulse pipeline.
///
/// Purpose:
/// - Track cycles and how many came back empty
/// - Track fetch task outcomes across all exchanges
/// - Track adapter-level throttling
///
/// Design:
/// - Lock-free (Atomics)
/// - Monotonic counters, never reset
#[derive(Default)]
pub struct RuntimeMetrics {
    // Cycles
    pub cycles_run: AtomicUsize,
    pub cycles_empty: AtomicUsize,

    // Fetch tasks
    pub tasks_spawned: AtomicUsize,
    pub tasks_ok: AtomicUsize,
    pub tasks_failed: AtomicUsize,
    pub tasks_cancelled: AtomicUsize,

    // Adapters
    pub requests_sent: AtomicUsize,
    pub rate_limited: AtomicUsize,
    pub tickers_collected: AtomicUsize,
}

impl RuntimeMetrics {
    pub fn incr(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicUsize, n: usize) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// One-line summary for periodic logging.
    pub fn summary(&self) -> String {
        format!(
            "cycles={} empty={} tasks={} ok={} failed={} cancelled={} requests={} rate_limited={} tickers={}",
            self.cycles_run.load(Ordering::Relaxed),
            self.cycles_empty.load(Ordering::Relaxed),
            self.tasks_spawned.load(Ordering::Relaxed),
            self.tasks_ok.load(Ordering::Relaxed),
            self.tasks_failed.load(Ordering::Relaxed),
            self.tasks_cancelled.load(Ordering::Relaxed),
            self.requests_sent.load(Ordering::Relaxed),
            self.rate_limited.load(Ordering::Relaxed),
            self.tickers_collected.load(Ordering::Relaxed),
        )
    }
}

/// Global metrics registry (singleton)
pub static METRICS: Lazy<Arc<RuntimeMetrics>> = Lazy::new(|| Arc::new(RuntimeMetrics::default()));
