use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,
    stream_requests: AtomicUsize,
    deck_requests: AtomicUsize,

    // Timing (in microseconds)
    total_query_time_us: AtomicU64,
    total_deck_time_us: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            successful_requests: AtomicUsize::new(0),
            failed_requests: AtomicUsize::new(0),
            stream_requests: AtomicUsize::new(0),
            deck_requests: AtomicUsize::new(0),
            total_query_time_us: AtomicU64::new(0),
            total_deck_time_us: AtomicU64::new(0),
        })
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_stream(&self) {
        self.stream_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_query(&self, duration: Duration) {
        self.total_query_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_deck(&self, duration: Duration) {
        self.deck_requests.fetch_add(1, Ordering::Relaxed);
        self.total_deck_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let deck_requests = self.deck_requests.load(Ordering::Relaxed);
        let query_requests = self
            .total_requests
            .load(Ordering::Relaxed)
            .saturating_sub(deck_requests);

        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            stream_requests: self.stream_requests.load(Ordering::Relaxed),
            deck_requests,
            avg_query_time_ms: avg_time_ms(&self.total_query_time_us, query_requests),
            avg_deck_time_ms: avg_time_ms(&self.total_deck_time_us, deck_requests),
        }
    }
}

fn avg_time_ms(total_us: &AtomicU64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    total_us.load(Ordering::Relaxed) as f64 / count as f64 / 1000.0
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub stream_requests: usize,
    pub deck_requests: usize,
    pub avg_query_time_ms: f64,
    pub avg_deck_time_ms: f64,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_averages_split_by_kind() {
        let metrics = Metrics::new();
        metrics.record_request(true);
        metrics.record_query(Duration::from_millis(30));
        metrics.record_request(false);
        metrics.record_query(Duration::from_millis(10));
        metrics.record_request(true);
        metrics.record_deck(Duration::from_millis(4));
        metrics.record_stream();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.stream_requests, 1);
        assert_eq!(snapshot.deck_requests, 1);
        assert_eq!(snapshot.avg_query_time_ms, 20.0);
        assert_eq!(snapshot.avg_deck_time_ms, 4.0);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.avg_query_time_ms, 0.0);
    }
}
