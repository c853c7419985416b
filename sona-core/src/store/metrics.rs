//! Rolling query-latency window for the pattern store.

use std::collections::VecDeque;

use crate::constants::defaults;

/// Rolling window of recent similarity-query latencies.
#[derive(Debug)]
pub(crate) struct QueryLatencyWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

/// Snapshot of recent query performance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QueryStats {
    /// Samples currently in the window
    pub count: usize,
    /// Mean latency in milliseconds
    pub avg_ms: f64,
    /// 95th percentile latency in milliseconds
    pub p95_ms: f64,
}

impl QueryLatencyWindow {
    pub(crate) fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(defaults::QUERY_LATENCY_WINDOW),
            capacity: defaults::QUERY_LATENCY_WINDOW,
        }
    }

    pub(crate) fn record(&mut self, latency_ms: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(latency_ms);
    }

    pub(crate) fn snapshot(&self) -> QueryStats {
        if self.samples.is_empty() {
            return QueryStats::default();
        }

        let count = self.samples.len();
        let avg_ms = self.samples.iter().sum::<f64>() / count as f64;

        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let p95_index = ((count as f64 * 0.95).ceil() as usize).saturating_sub(1);
        let p95_ms = sorted[p95_index.min(count - 1)];

        QueryStats {
            count,
            avg_ms,
            p95_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window() {
        let window = QueryLatencyWindow::new();
        assert_eq!(window.snapshot(), QueryStats::default());
    }

    #[test]
    fn test_rolling_eviction() {
        let mut window = QueryLatencyWindow::new();
        for i in 0..150 {
            window.record(f64::from(i));
        }
        let stats = window.snapshot();
        assert_eq!(stats.count, 100);
        // Samples 0..50 rolled out of the window.
        assert!(stats.avg_ms > 90.0);
    }

    #[test]
    fn test_percentile() {
        let mut window = QueryLatencyWindow::new();
        for i in 1..=100 {
            window.record(f64::from(i));
        }
        let stats = window.snapshot();
        assert!((stats.avg_ms - 50.5).abs() < 1e-9);
        assert!((stats.p95_ms - 95.0).abs() < 1e-9);
    }
}
