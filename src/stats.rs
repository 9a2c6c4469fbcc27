//! `stats()` support: a rolling window of recent per-query wall times plus
//! the JSON object the facade's `stats()` method returns.

use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Default rolling-window size for k-NN/range-search timing averages.
pub const DEFAULT_WINDOW: usize = 20;

/// Fixed-capacity FIFO of the most recent query durations, used to report a
/// rolling average without retaining every query ever run.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl RollingWindow {
    /// Creates an empty window holding at most `capacity` samples.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records a new sample, evicting the oldest one if the window is full.
    pub fn record(&mut self, sample: Duration) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Average of the samples currently in the window, or zero if empty.
    #[must_use]
    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.samples.iter().sum();
        total / self.samples.len() as u32
    }

    /// Number of samples currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if no samples have been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

/// JSON-serializable snapshot of an index's identity, size, and recent
/// query latency.
#[derive(Debug, Serialize)]
pub struct IndexStats {
    /// Short name identifying the index kind (`"hgraph"` or `"sindi"`).
    pub index_name: &'static str,
    /// Number of live elements.
    pub data_num: u64,
    /// Approximate resident memory in bytes.
    pub memory: u64,
    /// Rolling average k-NN search wall time, in microseconds.
    pub avg_knn_search_us: u64,
    /// Rolling average range-search wall time, in microseconds.
    pub avg_range_search_us: u64,
}

impl IndexStats {
    /// Renders this snapshot as a JSON string.
    ///
    /// # Panics
    ///
    /// Panics if serialization fails, which can only happen if `serde_json`
    /// itself is broken (this struct has no types that can fail to encode).
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("IndexStats always serializes")
    }
}

/// Timing trackers shared by both index facades: one rolling window for
/// k-NN search, one for range search.
#[derive(Debug, Clone, Default)]
pub struct QueryTimers {
    /// Rolling window of k-NN search durations.
    pub knn: RollingWindow,
    /// Rolling window of range-search durations.
    pub range: RollingWindow,
}

impl QueryTimers {
    /// Creates trackers using the default window size for both timers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_of_empty_window_is_zero() {
        let window = RollingWindow::new(4);
        assert_eq!(window.average(), Duration::ZERO);
    }

    #[test]
    fn average_reflects_recorded_samples() {
        let mut window = RollingWindow::new(4);
        window.record(Duration::from_millis(10));
        window.record(Duration::from_millis(20));
        assert_eq!(window.average(), Duration::from_millis(15));
    }

    #[test]
    fn window_evicts_oldest_sample_past_capacity() {
        let mut window = RollingWindow::new(2);
        window.record(Duration::from_millis(100));
        window.record(Duration::from_millis(10));
        window.record(Duration::from_millis(20));
        assert_eq!(window.len(), 2);
        assert_eq!(window.average(), Duration::from_millis(15));
    }

    #[test]
    fn stats_serialize_to_expected_keys() {
        let stats = IndexStats {
            index_name: "hgraph",
            data_num: 42,
            memory: 1024,
            avg_knn_search_us: 500,
            avg_range_search_us: 0,
        };
        let json = stats.to_json();
        assert!(json.contains("\"index_name\":\"hgraph\""));
        assert!(json.contains("\"data_num\":42"));
    }
}
