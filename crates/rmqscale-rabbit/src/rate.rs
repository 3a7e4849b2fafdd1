//! Publish-rate derivation from monotonic counter samples.

use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy)]
struct Sample {
    at_ms: u64,
    count: u64,
}

/// Turns a per-queue monotonic publish counter into a per-window delta.
///
/// Each observation is recorded; the reported value is the difference
/// between the current counter and the oldest retained sample, where
/// retention is trimmed so the baseline sits roughly one sampling
/// window back. With fewer than two samples the delta is 0. A counter
/// that moves backwards (broker restart) resets the series.
#[derive(Debug, Default)]
pub struct RateTracker {
    series: HashMap<String, VecDeque<Sample>>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `count` for `key` at `at_ms` and return the messages
    /// published over roughly the last `window_secs` seconds.
    ///
    /// Windows below one second are widened to one second.
    pub fn observe(&mut self, key: &str, count: u64, at_ms: u64, window_secs: u64) -> i64 {
        let span_ms = window_secs.max(1).saturating_mul(1000);
        let series = self.series.entry(key.to_string()).or_default();

        if series.front().is_some_and(|s| count < s.count) {
            series.clear();
        }

        // Trim the tail of history, but keep the newest sample that is
        // already a full window old as the baseline.
        while series.len() >= 2 && at_ms.saturating_sub(series[1].at_ms) >= span_ms {
            series.pop_front();
        }

        let published = series
            .front()
            .map_or(0, |base| (count - base.count) as i64);

        series.push_back(Sample { at_ms, count });
        published
    }
}
