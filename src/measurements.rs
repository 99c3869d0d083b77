use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Converts a byte count transferred over `elapsed` into decimal Mbit/s.
///
/// Returns 0 when `elapsed` is zero, so the result is never negative,
/// infinite or NaN.
///
/// # Examples
///
/// ```
/// use speedprobe::measurements::throughput_mbps;
/// use std::time::Duration;
///
/// assert_eq!(throughput_mbps(10_000_000, Duration::from_secs(1)), 80.0);
/// assert_eq!(throughput_mbps(10_000_000, Duration::ZERO), 0.0);
/// ```
pub fn throughput_mbps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        (bytes as f64 * 8.0) / (secs * 1_000_000.0)
    } else {
        0.0
    }
}

/// One completed download attempt.
#[derive(Debug, Clone)]
pub struct Trial {
    /// 1-based position in the run
    pub index: usize,
    /// Request start (`t0`)
    pub started: Instant,
    /// Response headers available (`t1`)
    pub headers_at: Instant,
    /// End of body (`t2`)
    pub finished: Instant,
    pub bytes: u64,
}

impl Trial {
    /// Latency proxy: request start to response headers.
    pub fn latency(&self) -> Duration {
        self.headers_at.saturating_duration_since(self.started)
    }

    /// Time spent reading the body.
    pub fn transfer_time(&self) -> Duration {
        self.finished.saturating_duration_since(self.headers_at)
    }

    pub fn throughput_mbps(&self) -> f64 {
        throughput_mbps(self.bytes, self.transfer_time())
    }
}

/// Aggregate statistics of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Highest per-trial throughput in Mbit/s
    pub max_throughput_mbps: f64,
    /// Mean latency over completed trials, `None` if no trial completed
    pub mean_latency: Option<Duration>,
    pub completed_trials: usize,
    pub failed_trials: usize,
    pub total_bytes: u64,
    pub total_transfer_time: Duration,
}

impl AggregateResult {
    /// Throughput over all completed trials taken together.
    pub fn average_throughput_mbps(&self) -> f64 {
        throughput_mbps(self.total_bytes, self.total_transfer_time)
    }

    pub fn mean_latency_ms(&self) -> Option<f64> {
        self.mean_latency.map(|l| l.as_secs_f64() * 1000.0)
    }
}

/// Folds trials into running aggregates.
///
/// Owned by the run loop; trials are folded one at a time in order.
#[derive(Debug, Clone, Default)]
pub struct MeasurementsCollector {
    max_throughput_mbps: f64,
    latency_sum: Duration,
    completed: usize,
    failed: usize,
    total_bytes: u64,
    total_transfer_time: Duration,
}

impl MeasurementsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed trial and returns the running maximum throughput.
    pub fn record_trial(&mut self, trial: &Trial) -> f64 {
        let throughput = trial.throughput_mbps();
        if throughput > self.max_throughput_mbps {
            self.max_throughput_mbps = throughput;
        }
        self.latency_sum += trial.latency();
        self.total_bytes += trial.bytes;
        self.total_transfer_time += trial.transfer_time();
        self.completed += 1;

        self.max_throughput_mbps
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn max_throughput_mbps(&self) -> f64 {
        self.max_throughput_mbps
    }

    pub fn mean_latency(&self) -> Option<Duration> {
        if self.completed == 0 {
            return None;
        }
        let n = u32::try_from(self.completed).unwrap_or(u32::MAX);
        Some(self.latency_sum / n)
    }

    /// Current aggregate.
    pub fn get(&self) -> AggregateResult {
        AggregateResult {
            max_throughput_mbps: self.max_throughput_mbps,
            mean_latency: self.mean_latency(),
            completed_trials: self.completed,
            failed_trials: self.failed,
            total_bytes: self.total_bytes,
            total_transfer_time: self.total_transfer_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trial(index: usize, latency_ms: u64, transfer_ms: u64, bytes: u64) -> Trial {
        let started = Instant::now();
        let headers_at = started + Duration::from_millis(latency_ms);
        Trial {
            index,
            started,
            headers_at,
            finished: headers_at + Duration::from_millis(transfer_ms),
            bytes,
        }
    }

    #[test]
    fn test_throughput_formula() {
        assert_eq!(throughput_mbps(10_000_000, Duration::from_secs(1)), 80.0);
        assert_eq!(throughput_mbps(1_000_000, Duration::from_millis(500)), 16.0);
        assert_eq!(throughput_mbps(0, Duration::from_secs(1)), 0.0);
        assert_eq!(throughput_mbps(1234, Duration::ZERO), 0.0);
    }

    #[test]
    fn test_trial_timings() {
        let t = trial(1, 40, 1000, 10_000_000);
        assert_eq!(t.latency(), Duration::from_millis(40));
        assert_eq!(t.transfer_time(), Duration::from_secs(1));
        assert_eq!(t.throughput_mbps(), 80.0);
    }

    #[test]
    fn test_empty_collector() {
        let collector = MeasurementsCollector::new();
        let result = collector.get();
        assert_eq!(result.max_throughput_mbps, 0.0);
        assert_eq!(result.mean_latency, None);
        assert_eq!(result.completed_trials, 0);
        assert_eq!(result.average_throughput_mbps(), 0.0);
    }

    #[test]
    fn test_running_max_and_mean() {
        let mut collector = MeasurementsCollector::new();

        assert_eq!(collector.record_trial(&trial(1, 10, 1000, 1_000_000)), 8.0);
        assert_eq!(collector.record_trial(&trial(2, 30, 1000, 3_000_000)), 24.0);
        // a slower trial leaves the maximum untouched
        assert_eq!(collector.record_trial(&trial(3, 20, 1000, 2_000_000)), 24.0);
        collector.record_failure();

        let result = collector.get();
        assert_eq!(result.completed_trials, 3);
        assert_eq!(result.failed_trials, 1);
        assert_eq!(result.mean_latency, Some(Duration::from_millis(20)));
        assert_eq!(result.mean_latency_ms(), Some(20.0));
        assert_eq!(result.total_bytes, 6_000_000);
        assert_eq!(result.total_transfer_time, Duration::from_secs(3));
        assert_eq!(result.average_throughput_mbps(), 16.0);
    }

    #[test]
    fn test_failures_do_not_touch_latency() {
        let mut collector = MeasurementsCollector::new();
        collector.record_failure();
        collector.record_failure();
        assert_eq!(collector.failed(), 2);
        assert_eq!(collector.mean_latency(), None);
    }
}
