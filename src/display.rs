//! Presentation-facing formatting of prober output.
//!
//! Metrics without a meaningful sample are shown as the [`NO_DATA`] sentinel
//! instead of a numeric zero.

use crate::measurements::AggregateResult;
use crate::progress::ProgressEvent;

/// Shown in place of a metric that has no valid sample yet.
pub const NO_DATA: &str = "-";

/// Milliseconds of live ping per Mbit/s of instant throughput.
///
/// The live ping reading is derived from throughput, not from a round trip,
/// which is why it is suppressed when throughput is negligible.
pub const LIVE_PING_FACTOR: f64 = 15.0;

/// Gauge readout for a presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readout {
    pub speed: String,
    pub ping: String,
    pub max_speed: String,
}

impl Readout {
    /// Readout before any trial has completed.
    pub fn idle() -> Self {
        Self {
            speed: format_speed(0.0),
            ping: NO_DATA.to_string(),
            max_speed: NO_DATA.to_string(),
        }
    }

    /// Readout after a completed trial.
    ///
    /// # Examples
    ///
    /// ```
    /// use speedprobe::display::Readout;
    /// use speedprobe::ProgressEvent;
    /// use std::time::Duration;
    ///
    /// let event = ProgressEvent {
    ///     trial: 1,
    ///     trials: 20,
    ///     throughput_mbps: 12.34,
    ///     running_max_mbps: 12.34,
    ///     latency: Duration::from_millis(40),
    ///     bytes: 1_000_000,
    /// };
    ///
    /// let readout = Readout::live(&event, 0.2);
    /// assert_eq!(readout.speed, "12.3");
    /// assert_eq!(readout.ping, "185 ms");
    /// assert_eq!(readout.max_speed, "12.3 mbps");
    /// ```
    pub fn live(event: &ProgressEvent, ping_threshold: f64) -> Self {
        Self {
            speed: format_speed(event.throughput_mbps),
            ping: format_ping(live_ping_ms(event.throughput_mbps, ping_threshold)),
            max_speed: format_max_speed(event.running_max_mbps),
        }
    }

    /// Readout for a finished run.
    pub fn summary(result: &AggregateResult) -> Self {
        Self {
            speed: format_speed(result.average_throughput_mbps()),
            ping: format_ping(result.mean_latency_ms()),
            max_speed: format_max_speed(result.max_throughput_mbps),
        }
    }
}

/// Live ping estimate, `None` at or below the threshold.
pub fn live_ping_ms(throughput_mbps: f64, threshold: f64) -> Option<f64> {
    if throughput_mbps > threshold {
        Some(throughput_mbps * LIVE_PING_FACTOR)
    } else {
        None
    }
}

pub fn format_speed(mbps: f64) -> String {
    format!("{:.1}", mbps)
}

pub fn format_max_speed(mbps: f64) -> String {
    if mbps > 0.0 {
        format!("{:.1} mbps", mbps)
    } else {
        NO_DATA.to_string()
    }
}

pub fn format_ping(ping_ms: Option<f64>) -> String {
    match ping_ms {
        Some(ms) => format!("{} ms", ms.round() as u64),
        None => NO_DATA.to_string(),
    }
}

/// Scales a byte count to KBytes, MBytes or GBytes (decimal).
pub fn scale_bytes(bytes: u64) -> (f64, &'static str) {
    if bytes >= 1_000_000_000 {
        (bytes as f64 / 1_000_000_000.0, "GBytes")
    } else if bytes >= 1_000_000 {
        (bytes as f64 / 1_000_000.0, "MBytes")
    } else {
        (bytes as f64 / 1_000.0, "KBytes")
    }
}
