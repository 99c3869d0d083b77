//! speedprobe - HTTP download speed prober
//!
//! This library estimates network throughput by downloading a fixed resource
//! over HTTP a fixed number of times, one request after another. Each attempt
//! yields a latency sample (request start to response headers) and a
//! throughput sample; the run reports the maximum throughput and the mean
//! latency.
//!
//! # Features
//!
//! - Sequential single-stream download trials
//! - Live progress through callbacks or a tokio channel
//! - Per-trial timeouts, with failed trials skipped instead of aborting the run
//! - Cancellation between and during trials
//! - Asynchronous I/O using tokio and reqwest

pub mod config;
pub mod display;
pub mod error;
pub mod measurements;
pub mod prober;
pub mod progress;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result, TrialError};
pub use measurements::AggregateResult;
pub use prober::{ProbeHandle, Prober, RunOutcome, RunStatus};
pub use progress::{ProgressCallback, ProgressEvent};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
