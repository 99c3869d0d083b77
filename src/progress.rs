//! Live progress publication.
//!
//! The prober reports one [`ProgressEvent`] per completed trial to a
//! [`ProgressCallback`]. Closures, custom types and tokio channels all work as
//! sinks, so a presentation layer can either be called directly or consume
//! events from its own task.

use std::time::Duration;
use tokio::sync::mpsc;

/// Snapshot published after each completed trial.
///
/// # Examples
///
/// ```no_run
/// use speedprobe::{Config, Prober, ProgressEvent};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let prober = Prober::new(Config::default())?
///     .with_callback(|event: ProgressEvent| {
///         println!(
///             "trial {}/{}: {:.1} Mbps (max {:.1})",
///             event.trial, event.trials, event.throughput_mbps, event.running_max_mbps
///         );
///     });
///
/// prober.run().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// 1-based index of the trial that just completed
    pub trial: usize,
    /// Trials configured for the run
    pub trials: usize,
    /// Throughput of this trial in Mbit/s
    pub throughput_mbps: f64,
    /// Maximum throughput seen so far in the run, including this trial
    pub running_max_mbps: f64,
    /// Request start to response headers
    pub latency: Duration,
    pub bytes: u64,
}

/// Receives progress events from a running prober.
///
/// Implemented for any `Fn(ProgressEvent) + Send + Sync` and for
/// [`ProgressSender`].
///
/// # Examples
///
/// ```
/// use speedprobe::{ProgressCallback, ProgressEvent};
///
/// struct Gauge;
///
/// impl ProgressCallback for Gauge {
///     fn on_progress(&self, event: ProgressEvent) {
///         let _ = event.throughput_mbps;
///     }
/// }
/// ```
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

impl<F> ProgressCallback for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Channel-backed progress sink.
///
/// Forwards every event to an unbounded tokio channel. A dropped receiver is
/// not an error for the prober; further events are discarded.
#[derive(Clone)]
pub struct ProgressSender {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSender {
    /// Creates a sender and the receiver the presentation task drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressCallback for ProgressSender {
    fn on_progress(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }
}

/// Creates a channel sink for progress events.
///
/// Pass the sender to [`Prober::with_callback`](crate::Prober::with_callback)
/// and drain the receiver from the presentation task. The receiver yields
/// `None` once the run is over and the prober has been dropped.
///
/// # Examples
///
/// ```
/// use speedprobe::progress;
///
/// # #[tokio::main]
/// # async fn main() {
/// let (sender, mut receiver) = progress::channel();
/// drop(sender);
/// assert!(receiver.recv().await.is_none());
/// # }
/// ```
pub fn channel() -> (ProgressSender, mpsc::UnboundedReceiver<ProgressEvent>) {
    ProgressSender::new()
}
