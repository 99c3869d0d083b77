use crate::config::Config;
use crate::error::TrialError;
use crate::measurements::{AggregateResult, MeasurementsCollector, Trial};
use crate::progress::{ProgressCallback, ProgressEvent};
use crate::transport::{HttpTransport, Transport};
use crate::{Error, Result};
use log::{debug, error, info, warn};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Every configured trial was attempted
    Completed,
    /// The run was cancelled; the aggregate covers the trials completed before that
    Cancelled,
}

/// Final result of a run that did not fail outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub result: AggregateResult,
}

impl RunOutcome {
    pub fn is_cancelled(&self) -> bool {
        self.status == RunStatus::Cancelled
    }
}

type CallbackRef = Arc<dyn ProgressCallback>;

enum TrialOutcome {
    Completed(Trial),
    Failed(TrialError),
    Cancelled,
}

/// Download speed prober.
///
/// Downloads the configured URL `trials` times, one request at a time, and
/// measures each attempt: the latency proxy (request start to response
/// headers) and the throughput of the body transfer. After every completed
/// trial a [`ProgressEvent`] goes to the attached callback; when the run ends
/// the aggregate comes back as a [`RunOutcome`].
///
/// A trial that fails (connection error, bad status, broken body, timeout) is
/// counted and skipped without a progress event. The run itself only fails if
/// the configuration is invalid or no trial completes.
///
/// # Examples
///
/// ## Awaiting a run directly
///
/// ```no_run
/// use speedprobe::{Config, Prober};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let prober = Prober::new(Config::new("https://example.com/10MB.bin").with_trials(5))?;
/// let outcome = prober.run().await?;
///
/// println!(
///     "max {:.1} Mbps, mean latency {:?}",
///     outcome.result.max_throughput_mbps, outcome.result.mean_latency
/// );
/// # Ok(())
/// # }
/// ```
///
/// ## Background task with a progress channel
///
/// ```no_run
/// use speedprobe::{progress, Config, Prober};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let (sender, mut events) = progress::channel();
/// let handle = Prober::new(Config::default())?.with_callback(sender).spawn();
///
/// while let Some(event) = events.recv().await {
///     println!("{:.1} Mbps", event.throughput_mbps);
/// }
///
/// let outcome = handle.join().await?;
/// # Ok(())
/// # }
/// ```
pub struct Prober {
    config: Config,
    url: Url,
    transport: Arc<dyn Transport>,
    callback: Option<CallbackRef>,
    cancellation_token: CancellationToken,
}

impl Prober {
    /// Creates a prober that downloads over HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid, or
    /// [`Error::Http`] if the HTTP client cannot be built. Nothing is sent
    /// over the network here.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, transport)
    }

    /// Creates a prober on top of a custom transport.
    pub fn with_transport<T: Transport + 'static>(config: Config, transport: T) -> Result<Self> {
        config.validate()?;
        let url = config.parse_url()?;

        Ok(Self {
            config,
            url,
            transport: Arc::new(transport),
            callback: None,
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Attaches a progress callback.
    ///
    /// The callback runs on the prober's task once per completed trial, in
    /// trial order.
    pub fn with_callback<C: ProgressCallback + 'static>(mut self, callback: C) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    fn notify(&self, event: ProgressEvent) {
        if let Some(callback) = &self.callback {
            callback.on_progress(event);
        }
    }

    /// Returns the token that cancels this prober's run.
    ///
    /// Cancellation is checked before each trial and while a trial waits for
    /// headers or body data. A trial interrupted mid-way is discarded.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs all trials and returns the aggregate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AllTrialsFailed`] if the run was not cancelled and no
    /// trial completed.
    pub async fn run(&self) -> Result<RunOutcome> {
        let trials = self.config.trials;
        info!("Probing {} with {} trials", self.url, trials);

        let mut collector = MeasurementsCollector::new();
        let mut buffer = vec![0u8; self.config.buffer_size];
        let mut status = RunStatus::Completed;

        for index in 1..=trials {
            if self.cancellation_token.is_cancelled() {
                info!("Run cancelled before trial {}/{}", index, trials);
                status = RunStatus::Cancelled;
                break;
            }

            match self.run_trial(index, &mut buffer).await {
                TrialOutcome::Completed(trial) => {
                    let throughput = trial.throughput_mbps();
                    let running_max = collector.record_trial(&trial);

                    debug!(
                        "Trial {}/{}: {} bytes, latency {:?}, transfer {:?}, {:.2} Mbps",
                        index,
                        trials,
                        trial.bytes,
                        trial.latency(),
                        trial.transfer_time(),
                        throughput
                    );

                    self.notify(ProgressEvent {
                        trial: index,
                        trials,
                        throughput_mbps: throughput,
                        running_max_mbps: running_max,
                        latency: trial.latency(),
                        bytes: trial.bytes,
                    });
                }
                TrialOutcome::Failed(e) => {
                    warn!("Trial {}/{} failed: {}", index, trials, e);
                    collector.record_failure();
                }
                TrialOutcome::Cancelled => {
                    info!("Run cancelled during trial {}/{}", index, trials);
                    status = RunStatus::Cancelled;
                    break;
                }
            }
        }

        let result = collector.get();

        if status == RunStatus::Completed && result.completed_trials == 0 {
            error!("All {} trials failed", result.failed_trials);
            return Err(Error::AllTrialsFailed {
                failed: result.failed_trials,
            });
        }

        info!(
            "Run {:?}: {}/{} trials completed, max {:.2} Mbps, mean latency {:?}",
            status, result.completed_trials, trials, result.max_throughput_mbps, result.mean_latency
        );

        Ok(RunOutcome { status, result })
    }

    /// Moves the prober onto a background tokio task.
    pub fn spawn(self) -> ProbeHandle {
        let cancellation_token = self.cancellation_token.clone();
        let handle = tokio::spawn(async move { self.run().await });

        ProbeHandle {
            handle,
            cancellation_token,
        }
    }

    async fn run_trial(&self, index: usize, buffer: &mut [u8]) -> TrialOutcome {
        let limit = self.config.trial_timeout;

        tokio::select! {
            biased;
            _ = self.cancellation_token.cancelled() => TrialOutcome::Cancelled,
            result = time::timeout(limit, self.fetch(index, buffer)) => match result {
                Ok(Ok(trial)) => TrialOutcome::Completed(trial),
                Ok(Err(e)) => TrialOutcome::Failed(e),
                Err(_) => TrialOutcome::Failed(TrialError::Timeout(limit)),
            },
        }
    }

    async fn fetch(&self, index: usize, buffer: &mut [u8]) -> std::result::Result<Trial, TrialError> {
        let started = Instant::now();
        let mut body = self.transport.open(&self.url).await?;
        let headers_at = Instant::now();

        let mut bytes = 0u64;
        loop {
            let n = body.read(buffer).await?;
            if n == 0 {
                break;
            }
            bytes += n as u64;
        }

        Ok(Trial {
            index,
            started,
            headers_at,
            finished: Instant::now(),
            bytes,
        })
    }
}

/// Handle to a prober running on a background task.
pub struct ProbeHandle {
    handle: JoinHandle<Result<RunOutcome>>,
    cancellation_token: CancellationToken,
}

impl ProbeHandle {
    /// Requests cancellation; [`join`](Self::join) then yields a cancelled outcome.
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the run to end.
    pub async fn join(self) -> Result<RunOutcome> {
        self.handle.await?
    }
}
