use std::time::Duration;
use thiserror::Error;

/// Errors that end a run.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("All {failed} trials failed")]
    AllTrialsFailed { failed: usize },
}

/// Errors local to a single trial.
///
/// The prober absorbs these: a failed trial is counted and logged, and the
/// run moves on to the next one.
#[derive(Error, Debug)]
pub enum TrialError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("trial timed out after {0:?}")]
    Timeout(Duration),

    #[error("body read failed: {0}")]
    Body(String),
}

pub type Result<T> = std::result::Result<T, Error>;
