use crate::{Error, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Resource downloaded when no URL is given.
pub const DEFAULT_URL: &str =
    "https://www.dundeecity.gov.uk/sites/default/files/publications/civic_renewal_forms.zip";

/// Number of sequential download trials in a run.
pub const DEFAULT_TRIALS: usize = 20;

/// Size of the reusable read buffer (128 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Throughput (Mbit/s) at or below which the live ping reading is "no data".
pub const DEFAULT_PING_THRESHOLD: f64 = 0.2;

/// Configuration for a measurement run.
///
/// Holds everything the prober needs to know before the first trial starts.
/// The prober takes the configuration by value, so it cannot change while a
/// run is in progress.
///
/// # Examples
///
/// ```
/// use speedprobe::Config;
/// use std::time::Duration;
///
/// let config = Config::new("http://127.0.0.1:8080/file.bin")
///     .with_trials(5)
///     .with_buffer_size(64 * 1024)
///     .with_trial_timeout(Duration::from_secs(30));
///
/// assert_eq!(config.trials, 5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Resource to download on every trial
    pub url: String,

    /// Number of trials, fixed for the whole run
    pub trials: usize,

    /// Read buffer size in bytes
    pub buffer_size: usize,

    /// Live ping is reported only above this throughput (Mbit/s)
    pub ping_threshold: f64,

    /// Bound on establishing the TCP/TLS connection
    pub connect_timeout: Duration,

    /// Bound on one trial, from request start to end of body
    pub trial_timeout: Duration,

    /// User-Agent header sent with each request
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            trials: DEFAULT_TRIALS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            ping_threshold: DEFAULT_PING_THRESHOLD,
            connect_timeout: Duration::from_secs(10),
            trial_timeout: Duration::from_secs(60),
            user_agent: format!("speedprobe/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    /// Creates a configuration for the given URL with default values.
    ///
    /// # Examples
    ///
    /// ```
    /// use speedprobe::Config;
    ///
    /// let config = Config::new("https://example.com/10MB.bin");
    /// assert_eq!(config.trials, 20);
    /// assert_eq!(config.buffer_size, 128 * 1024);
    /// ```
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Sets the number of trials.
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    /// Sets the read buffer size.
    ///
    /// # Arguments
    ///
    /// * `size` - Buffer size in bytes (default: 128 KiB)
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Sets the live ping threshold in Mbit/s.
    pub fn with_ping_threshold(mut self, threshold: f64) -> Self {
        self.ping_threshold = threshold;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-trial timeout.
    ///
    /// A trial that has not finished downloading within this bound counts as
    /// failed; the run continues with the next trial.
    pub fn with_trial_timeout(mut self, timeout: Duration) -> Self {
        self.trial_timeout = timeout;
        self
    }

    /// Sets the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Checks the configuration without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the trial count or buffer size is zero,
    /// a timeout is zero, or the URL is not an absolute `http`/`https` URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use speedprobe::Config;
    ///
    /// assert!(Config::new("ftp://example.com/file").validate().is_err());
    /// assert!(Config::new("https://example.com/file").with_trials(0).validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        self.parse_url()?;

        if self.trials == 0 {
            return Err(Error::Config("At least one trial is required".to_string()));
        }
        if self.buffer_size == 0 {
            return Err(Error::Config("Buffer size must be non-zero".to_string()));
        }
        if self.connect_timeout.is_zero() || self.trial_timeout.is_zero() {
            return Err(Error::Config("Timeouts must be non-zero".to_string()));
        }
        if !self.ping_threshold.is_finite() || self.ping_threshold < 0.0 {
            return Err(Error::Config(format!(
                "Invalid ping threshold: {}",
                self.ping_threshold
            )));
        }

        Ok(())
    }

    pub(crate) fn parse_url(&self) -> Result<Url> {
        let url = Url::parse(&self.url)
            .map_err(|e| Error::Config(format!("Malformed URL '{}': {}", self.url, e)))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::Config(format!(
                    "Unsupported URL scheme '{}', expected http or https",
                    other
                )))
            }
        }
        if url.host_str().is_none() {
            return Err(Error::Config(format!("URL '{}' has no host", self.url)));
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.trials, 20);
        assert_eq!(config.buffer_size, 131072);
        assert_eq!(config.ping_threshold, 0.2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = Config::new("http://localhost/x")
            .with_trials(3)
            .with_buffer_size(1024)
            .with_ping_threshold(0.5)
            .with_connect_timeout(Duration::from_secs(1))
            .with_trial_timeout(Duration::from_secs(2))
            .with_user_agent("test-agent");

        assert_eq!(config.trials, 3);
        assert_eq!(config.buffer_size, 1024);
        assert_eq!(config.ping_threshold, 0.5);
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.trial_timeout, Duration::from_secs(2));
        assert_eq!(config.user_agent, "test-agent");
    }

    #[test]
    fn test_rejects_zero_trials() {
        let err = Config::new("http://localhost/x")
            .with_trials(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_url() {
        for url in ["", "not a url", "localhost/file", "file:///etc/passwd"] {
            let err = Config::new(url).validate().unwrap_err();
            assert!(matches!(err, Error::Config(_)), "accepted {:?}", url);
        }
    }

    #[test]
    fn test_rejects_zero_buffer_and_timeouts() {
        let base = Config::new("http://localhost/x");
        assert!(base.clone().with_buffer_size(0).validate().is_err());
        assert!(base
            .clone()
            .with_trial_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(base.with_ping_threshold(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_json_roundtrip_keeps_fields() {
        let config = Config::new("https://example.com/f").with_trials(7);
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.url, "https://example.com/f");
        assert_eq!(back.trials, 7);
    }
}
