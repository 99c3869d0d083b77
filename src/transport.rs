//! HTTP transport used by the prober.
//!
//! The prober only needs two things from the network: a way to issue a GET
//! and wait for the response headers, and a way to pull the body into a
//! caller-owned buffer. [`Transport`] and [`BodyReader`] capture exactly that,
//! with [`HttpTransport`] as the reqwest-backed implementation.

use crate::config::Config;
use crate::error::TrialError;
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use reqwest::Url;

/// Opens download requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a GET for `url` and resolves once the response headers are in.
    ///
    /// A response with a non-success status is an error.
    async fn open(&self, url: &Url) -> std::result::Result<Box<dyn BodyReader>, TrialError>;
}

/// Streams a response body.
#[async_trait]
pub trait BodyReader: Send {
    /// Copies the next part of the body into `buf`.
    ///
    /// Returns the number of bytes written, `0` at end of body.
    async fn read(&mut self, buf: &mut [u8]) -> std::result::Result<usize, TrialError>;
}

/// reqwest-backed [`Transport`].
///
/// Idle connections are not pooled, so every trial pays for its own
/// connection setup and the latency samples stay comparable.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, url: &Url) -> std::result::Result<Box<dyn BodyReader>, TrialError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| TrialError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrialError::Status(status.as_u16()));
        }

        debug!(
            "GET {} -> {} (content length {:?})",
            url,
            status,
            response.content_length()
        );

        Ok(Box::new(HttpBody {
            response,
            pending: Bytes::new(),
        }))
    }
}

/// Adapts reqwest's chunk stream to fixed-size buffer reads.
struct HttpBody {
    response: reqwest::Response,
    pending: Bytes,
}

#[async_trait]
impl BodyReader for HttpBody {
    async fn read(&mut self, buf: &mut [u8]) -> std::result::Result<usize, TrialError> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.pending.is_empty() {
            match self
                .response
                .chunk()
                .await
                .map_err(|e| TrialError::Body(e.to_string()))?
            {
                Some(chunk) => self.pending = chunk,
                None => return Ok(0),
            }
        }

        let n = buf.len().min(self.pending.len());
        let head = self.pending.split_to(n);
        buf[..n].copy_from_slice(&head);
        Ok(n)
    }
}
