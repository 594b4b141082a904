//! HTTP client abstraction for testability.
//!
//! Fetching and the remote API go through [`HttpClient`] so tests can
//! script mirror behavior without a network.

use std::time::Duration;

use crate::error::HttpError;

/// Blocking HTTP GET.
pub trait HttpClient {
    /// Performs a GET request and returns the body of a 2xx response.
    ///
    /// 404 is reported as [`HttpError::NotFound`]; any other non-2xx status
    /// as [`HttpError::Status`]; transport failures and timeouts as
    /// [`HttpError::Transport`].
    fn get(&self, url: &str) -> Result<Vec<u8>, HttpError>;
}

/// Real HTTP client implementation using reqwest's blocking API.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl ReqwestClient {
    /// Creates a client whose requests time out after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hitokoto-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                HttpError::Transport(format!("timed out after {}s", self.timeout.as_secs()))
            } else {
                HttpError::Transport(format!("request failed: {}", e))
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(HttpError::NotFound);
        }
        if !status.is_success() {
            return Err(HttpError::Status(status.as_u16()));
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| HttpError::Transport(format!("failed to read response: {}", e)))
    }
}
