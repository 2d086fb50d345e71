//! HTTP GET probe.

use super::HealthChecker;
use crate::error::ProbeError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Per-request timeout of an HTTP probe
pub const HTTP_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Healthy iff a GET to `url` answers with a 2xx status
#[derive(Debug, Clone)]
pub struct HttpHealthCheck {
    url: String,
    timeout: Duration,
}

impl HttpHealthCheck {
    /// Probe `url` with the default request timeout
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: HTTP_PROBE_TIMEOUT,
        }
    }

    /// Override the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl HealthChecker for HttpHealthCheck {
    async fn check(&self) -> Result<(), ProbeError> {
        let url = self.url.clone();
        let timeout = self.timeout;

        // reqwest's blocking client owns its own reactor; keep it off the async executor.
        smol::unblock(move || {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| ProbeError::Transport(e.to_string()))?;

            let response = client
                .get(&url)
                .send()
                .map_err(|e| ProbeError::Transport(e.to_string()))?;

            let status = response.status();
            debug!("GET {} -> {}", url, status);

            if status.is_success() {
                Ok(())
            } else {
                Err(ProbeError::UnhealthyStatus(status.as_u16()))
            }
        })
        .await
    }

    fn describe(&self) -> String {
        format!("GET {}", self.url)
    }
}
