//! # HTTP probe.
//!
//! `GET <url>`; any `2xx` within the timeout is healthy. Non-2xx statuses, connection
//! errors and timeouts are failures.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProbeError;
use crate::probes::probe::HealthProbe;

/// Probes a service over HTTP.
pub struct HttpProbe {
    url: String,
    client: reqwest::Client,
}

impl HttpProbe {
    /// Creates a probe for `url`.
    pub fn new(url: impl Into<String>) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProbeError::Transport {
                reason: e.to_string(),
            })?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    /// Probed URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    fn name(&self) -> &str {
        "http"
    }

    async fn check(&self, timeout: Duration) -> Result<(), ProbeError> {
        let resp = self
            .client
            .get(&self.url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProbeError::Timeout { timeout }
                } else {
                    ProbeError::Transport {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ProbeError::unhealthy(format!("status {status}")))
        }
    }
}
