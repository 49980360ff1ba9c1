//! # Heartbeat-file probe.
//!
//! The managed service periodically writes a Unix timestamp (seconds, fractions allowed)
//! to a file. The probe is healthy iff `now - timestamp < staleness`. A missing or
//! unparsable file is unhealthy.
//!
//! Services written in Rust can use [`HeartbeatFileProbe::beat`] to write the file.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use crate::error::ProbeError;
use crate::probes::probe::HealthProbe;

/// Checks the freshness of a heartbeat file.
pub struct HeartbeatFileProbe {
    path: PathBuf,
    staleness: Duration,
}

impl HeartbeatFileProbe {
    /// Creates a probe reading `path`, tolerating heartbeats up to `staleness` old.
    pub fn new(path: impl Into<PathBuf>, staleness: Duration) -> Self {
        Self {
            path: path.into(),
            staleness,
        }
    }

    /// Writes the current time to `path` in the format this probe reads.
    pub async fn beat(path: impl AsRef<Path>) -> std::io::Result<()> {
        let now = unix_now().as_secs_f64();
        tokio::fs::write(path, format!("{now:.3}\n")).await
    }
}

fn unix_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
}

#[async_trait]
impl HealthProbe for HeartbeatFileProbe {
    fn name(&self) -> &str {
        "heartbeat_file"
    }

    async fn check(&self, _timeout: Duration) -> Result<(), ProbeError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ProbeError::unhealthy(format!("cannot read {}: {e}", self.path.display()))
        })?;
        let stamp: f64 = raw
            .trim()
            .parse()
            .map_err(|_| ProbeError::unhealthy(format!("malformed heartbeat {:?}", raw.trim())))?;

        let age = unix_now().as_secs_f64() - stamp;
        if age < self.staleness.as_secs_f64() {
            Ok(())
        } else {
            Err(ProbeError::unhealthy(format!("heartbeat is {age:.1}s old")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STALE: Duration = Duration::from_secs(30);
    const TIMEOUT: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn fresh_heartbeat_is_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hb");
        HeartbeatFileProbe::beat(&path).await.unwrap();

        let probe = HeartbeatFileProbe::new(&path, STALE);
        assert_eq!(probe.check(TIMEOUT).await, Ok(()));
    }

    #[tokio::test]
    async fn old_heartbeat_is_unhealthy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hb");
        let old = unix_now().as_secs_f64() - 120.0;
        tokio::fs::write(&path, format!("{old}")).await.unwrap();

        let probe = HeartbeatFileProbe::new(&path, STALE);
        let err = probe.check(TIMEOUT).await.unwrap_err();
        assert!(err.to_string().contains("old"));
    }

    #[tokio::test]
    async fn missing_or_garbled_file_is_unhealthy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hb");

        let probe = HeartbeatFileProbe::new(&path, STALE);
        assert!(probe.check(TIMEOUT).await.is_err());

        tokio::fs::write(&path, "yesterday").await.unwrap();
        assert!(probe.check(TIMEOUT).await.is_err());
    }
}
