//! # LogWriter: events as `tracing` records
//!
//! Renders every [`Event`] as a structured `tracing` record under the `leasevisor` target.
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see the output.
//!
//! ## Levels
//! - `info`: leadership and service transitions
//! - `warn`: store unavailability, spawn failures, probe failures, lease loss
//! - `debug`: routine follower traffic (attempts, contention, backoff)

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let node = e.node.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        let lease = e.lease.map(|l| l.get());
        let source = e.source.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::ElectionAttempt => {
                tracing::debug!(target: "leasevisor", node, attempt = e.attempt, "election attempt");
            }
            EventKind::ElectionContended => {
                tracing::debug!(target: "leasevisor", node, attempt = e.attempt, "lock held elsewhere");
            }
            EventKind::ElectionBackoff => {
                tracing::debug!(target: "leasevisor", node, delay_ms = e.delay_ms, "election retry scheduled");
            }
            EventKind::StoreUnavailable => {
                tracing::warn!(target: "leasevisor", node, attempt = e.attempt, reason, "consensus store unavailable");
            }
            EventKind::ElectionWon => {
                tracing::info!(target: "leasevisor", node, lease, "became leader");
            }
            EventKind::LeadershipLost => {
                tracing::warn!(target: "leasevisor", node, lease, reason, "leadership lost");
            }
            EventKind::SteppedDown => {
                tracing::info!(target: "leasevisor", node, lease, "stepped down to follower");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(target: "leasevisor", node, "shutdown requested");
            }
            EventKind::ServiceStarting => {
                tracing::info!(target: "leasevisor", node, service = source, attempt = e.attempt, "starting service");
            }
            EventKind::ServiceRunning => {
                tracing::info!(target: "leasevisor", node, service = source, pid = e.pid, "service running");
            }
            EventKind::ServiceSpawnFailed => {
                tracing::warn!(target: "leasevisor", node, service = source, attempt = e.attempt, reason, "service spawn failed");
            }
            EventKind::ServiceExited => {
                tracing::warn!(target: "leasevisor", node, service = source, pid = e.pid, exit_code = e.exit_code, reason, "service exited");
            }
            EventKind::ProbeFailed => {
                tracing::warn!(target: "leasevisor", node, probe = source, failures = e.failures, reason, "health probe failed");
            }
            EventKind::ProbeRecovered => {
                tracing::info!(target: "leasevisor", node, probe = source, cleared = e.failures, "health probe recovered");
            }
            EventKind::ProbeThresholdReached => {
                tracing::warn!(target: "leasevisor", node, probe = source, failures = e.failures, "health failure threshold reached");
            }
            EventKind::ServiceRestarting => {
                let cause = e.restart_cause.map(|c| c.as_label()).unwrap_or("");
                tracing::info!(target: "leasevisor", node, service = source, cause, delay_ms = e.delay_ms, "restarting service");
            }
            EventKind::ServiceStopped => {
                tracing::info!(target: "leasevisor", node, service = source, pid = e.pid, "service stopped");
            }
            EventKind::ServiceDetached => {
                tracing::warn!(target: "leasevisor", node, service = source, pid = e.pid, "service left running after step-down");
            }
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked => {
                tracing::warn!(target: "leasevisor", kind = ?e.kind, reason, "subscriber problem");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
