//! # Health probe loop.
//!
//! [`HealthMonitor::run`] probes the service on a fixed interval and returns once
//! `failure_threshold` consecutive probes have failed. It never touches the process;
//! killing is the service supervisor's job.
//!
//! ```text
//! every probe_interval:
//!   probe.check(timeout) bounded by tokio::time::timeout(timeout)
//!     ├─ Ok  ──► failures = 0            (ProbeRecovered if it was > 0)
//!     └─ Err ──► failures += 1           (ProbeFailed)
//!                └─ failures >= threshold ──► ProbeThresholdReached, return
//! ```
//!
//! The first probe runs one interval after the monitor starts, giving the freshly
//! spawned process time to come up.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};

use crate::{
    config::Config,
    error::ProbeError,
    events::{Bus, Event, EventKind},
    probes::ProbeRef,
};

/// Consecutive probe failures of the current process.
///
/// Local, ephemeral leader-side state: a new value starts at zero for every spawn.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HealthStatus {
    consecutive_failures: u32,
}

impl HealthStatus {
    /// Current number of consecutive failures.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Resets the counter; returns how many failures were cleared.
    pub fn record_success(&mut self) -> u32 {
        std::mem::take(&mut self.consecutive_failures)
    }

    /// Increments the counter; returns the new value.
    pub fn record_failure(&mut self) -> u32 {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_failures
    }

    /// Whether the counter has reached `threshold`.
    pub fn reached(&self, threshold: u32) -> bool {
        self.consecutive_failures >= threshold
    }
}

/// Returned by [`HealthMonitor::run`] when the threshold is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdReached {
    /// Consecutive failures observed.
    pub failures: u32,
}

/// Periodically probes the managed service.
pub struct HealthMonitor {
    probe: ProbeRef,
    name: Arc<str>,
    interval: Duration,
    timeout: Duration,
    threshold: u32,
    bus: Bus,
    node: Arc<str>,
}

impl HealthMonitor {
    /// Creates a monitor using the probe settings from `cfg`.
    pub fn new(probe: ProbeRef, cfg: &Config, bus: Bus, node: Arc<str>) -> Self {
        Self {
            name: Arc::from(probe.name()),
            probe,
            interval: cfg.probe_interval,
            timeout: cfg.probe_timeout,
            threshold: cfg.failure_threshold.max(1),
            bus,
            node,
        }
    }

    /// Probes until `threshold` consecutive failures, then returns.
    ///
    /// Cancel by dropping the future.
    pub async fn run(&self) -> ThresholdReached {
        let mut status = HealthStatus::default();
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.probe_once().await {
                Ok(()) => {
                    let cleared = status.record_success();
                    if cleared > 0 {
                        self.publish(Event::new(EventKind::ProbeRecovered).with_failures(cleared));
                    }
                }
                Err(e) => {
                    let failures = status.record_failure();
                    self.publish(
                        Event::new(EventKind::ProbeFailed)
                            .with_failures(failures)
                            .with_reason(e.to_string()),
                    );
                    if status.reached(self.threshold) {
                        self.publish(
                            Event::new(EventKind::ProbeThresholdReached).with_failures(failures),
                        );
                        return ThresholdReached { failures };
                    }
                }
            }
        }
    }

    /// Runs one probe; a probe that overruns its timeout counts as failed.
    async fn probe_once(&self) -> Result<(), ProbeError> {
        match time::timeout(self.timeout, self.probe.check(self.timeout)).await {
            Ok(res) => res,
            Err(_elapsed) => Err(ProbeError::Timeout {
                timeout: self.timeout,
            }),
        }
    }

    fn publish(&self, ev: Event) {
        self.bus.publish(
            ev.with_node(Arc::clone(&self.node))
                .with_source(Arc::clone(&self.name)),
        );
    }
}
