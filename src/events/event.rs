//! # Runtime events emitted by a supervisor node.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Election events**: attempts, wins, contention, store unavailability, backoff
//! - **Leadership events**: lease loss, step-down, shutdown
//! - **Service events**: process lifecycle, probe results, restarts
//! - **Subscriber events**: overflow and panics inside subscriber workers
//!
//! The [`Event`] struct carries additional metadata such as the node id, the service or
//! probe that produced it, lease, process id, exit code and delays.
//!
//! ## Ordering guarantees
//! Each event has a process-wide unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use leasevisor::{Event, EventKind, RestartCause};
//!
//! let ev = Event::new(EventKind::ServiceRestarting)
//!     .with_node("node-a")
//!     .with_restart_cause(RestartCause::ProbeThreshold)
//!     .with_delay(Duration::from_secs(2));
//!
//! assert_eq!(ev.kind, EventKind::ServiceRestarting);
//! assert_eq!(ev.node.as_deref(), Some("node-a"));
//! assert_eq!(ev.delay_ms, Some(2000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::store::LeaseId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: `subscriber=<name> info=<panic message>`
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: `subscriber=<name> reason=<full|closed>`
    SubscriberOverflow,

    // === Election events ===
    /// Follower is about to contend for the lock.
    ///
    /// Sets:
    /// - `attempt`: election attempt number (1-based, per node)
    ElectionAttempt,

    /// Lock acquired; node becomes leader.
    ///
    /// Sets:
    /// - `lease`: lease bound to the lock record
    /// - `attempt`: winning attempt number
    ElectionWon,

    /// Another node holds the lock (steady follower state, not an error).
    ///
    /// Sets:
    /// - `attempt`: attempt number
    ElectionContended,

    /// The consensus store could not be reached during an election attempt.
    ///
    /// Sets:
    /// - `attempt`: attempt number
    /// - `reason`: store error
    StoreUnavailable,

    /// Next election attempt scheduled.
    ///
    /// Sets:
    /// - `delay_ms`: delay before the next attempt
    /// - `attempt`: previous attempt number
    ElectionBackoff,

    // === Leadership events ===
    /// The lease renewal stream ended or failed: leadership is gone.
    ///
    /// Sets:
    /// - `lease`: the lost lease
    /// - `reason`: why renewal stopped
    LeadershipLost,

    /// Node finished tearing down its leader state and is a follower again.
    ///
    /// Sets:
    /// - `lease`: lease that was held
    SteppedDown,

    /// Shutdown requested (explicit cancellation or OS signal).
    ShutdownRequested,

    // === Service events ===
    /// Spawning the managed process.
    ///
    /// Sets:
    /// - `source`: service name
    /// - `attempt`: spawn attempt in the current leadership term (1-based)
    ServiceStarting,

    /// Process spawned and is being monitored.
    ///
    /// Sets:
    /// - `source`: service name
    /// - `pid`: OS process id (when known)
    /// - `attempt`: spawn attempt
    ServiceRunning,

    /// Process creation failed.
    ///
    /// Sets:
    /// - `source`: service name
    /// - `attempt`: spawn attempt
    /// - `reason`: spawn error
    ServiceSpawnFailed,

    /// Process exited on its own (any code or signal).
    ///
    /// Sets:
    /// - `source`: service name
    /// - `pid`: OS process id (when known)
    /// - `exit_code`: exit code, if the process exited normally
    /// - `reason`: rendered exit status
    ServiceExited,

    /// Health probe failed.
    ///
    /// Sets:
    /// - `source`: probe name
    /// - `failures`: consecutive failures including this one
    /// - `reason`: probe error
    ProbeFailed,

    /// Health probe succeeded after one or more failures; counter reset.
    ///
    /// Sets:
    /// - `source`: probe name
    /// - `failures`: failures that were cleared
    ProbeRecovered,

    /// Consecutive failures reached the configured threshold.
    ///
    /// Sets:
    /// - `source`: probe name
    /// - `failures`: consecutive failures
    ProbeThresholdReached,

    /// Supervisor entered `Restarting`: process killed, respawn scheduled.
    ///
    /// Sets:
    /// - `source`: service name
    /// - `restart_cause`: what triggered the restart
    /// - `delay_ms`: backoff before the next spawn
    /// - `attempt`: spawn attempt that is being replaced
    ServiceRestarting,

    /// Process was killed as part of stopping the supervisor.
    ///
    /// Sets:
    /// - `source`: service name
    /// - `pid`: OS process id (when known)
    ServiceStopped,

    /// Process was left running on step-down ([`StepDownPolicy::LeaveRunning`](crate::StepDownPolicy)).
    ///
    /// Sets:
    /// - `source`: service name
    /// - `pid`: OS process id (when known)
    ServiceDetached,
}

/// What triggered a `ServiceRestarting` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartCause {
    /// The process exited.
    Exited,
    /// Health probes failed `failure_threshold` times in a row.
    ProbeThreshold,
    /// The process could not be spawned.
    SpawnFailed,
}

impl RestartCause {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RestartCause::Exited => "exited",
            RestartCause::ProbeThreshold => "probe_threshold",
            RestartCause::SpawnFailed => "spawn_failed",
        }
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Id of the node that emitted the event.
    pub node: Option<Arc<str>>,
    /// Name of the service or probe the event is about.
    pub source: Option<Arc<str>>,
    /// Lease involved, if any.
    pub lease: Option<LeaseId>,
    /// Attempt counter (election or spawn, depending on kind).
    pub attempt: Option<u32>,
    /// Delay before the next attempt in milliseconds.
    pub delay_ms: Option<u32>,
    /// OS process id of the managed process.
    pub pid: Option<u32>,
    /// Exit code of the managed process.
    pub exit_code: Option<i32>,
    /// Consecutive probe failures.
    pub failures: Option<u32>,
    /// Restart trigger (only for `ServiceRestarting`).
    pub restart_cause: Option<RestartCause>,
    /// Human-readable reason (errors, exit status, overflow details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            node: None,
            source: None,
            lease: None,
            attempt: None,
            delay_ms: None,
            pid: None,
            exit_code: None,
            failures: None,
            restart_cause: None,
            reason: None,
        }
    }

    /// Attaches the emitting node id.
    #[inline]
    pub fn with_node(mut self, node: impl Into<Arc<str>>) -> Self {
        self.node = Some(node.into());
        self
    }

    /// Attaches the service or probe name.
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches a lease id.
    #[inline]
    pub fn with_lease(mut self, lease: LeaseId) -> Self {
        self.lease = Some(lease);
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches the process id, if known.
    #[inline]
    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    /// Attaches the exit code, if any.
    #[inline]
    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    /// Attaches a consecutive-failure count.
    #[inline]
    pub fn with_failures(mut self, n: u32) -> Self {
        self.failures = Some(n);
        self
    }

    /// Attaches a restart trigger.
    #[inline]
    pub fn with_restart_cause(mut self, cause: RestartCause) -> Self {
        self.restart_cause = Some(cause);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }
}
