//! Error types used by the leasevisor runtime.
//!
//! Each enum maps to one class of failure the node reacts to differently:
//!
//! - [`StoreError`]: the consensus store could not be reached or rejected a lease operation.
//!   Transient; retried with backoff at every call site.
//! - [`ElectionError`]: the outcome of a failed leadership attempt (contention vs. unavailability).
//! - [`LeaseLoss`]: why a held lease stopped being renewed.
//! - [`ProcessError`]: spawning, waiting on or killing the managed process failed.
//! - [`ProbeError`]: a single health probe reported the service as unhealthy.
//! - [`ConfigError`]: the node configuration is unusable.
//! - [`RuntimeError`]: errors returned by [`SupervisorNode::run`](crate::SupervisorNode::run).
//!
//! All of them provide `as_label` (stable snake_case string for logs/metrics).

use std::time::Duration;

use thiserror::Error;

use crate::store::LeaseId;

/// # Errors produced by a [`ConsensusClient`](crate::ConsensusClient).
///
/// Callers must not assume any state change occurred when an operation fails.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store is unreachable (connection refused, partition, timeout).
    #[error("consensus store unavailable: {reason}")]
    Unavailable {
        /// Transport-level detail.
        reason: String,
    },

    /// The lease does not exist (already expired or revoked).
    #[error("lease {lease} not found")]
    LeaseNotFound {
        /// The lease that was referenced.
        lease: LeaseId,
    },
}

impl StoreError {
    /// Shorthand for [`StoreError::Unavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        StoreError::Unavailable {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use leasevisor::StoreError;
    ///
    /// let err = StoreError::unavailable("connection refused");
    /// assert_eq!(err.as_label(), "store_unavailable");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::Unavailable { .. } => "store_unavailable",
            StoreError::LeaseNotFound { .. } => "store_lease_not_found",
        }
    }

    /// Returns `true` for transport failures that should be retried with backoff.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }
}

/// # Why a leadership attempt did not produce a lease.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElectionError {
    /// Another node holds the lock. Expected steady state for followers.
    #[error("lock is held by another node")]
    NotLeader,

    /// The store could not arbitrate (usually unavailable); nothing can be concluded about contention.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ElectionError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ElectionError::NotLeader => "election_contended",
            ElectionError::Store(_) => "election_store_unavailable",
        }
    }
}

/// # Why the leader lease can no longer be considered held.
///
/// Fatal to the current leadership term; a fresh election is required.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LeaseLoss {
    /// The renewal stream ended (lease revoked or expired).
    #[error("lease renewal stream ended")]
    StreamEnded,

    /// The renewal stream reported an error (connection dropped, lease gone).
    #[error("lease renewal failed: {0}")]
    StreamFailed(#[source] StoreError),

    /// The store acknowledged a renewal with a zero TTL, meaning the lease is gone.
    #[error("lease expired")]
    Expired,
}

impl LeaseLoss {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LeaseLoss::StreamEnded => "lease_stream_ended",
            LeaseLoss::StreamFailed(_) => "lease_stream_failed",
            LeaseLoss::Expired => "lease_expired",
        }
    }
}

/// # Errors produced while managing the supervised process.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The process could not be created.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        /// Program that was launched.
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the process exit status failed.
    #[error("failed to wait for process: {0}")]
    Wait(#[source] std::io::Error),

    /// Sending the kill signal failed for a reason other than "already exited".
    #[error("failed to kill process: {0}")]
    Kill(#[source] std::io::Error),
}

impl ProcessError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcessError::Spawn { .. } => "process_spawn_failed",
            ProcessError::Wait(_) => "process_wait_failed",
            ProcessError::Kill(_) => "process_kill_failed",
        }
    }
}

/// # A failed health check.
///
/// Soft failure: only actionable once the consecutive-failure threshold is reached.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The probe ran and the service answered "unhealthy".
    #[error("unhealthy: {reason}")]
    Unhealthy {
        /// What the probe observed.
        reason: String,
    },

    /// The probe did not answer within its timeout.
    #[error("probe timed out after {timeout:?}")]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The probe could not reach the service at all.
    #[error("probe transport error: {reason}")]
    Transport {
        /// Underlying error message.
        reason: String,
    },
}

impl ProbeError {
    /// Shorthand for [`ProbeError::Unhealthy`].
    pub fn unhealthy(reason: impl Into<String>) -> Self {
        ProbeError::Unhealthy {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use leasevisor::ProbeError;
    /// use std::time::Duration;
    ///
    /// let err = ProbeError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "probe_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ProbeError::Unhealthy { .. } => "probe_unhealthy",
            ProbeError::Timeout { .. } => "probe_timeout",
            ProbeError::Transport { .. } => "probe_transport",
        }
    }
}

/// # Invalid node configuration.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Lease TTL must be non-zero.
    #[error("lease ttl must be greater than zero")]
    ZeroLeaseTtl,

    /// The probe timeout must be shorter than the probe interval.
    #[error("probe timeout {timeout:?} must be shorter than probe interval {interval:?}")]
    ProbeTimeoutTooLong {
        /// Configured probe timeout.
        timeout: Duration,
        /// Configured probe interval.
        interval: Duration,
    },

    /// The consecutive-failure threshold must be at least 1.
    #[error("failure threshold must be at least 1")]
    ZeroFailureThreshold,

    /// No service was supplied and `command` is empty.
    #[error("no managed command configured")]
    MissingCommand,

    /// The lock key is empty.
    #[error("lock key must not be empty")]
    EmptyLockKey,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::ZeroLeaseTtl => "config_zero_lease_ttl",
            ConfigError::ProbeTimeoutTooLong { .. } => "config_probe_timeout_too_long",
            ConfigError::ZeroFailureThreshold => "config_zero_failure_threshold",
            ConfigError::MissingCommand => "config_missing_command",
            ConfigError::EmptyLockKey => "config_empty_lock_key",
        }
    }
}

/// # Errors returned by the node runtime itself.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The node could not be built from its configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// OS signal listeners could not be registered.
    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Config(e) => e.as_label(),
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}
