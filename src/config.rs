//! # Node configuration.
//!
//! Provides [`Config`] centralized settings for one [`SupervisorNode`](crate::SupervisorNode).
//!
//! ## Recognized options
//! | Field               | Default              | Meaning                                            |
//! |---------------------|----------------------|----------------------------------------------------|
//! | `lease_ttl`         | 5s                   | TTL requested for the leader lease                 |
//! | `election_retry`    | 2s                   | base delay between contended election attempts     |
//! | `election_jitter`   | 1s                   | random `[0, jitter)` added to every election retry |
//! | `unavailable_max`   | 30s                  | cap for retries while the store is unreachable     |
//! | `probe_interval`    | 10s                  | time between health probes                         |
//! | `probe_timeout`     | 5s                   | per-probe timeout (must be `< probe_interval`)     |
//! | `failure_threshold` | 3                    | consecutive probe failures that force a restart    |
//! | `restart_backoff`   | 2s                   | wait between killing and respawning the service    |
//! | `command` / `args`  | empty                | managed process (unless a custom service is given) |
//! | `step_down`         | `KillService`        | fate of the process on lease loss                  |
//! | `lock_key`          | `/leasevisor/leader` | well-known key contended by all peers              |
//! | `node_id`           | host name            | identity written into the lock record              |
//! | `bus_capacity`      | 1024                 | event bus ring buffer size                         |

use std::time::Duration;

use crate::{
    error::ConfigError,
    policies::{BackoffPolicy, JitterPolicy, StepDownPolicy},
};

/// Configuration for a supervisor node.
///
/// All fields are public; call [`Config::validate`] (done by the node builder) before use.
#[derive(Clone, Debug)]
pub struct Config {
    /// Identity of this node, stored in the lock record and attached to every event.
    pub node_id: String,
    /// Key contended by all peers. Whoever creates it is the leader.
    pub lock_key: String,

    /// TTL of the leader lease. Bounds how long a dead leader can be mistaken for alive.
    pub lease_ttl: Duration,
    /// Base delay between election attempts while another node holds the lock.
    pub election_retry: Duration,
    /// Upper bound (exclusive) of the random delay added to each election retry.
    pub election_jitter: Duration,
    /// Cap for the growing retry delay while the store is unavailable.
    pub unavailable_max: Duration,

    /// Time between health probes.
    pub probe_interval: Duration,
    /// Timeout applied to each health probe.
    pub probe_timeout: Duration,
    /// Consecutive probe failures that trigger a restart.
    pub failure_threshold: u32,
    /// Fixed delay between killing the process and spawning it again.
    pub restart_backoff: Duration,

    /// Program to supervise when no custom [`Service`](crate::Service) is supplied.
    pub command: String,
    /// Arguments passed to `command`.
    pub args: Vec<String>,

    /// What to do with the running process when the lease is lost.
    pub step_down: StepDownPolicy,

    /// Capacity of the event bus broadcast channel (min 1).
    pub bus_capacity: usize,
}

impl Config {
    /// Checks the invariants the runtime relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lease_ttl.is_zero() {
            return Err(ConfigError::ZeroLeaseTtl);
        }
        if self.lock_key.is_empty() {
            return Err(ConfigError::EmptyLockKey);
        }
        if self.failure_threshold == 0 {
            return Err(ConfigError::ZeroFailureThreshold);
        }
        if self.probe_timeout >= self.probe_interval {
            return Err(ConfigError::ProbeTimeoutTooLong {
                timeout: self.probe_timeout,
                interval: self.probe_interval,
            });
        }
        Ok(())
    }

    /// Retry policy used after losing an election to another node.
    #[inline]
    pub fn election_backoff(&self) -> BackoffPolicy {
        BackoffPolicy::constant(self.election_retry)
            .with_jitter(JitterPolicy::Bounded(self.election_jitter))
    }

    /// Retry policy used while the store is unreachable.
    ///
    /// Starts at the contention delay and doubles per consecutive failure,
    /// so it is never shorter than [`election_backoff`](Self::election_backoff).
    #[inline]
    pub fn unavailable_backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            first: self.election_retry,
            max: self.unavailable_max.max(self.election_retry),
            factor: 2.0,
            jitter: JitterPolicy::Bounded(self.election_jitter),
        }
    }

    /// Delay policy between service restarts.
    #[inline]
    pub fn restart_policy(&self) -> BackoffPolicy {
        BackoffPolicy::constant(self.restart_backoff)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            lock_key: "/leasevisor/leader".to_string(),
            lease_ttl: Duration::from_secs(5),
            election_retry: Duration::from_secs(2),
            election_jitter: Duration::from_secs(1),
            unavailable_max: Duration::from_secs(30),
            probe_interval: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
            failure_threshold: 3,
            restart_backoff: Duration::from_secs(2),
            command: String::new(),
            args: Vec::new(),
            step_down: StepDownPolicy::default(),
            bus_capacity: 1024,
        }
    }
}

/// Host name of the machine; the lock record appends the pid itself.
fn default_node_id() -> String {
    host_name(
        std::env::var("HOSTNAME").ok(),
        std::fs::read_to_string("/etc/hostname").ok(),
    )
}

/// First non-blank candidate, `$HOSTNAME` before `/etc/hostname`.
fn host_name(env: Option<String>, file: Option<String>) -> String {
    [env, file]
        .into_iter()
        .flatten()
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(Config::default().validate(), Ok(()));
    }

    #[test]
    fn probe_timeout_must_be_shorter_than_interval() {
        let cfg = Config {
            probe_timeout: Duration::from_secs(10),
            ..Config::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ProbeTimeoutTooLong { .. })
        ));
    }

    #[test]
    fn zero_threshold_and_ttl_are_rejected() {
        let cfg = Config {
            failure_threshold: 0,
            ..Config::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroFailureThreshold));

        let cfg = Config {
            lease_ttl: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroLeaseTtl));
    }

    #[test]
    fn node_id_is_the_bare_host_name() {
        assert_eq!(host_name(Some("db-1".into()), Some("other\n".into())), "db-1");
        assert_eq!(host_name(None, Some("db-2\n".into())), "db-2");
        assert_eq!(host_name(Some("  ".into()), None), "localhost");
        assert_eq!(host_name(None, None), "localhost");

        let id = default_node_id();
        assert!(!id.is_empty());
        assert!(!id.ends_with(&format!("-{}", std::process::id())));
    }

    #[test]
    fn unavailable_backoff_is_never_shorter_than_contention_backoff() {
        let cfg = Config {
            election_jitter: Duration::ZERO,
            ..Config::default()
        };
        let contended = cfg.election_backoff();
        let unavailable = cfg.unavailable_backoff();
        for attempt in 0..20 {
            assert!(unavailable.next(attempt) >= contended.next(attempt));
        }
        assert_eq!(unavailable.next(20), Duration::from_secs(30));
    }
}
