//! # Consensus store capability.
//!
//! [`ConsensusClient`] is the only seam between a node and the external arbiter
//! (etcd, Consul, ...). The node needs four operations and nothing else:
//!
//! ```text
//! grant_lease(ttl)                    → LeaseId
//! revoke_lease(lease)                 → ()
//! try_create_if_absent(key, v, lease) → Won | Lost       (one atomic transaction:
//!                                                         if key has no version, create it bound to lease)
//! keep_alive(lease)                   → stream of acks   (ends on lease loss or connection failure)
//! ```
//!
//! Every operation may fail with [`StoreError::Unavailable`]; callers must not assume
//! any state change occurred in that case.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::StoreError;

/// Opaque identifier of a time-bounded grant issued by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeaseId(i64);

impl LeaseId {
    /// Wraps a raw store-issued id.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Result of the conditional create transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxnOutcome {
    /// The key was absent and is now bound to our lease.
    Won,
    /// The key already existed; nothing was written.
    Lost,
}

/// One successful renewal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeepAliveAck {
    /// Lease that was renewed.
    pub lease: LeaseId,
    /// TTL granted by this renewal.
    pub ttl: Duration,
}

/// Lazy, unbounded sequence of renewal acknowledgements.
///
/// Ends (or yields an error and ends) once the lease can no longer be renewed.
pub type KeepAliveStream = BoxStream<'static, Result<KeepAliveAck, StoreError>>;

/// Shared handle to a consensus client.
pub type StoreRef = Arc<dyn ConsensusClient>;

/// Lease and transaction primitives of a linearizable key-value store.
#[async_trait]
pub trait ConsensusClient: Send + Sync + 'static {
    /// Requests a new lease that expires after `ttl` unless renewed.
    async fn grant_lease(&self, ttl: Duration) -> Result<LeaseId, StoreError>;

    /// Revokes a lease, deleting every key bound to it.
    async fn revoke_lease(&self, lease: LeaseId) -> Result<(), StoreError>;

    /// Atomically creates `key = value` bound to `lease` iff `key` has no prior version.
    ///
    /// Among any number of concurrent callers, at most one observes [`TxnOutcome::Won`].
    async fn try_create_if_absent(
        &self,
        key: &str,
        value: &str,
        lease: LeaseId,
    ) -> Result<TxnOutcome, StoreError>;

    /// Starts renewing `lease`; renewals happen as the stream is polled.
    fn keep_alive(&self, lease: LeaseId) -> KeepAliveStream;
}
