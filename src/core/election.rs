//! # ElectionCoordinator: one-round leader election.
//!
//! A single attempt is decided by the store in one transaction; there is no candidate
//! phase and no voting.
//!
//! ```text
//! try_become_leader()
//!   grant_lease(ttl) ──► lease
//!   try_create_if_absent(lock_key, record, lease)
//!     ├─ Won  ──► Ok(lease)                        node is leader
//!     ├─ Lost ──► revoke_lease(lease), NotLeader    no lease leaks
//!     └─ Err  ──► revoke_lease(lease), Store(err)   caller backs off, assumes nothing
//! ```
//!
//! A failed revoke is not an error: the lease was never attached to the key
//! and expires on its own after one TTL.

use std::time::Duration;

use crate::{
    config::Config,
    error::ElectionError,
    store::{LeaseId, LockRecord, StoreRef, TxnOutcome},
};

/// Contends for the leader key on behalf of one node.
pub struct ElectionCoordinator {
    store: StoreRef,
    key: String,
    record: String,
    ttl: Duration,
}

impl ElectionCoordinator {
    /// Creates a coordinator writing `record` under `key` with a lease of `ttl`.
    pub fn new(store: StoreRef, key: impl Into<String>, record: &LockRecord, ttl: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            record: record.to_string(),
            ttl,
        }
    }

    /// Coordinator for `cfg.lock_key`, holder `cfg.node_id`, TTL `cfg.lease_ttl`.
    pub fn from_config(store: StoreRef, cfg: &Config) -> Self {
        Self::new(
            store,
            cfg.lock_key.clone(),
            &LockRecord::current(cfg.node_id.clone()),
            cfg.lease_ttl,
        )
    }

    /// The contended key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Store this coordinator talks to.
    pub fn store(&self) -> &StoreRef {
        &self.store
    }

    /// Makes one election attempt.
    ///
    /// # Errors
    /// - [`ElectionError::NotLeader`] another node holds the key.
    /// - [`ElectionError::Store`] the store failed; contention is unknown.
    pub async fn try_become_leader(&self) -> Result<LeaseId, ElectionError> {
        let lease = self.store.grant_lease(self.ttl).await?;

        match self
            .store
            .try_create_if_absent(&self.key, &self.record, lease)
            .await
        {
            Ok(TxnOutcome::Won) => Ok(lease),
            Ok(TxnOutcome::Lost) => {
                self.release(lease).await;
                Err(ElectionError::NotLeader)
            }
            Err(e) => {
                self.release(lease).await;
                Err(ElectionError::Store(e))
            }
        }
    }

    async fn release(&self, lease: LeaseId) {
        if let Err(e) = self.store.revoke_lease(lease).await {
            tracing::debug!(target: "leasevisor", %lease, error = %e, "revoke of unused lease failed; it will expire");
        }
    }
}
