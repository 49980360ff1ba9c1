//! # LeaseRenewer: the leader's only source of truth for "am I still leader".
//!
//! Consumes the store's keep-alive acknowledgements for a held lease. While acks keep
//! arriving the lease is valid; the first sign of trouble ends [`LeaseRenewer::run`]
//! with the reason. No local timer is consulted and nothing is retried in place: a lost
//! lease needs a fresh election.
//!
//! ```text
//! keep_alive(lease)
//!   ├─ Ok(ack, ttl > 0) ──► keep consuming
//!   ├─ Ok(ack, ttl = 0) ──► LeaseLoss::Expired
//!   ├─ Err(e)           ──► LeaseLoss::StreamFailed(e)
//!   └─ end of stream    ──► LeaseLoss::StreamEnded
//! ```

use futures::StreamExt;

use crate::{
    error::LeaseLoss,
    store::{LeaseId, StoreRef},
};

/// Keeps one lease alive until it is lost.
pub struct LeaseRenewer {
    store: StoreRef,
    lease: LeaseId,
}

impl LeaseRenewer {
    pub fn new(store: StoreRef, lease: LeaseId) -> Self {
        Self { store, lease }
    }

    /// The lease being renewed.
    pub fn lease(&self) -> LeaseId {
        self.lease
    }

    /// Renews until the lease is lost and returns why.
    ///
    /// Resolves as soon as the stream yields its terminating item; cancel by dropping.
    pub async fn run(self) -> LeaseLoss {
        let mut acks = self.store.keep_alive(self.lease);

        while let Some(ack) = acks.next().await {
            match ack {
                Ok(ack) if ack.ttl.is_zero() => return LeaseLoss::Expired,
                Ok(ack) => {
                    tracing::trace!(target: "leasevisor", lease = %ack.lease, ttl = ?ack.ttl, "lease renewed");
                }
                Err(e) => return LeaseLoss::StreamFailed(e),
            }
        }
        LeaseLoss::StreamEnded
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::{self, Instant};

    use super::*;
    use crate::error::StoreError;
    use crate::store::{
        ConsensusClient, KeepAliveAck, KeepAliveStream, MemoryStore, TxnOutcome,
    };

    const TTL: Duration = Duration::from_secs(5);

    #[tokio::test(start_paused = true)]
    async fn keeps_renewing_while_acks_arrive() {
        let store = MemoryStore::new();
        let lease = store.grant_lease(TTL).await.unwrap();
        let renewer = LeaseRenewer::new(Arc::new(store.clone()), lease);

        let res = time::timeout(Duration::from_secs(60), renewer.run()).await;

        assert!(res.is_err(), "lease must still be held");
        assert_eq!(store.lease_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn external_revoke_is_noticed_without_delay() {
        let store = MemoryStore::new();
        let lease = store.grant_lease(TTL).await.unwrap();
        let renewer = LeaseRenewer::new(Arc::new(store.clone()), lease);
        let task = tokio::spawn(renewer.run());

        time::sleep(Duration::from_millis(2500)).await;
        let revoked_at = Instant::now();
        store.revoke_lease(lease).await.unwrap();

        assert_eq!(task.await.unwrap(), LeaseLoss::StreamEnded);
        assert_eq!(Instant::now(), revoked_at);
    }

    #[tokio::test(start_paused = true)]
    async fn partition_fails_the_stream() {
        let store = MemoryStore::new();
        let lease = store.grant_lease(TTL).await.unwrap();
        let task = tokio::spawn(LeaseRenewer::new(Arc::new(store.clone()), lease).run());

        tokio::task::yield_now().await;
        store.set_available(false);

        assert!(matches!(
            task.await.unwrap(),
            LeaseLoss::StreamFailed(StoreError::Unavailable { .. })
        ));
    }

    /// Acks once, then reports a zero TTL.
    struct ZeroTtlStore;

    #[async_trait]
    impl ConsensusClient for ZeroTtlStore {
        async fn grant_lease(&self, _ttl: Duration) -> Result<LeaseId, StoreError> {
            Ok(LeaseId::new(1))
        }

        async fn revoke_lease(&self, _lease: LeaseId) -> Result<(), StoreError> {
            Ok(())
        }

        async fn try_create_if_absent(
            &self,
            _key: &str,
            _value: &str,
            _lease: LeaseId,
        ) -> Result<TxnOutcome, StoreError> {
            Ok(TxnOutcome::Won)
        }

        fn keep_alive(&self, lease: LeaseId) -> KeepAliveStream {
            futures::stream::iter([
                Ok(KeepAliveAck { lease, ttl: TTL }),
                Ok(KeepAliveAck {
                    lease,
                    ttl: Duration::ZERO,
                }),
                Ok(KeepAliveAck { lease, ttl: TTL }),
            ])
            .boxed()
        }
    }

    #[tokio::test]
    async fn zero_ttl_ack_means_expired() {
        let renewer = LeaseRenewer::new(Arc::new(ZeroTtlStore), LeaseId::new(1));
        assert_eq!(renewer.lease(), LeaseId::new(1));
        assert_eq!(renewer.run().await, LeaseLoss::Expired);
    }
}
