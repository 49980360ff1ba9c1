//! # In-process linearizable consensus store.
//!
//! [`MemoryStore`] implements [`ConsensusClient`] on top of a single mutex, which is the
//! linearization point for every operation. Clones share the same state, so one store
//! can arbitrate between any number of nodes running in the same process.
//!
//! ## Semantics
//! - Lease deadlines are measured with `tokio::time`, so paused test clocks drive expiry.
//! - Expiry is applied lazily at the start of every operation; an expired lease and all
//!   keys bound to it vanish together.
//! - Keep-alive streams renew every `ttl / 3` while polled and end immediately when the
//!   lease is revoked or expires.
//! - [`MemoryStore::set_available`] simulates a partition: operations fail with
//!   [`StoreError::Unavailable`] and open keep-alive streams fail and end.
//!
//! ```text
//! node A ─┐                       ┌─ leases: {1: deadline, 2: deadline}
//! node B ─┼─► Mutex<State> ───────┤
//! node C ─┘                       └─ keys:   {"/leader": ("a/42", lease 1)}
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::store::client::{ConsensusClient, KeepAliveAck, KeepAliveStream, LeaseId, TxnOutcome};

/// Shortest renewal period a keep-alive stream will use.
const MIN_RENEW_PERIOD: Duration = Duration::from_millis(1);

struct LeaseEntry {
    ttl: Duration,
    deadline: Instant,
    /// Cancelled when the lease is revoked or expires.
    gone: CancellationToken,
}

struct KeyEntry {
    value: String,
    lease: LeaseId,
}

struct State {
    next_lease: i64,
    available: bool,
    /// Cancelled (and replaced) whenever the store becomes unavailable.
    link: CancellationToken,
    leases: HashMap<LeaseId, LeaseEntry>,
    keys: BTreeMap<String, KeyEntry>,
}

impl State {
    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available {
            Ok(())
        } else {
            Err(StoreError::unavailable("store unreachable"))
        }
    }

    fn sweep(&mut self, now: Instant) {
        let expired: Vec<LeaseId> = self
            .leases
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            self.drop_lease(id);
        }
    }

    fn drop_lease(&mut self, id: LeaseId) -> bool {
        match self.leases.remove(&id) {
            Some(entry) => {
                entry.gone.cancel();
                self.keys.retain(|_, key| key.lease != id);
                true
            }
            None => false,
        }
    }
}

/// Shared in-memory consensus store.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates an empty, available store.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                next_lease: 1,
                available: true,
                link: CancellationToken::new(),
                leases: HashMap::new(),
                keys: BTreeMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the store reachable or unreachable for every client.
    pub fn set_available(&self, available: bool) {
        let mut st = self.lock();
        if st.available && !available {
            st.link.cancel();
            st.link = CancellationToken::new();
        }
        st.available = available;
    }

    /// Returns whether the store currently answers requests.
    pub fn is_available(&self) -> bool {
        self.lock().available
    }

    /// Expires a lease immediately, as if its TTL elapsed without renewal.
    ///
    /// Returns `false` if the lease did not exist.
    pub fn expire_lease(&self, lease: LeaseId) -> bool {
        self.lock().drop_lease(lease)
    }

    /// Reads a key and the lease it is bound to (test/inspection helper; ignores availability).
    pub fn get(&self, key: &str) -> Option<(String, LeaseId)> {
        let mut st = self.lock();
        st.sweep(Instant::now());
        st.keys
            .get(key)
            .map(|entry| (entry.value.clone(), entry.lease))
    }

    /// Number of live leases.
    pub fn lease_count(&self) -> usize {
        let mut st = self.lock();
        st.sweep(Instant::now());
        st.leases.len()
    }

    /// Extends the lease deadline by its TTL.
    fn renew(&self, lease: LeaseId) -> Result<KeepAliveAck, StoreError> {
        let mut st = self.lock();
        st.ensure_available()?;
        let now = Instant::now();
        st.sweep(now);
        let entry = st
            .leases
            .get_mut(&lease)
            .ok_or(StoreError::LeaseNotFound { lease })?;
        entry.deadline = now + entry.ttl;
        Ok(KeepAliveAck {
            lease,
            ttl: entry.ttl,
        })
    }

    /// Snapshot of what a keep-alive stream needs to wait on.
    fn renewal_plan(
        &self,
        lease: LeaseId,
    ) -> Result<(Duration, CancellationToken, CancellationToken), StoreError> {
        let mut st = self.lock();
        st.ensure_available()?;
        st.sweep(Instant::now());
        let entry = st
            .leases
            .get(&lease)
            .ok_or(StoreError::LeaseNotFound { lease })?;
        let period = (entry.ttl / 3).max(MIN_RENEW_PERIOD);
        Ok((period, entry.gone.clone(), st.link.clone()))
    }
}

#[async_trait]
impl ConsensusClient for MemoryStore {
    async fn grant_lease(&self, ttl: Duration) -> Result<LeaseId, StoreError> {
        let mut st = self.lock();
        st.ensure_available()?;
        let now = Instant::now();
        st.sweep(now);

        let id = LeaseId::new(st.next_lease);
        st.next_lease += 1;
        st.leases.insert(
            id,
            LeaseEntry {
                ttl,
                deadline: now + ttl,
                gone: CancellationToken::new(),
            },
        );
        Ok(id)
    }

    async fn revoke_lease(&self, lease: LeaseId) -> Result<(), StoreError> {
        let mut st = self.lock();
        st.ensure_available()?;
        st.sweep(Instant::now());
        if st.drop_lease(lease) {
            Ok(())
        } else {
            Err(StoreError::LeaseNotFound { lease })
        }
    }

    async fn try_create_if_absent(
        &self,
        key: &str,
        value: &str,
        lease: LeaseId,
    ) -> Result<TxnOutcome, StoreError> {
        let mut st = self.lock();
        st.ensure_available()?;
        st.sweep(Instant::now());

        if !st.leases.contains_key(&lease) {
            return Err(StoreError::LeaseNotFound { lease });
        }
        if st.keys.contains_key(key) {
            return Ok(TxnOutcome::Lost);
        }
        st.keys.insert(
            key.to_string(),
            KeyEntry {
                value: value.to_string(),
                lease,
            },
        );
        Ok(TxnOutcome::Won)
    }

    fn keep_alive(&self, lease: LeaseId) -> KeepAliveStream {
        futures::stream::unfold(Some(self.clone()), move |state| async move {
            let store = state?;
            let (period, gone, link) = match store.renewal_plan(lease) {
                Ok(plan) => plan,
                Err(e) => return Some((Err(e), None)),
            };

            tokio::select! {
                _ = tokio::time::sleep(period) => {}
                _ = gone.cancelled() => return None,
                _ = link.cancelled() => {
                    return Some((Err(StoreError::unavailable("keep-alive connection lost")), None));
                }
            }

            match store.renew(lease) {
                Ok(ack) => Some((Ok(ack), Some(store))),
                Err(e) => Some((Err(e), None)),
            }
        })
        .boxed()
    }
}
