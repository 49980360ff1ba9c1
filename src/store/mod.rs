//! Consensus store boundary.
//!
//! - [`ConsensusClient`] the capability the node is written against
//! - [`LockRecord`] what the leader writes under the lock key
//! - [`MemoryStore`] in-process linearizable store (tests, demos, single-host setups)

mod client;
mod memory;
mod record;

pub use client::{ConsensusClient, KeepAliveAck, KeepAliveStream, LeaseId, StoreRef, TxnOutcome};
pub use memory::MemoryStore;
pub use record::{LockRecord, ParseLockRecordError};
