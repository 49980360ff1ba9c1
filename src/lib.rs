//! # leasevisor
//!
//! **Leasevisor** runs exactly one copy of a process across a group of hosts.
//!
//! Every host runs a [`SupervisorNode`]. The nodes elect a leader through a linearizable
//! consensus store (etcd, Consul, or the in-process [`MemoryStore`]); the leader spawns
//! the managed process, watches it with a health probe and restarts it when it exits or
//! turns unhealthy. If the leader dies, its lease lapses and another node takes over.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   node A                      node B                      node C
//! ┌───────────────────────┐   ┌───────────────────────┐   ┌───────────────────────┐
//! │ SupervisorNode        │   │ SupervisorNode        │   │ SupervisorNode        │
//! │  state: Leader        │   │  state: Follower      │   │  state: Follower      │
//! │  ├ LeaseRenewer       │   │  └ ElectionCoordinator│   │  └ ElectionCoordinator│
//! │  └ ServiceSupervisor  │   │     (retry + jitter)  │   │     (retry + jitter)  │
//! │     ├ process         │   └───────────┬───────────┘   └───────────┬───────────┘
//! │     └ HealthMonitor   │               │                           │
//! └───────────┬───────────┘               │                           │
//!             │ keep_alive(lease)         │ try_create_if_absent      │
//!             ▼                           ▼                           ▼
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                   ConsensusClient (linearizable store)                      │
//! │                 lock_key ──► "A/4242" bound to lease 0x1a                   │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Inside one node
//! ```text
//! ElectionCoordinator ─┐
//! LeaseRenewer        ─┤
//! ServiceSupervisor   ─┼── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//! HealthMonitor       ─┘                                             ├─► LogWriter (tracing)
//!                                                                    └─► custom subscribers
//! ```
//!
//! ### Leader term
//! ```text
//! ElectionWon
//!   ├─► LeaseRenewer::run()         ends ⇒ leadership lost (fail-fast, no local timer)
//!   └─► ServiceSupervisor::run()
//!         loop {
//!           Starting   ─► spawn()                     (error ⇒ Restarting)
//!           Running    ─► first_completed(
//!                           process.wait(),           exit ⇒ Restarting
//!                           HealthMonitor::run())     N failures ⇒ Restarting
//!           Restarting ─► kill() (idempotent), sleep(restart_backoff)
//!         }
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                          |
//! |-------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Node**          | Follower/Leader state machine, graceful shutdown         | [`SupervisorNode`], [`NodeBuilder`]         |
//! | **Store**         | Lease + atomic create-if-absent capability               | [`ConsensusClient`], [`MemoryStore`]        |
//! | **Probes**        | Pluggable health checks                                  | [`HealthProbe`], [`HeartbeatFileProbe`], [`ProbeFn`] |
//! | **Process**       | Spawn / wait / kill of the managed service               | [`Service`], [`CommandService`]             |
//! | **Policies**      | Retry backoff, jitter, step-down behavior                | [`BackoffPolicy`], [`JitterPolicy`], [`StepDownPolicy`] |
//! | **Events**        | Observable transitions                                   | [`Event`], [`EventKind`], [`Subscribe`]     |
//! | **Errors**        | Typed errors with stable labels                          | [`StoreError`], [`ElectionError`], [`RuntimeError`] |
//! | **Configuration** | All tunables in one struct                               | [`Config`]                                  |
//!
//! ## Optional features
//! - `http` (default): [`HttpProbe`] on top of `reqwest` with rustls.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use leasevisor::{Config, HeartbeatFileProbe, LogWriter, MemoryStore, Subscribe, SupervisorNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config {
//!         node_id: "node-a".into(),
//!         command: "/usr/local/bin/worker".into(),
//!         args: vec!["--heartbeat".into(), "/run/worker.hb".into()],
//!         ..Config::default()
//!     };
//!
//!     let store = Arc::new(MemoryStore::new());
//!     let probe = Arc::new(HeartbeatFileProbe::new("/run/worker.hb", Duration::from_secs(30)));
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!
//!     let node = SupervisorNode::builder(cfg, store)
//!         .with_probe(probe)
//!         .with_subscribers(subs)
//!         .build()?;
//!
//!     node.run_until_signal().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod policies;
mod probes;
mod process;
mod store;
mod subscribers;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use config::Config;
pub use crate::core::{
    ElectionCoordinator, HealthMonitor, HealthStatus, LeaseRenewer, NodeBuilder, NodeState, Race,
    ServiceState, ServiceSupervisor, SupervisorNode, ThresholdReached, first_completed,
};
pub use error::{
    ConfigError, ElectionError, LeaseLoss, ProbeError, ProcessError, RuntimeError, StoreError,
};
pub use events::{Bus, Event, EventKind, RestartCause};
pub use policies::{BackoffPolicy, JitterPolicy, StepDownPolicy};
pub use probes::{HealthProbe, HeartbeatFileProbe, ProbeFn, ProbeRef};
pub use process::{
    ChildProcess, CommandService, ExitInfo, ProcessBox, Service, ServiceProcess, ServiceRef,
};
pub use store::{
    ConsensusClient, KeepAliveAck, KeepAliveStream, LeaseId, LockRecord, MemoryStore,
    ParseLockRecordError, StoreRef, TxnOutcome,
};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};

// HTTP health probe (reqwest + rustls).
// Disable with: `--no-default-features`
#[cfg(feature = "http")]
pub use probes::HttpProbe;
