//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`], [`RestartCause`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `SupervisorNode`, `ElectionCoordinator`, `LeaseRenewer`,
//!   `ServiceSupervisor`, `HealthMonitor`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the node's subscriber listener (fans out to `SubscriberSet`)
//!   and any receiver obtained from [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind, RestartCause};
