//! Runtime core: election, leadership and service supervision.
//!
//! Internal modules:
//! - [`race`]: first-completed-wins combinator used by the `Running` state;
//! - [`health`]: probe loop counting consecutive failures;
//! - [`service`]: restart cycle of the managed process;
//! - [`election`]: one-round leader election through the store;
//! - [`renewer`]: lease keep-alive consumption, the leadership signal;
//! - [`node`] / [`builder`]: Follower/Leader state machine and its construction;
//! - [`shutdown`]: cross-platform termination signals.

mod builder;
mod election;
mod health;
mod node;
mod race;
mod renewer;
mod service;
mod shutdown;

pub use builder::NodeBuilder;
pub use election::ElectionCoordinator;
pub use health::{HealthMonitor, HealthStatus, ThresholdReached};
pub use node::{NodeState, SupervisorNode};
pub use race::{Race, first_completed};
pub use renewer::LeaseRenewer;
pub use service::{ServiceState, ServiceSupervisor};
