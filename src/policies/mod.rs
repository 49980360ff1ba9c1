//! Retry, restart and step-down policies.
//!
//! ## Contents
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid synchronized retries
//! - [`StepDownPolicy`] fate of the managed process when leadership is lost
//!
//! ## Quick wiring
//! ```text
//! Config
//!   ├─► election_backoff()    → constant election_retry + Bounded(election_jitter)
//!   ├─► unavailable_backoff() → election_retry × 2^n (≤ unavailable_max) + Bounded(election_jitter)
//!   ├─► restart_policy()      → constant restart_backoff
//!   └─► step_down             → used by core::node on lease loss
//! ```

mod backoff;
mod jitter;
mod step_down;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use step_down::StepDownPolicy;
