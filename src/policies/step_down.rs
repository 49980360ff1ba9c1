//! # What happens to the managed process when leadership is lost.
//!
//! When the lease lapses, another node may already be starting its own copy of the
//! service. Killing the local copy closes that window at the cost of an outage if
//! the lease loss was spurious (a short partition from the store while the service
//! itself was fine). Leaving it running avoids the outage but allows two copies to
//! run until the operator or the process notices.
//!
//! [`StepDownPolicy`] makes the choice explicit. Explicit shutdown always kills.

/// Fate of the local process when the lease is lost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StepDownPolicy {
    /// Kill the process before returning to follower (default).
    #[default]
    KillService,
    /// Release the handle without killing; the process keeps running unsupervised.
    LeaveRunning,
}
