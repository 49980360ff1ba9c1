//! # Health probe capability.
//!
//! A [`HealthProbe`] answers one question: is the managed service healthy right now?
//! Strategies (HTTP, heartbeat file, custom closures) are chosen when the node is built
//! and are interchangeable behind [`ProbeRef`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProbeError;

/// Shared handle to a health probe.
pub type ProbeRef = Arc<dyn HealthProbe>;

/// Application-level liveness check.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use async_trait::async_trait;
/// use leasevisor::{HealthProbe, ProbeError};
///
/// struct AlwaysUp;
///
/// #[async_trait]
/// impl HealthProbe for AlwaysUp {
///     fn name(&self) -> &str { "always-up" }
///
///     async fn check(&self, _timeout: Duration) -> Result<(), ProbeError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait HealthProbe: Send + Sync + 'static {
    /// Short name used in events.
    fn name(&self) -> &str;

    /// Runs one check, giving up after `timeout`.
    ///
    /// The caller also enforces `timeout` externally, so implementations that cannot
    /// honor it cooperatively are still bounded.
    async fn check(&self, timeout: Duration) -> Result<(), ProbeError>;
}
