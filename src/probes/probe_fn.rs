//! # Function-backed probe (`ProbeFn`)
//!
//! [`ProbeFn`] wraps a closure `F: Fn() -> Fut`, producing a fresh future per check.
//! Shared state between checks must be captured explicitly (e.g. `Arc<AtomicBool>`).
//!
//! ## Example
//! ```rust
//! use leasevisor::{HealthProbe, ProbeError, ProbeFn, ProbeRef};
//!
//! let probe: ProbeRef = ProbeFn::arc("tcp-port", || async {
//!     Ok::<_, ProbeError>(())
//! });
//! assert_eq!(probe.name(), "tcp-port");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProbeError;
use crate::probes::probe::HealthProbe;

/// Function-backed probe implementation.
pub struct ProbeFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ProbeFn<F> {
    /// Creates a new function-backed probe.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the probe and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> HealthProbe for ProbeFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProbeError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, _timeout: Duration) -> Result<(), ProbeError> {
        (self.f)().await
    }
}
