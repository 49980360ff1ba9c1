//! # Health probes.
//!
//! - [`HealthProbe`] the single-method capability used by the health monitor
//! - [`HttpProbe`] `GET` a URL, 2xx is healthy (feature `http`)
//! - [`HeartbeatFileProbe`] timestamp file freshness
//! - [`ProbeFn`] closure-backed probe

mod heartbeat;
#[cfg(feature = "http")]
mod http;
mod probe;
mod probe_fn;

pub use heartbeat::HeartbeatFileProbe;
#[cfg(feature = "http")]
pub use http::HttpProbe;
pub use probe::{HealthProbe, ProbeRef};
pub use probe_fn::ProbeFn;
