//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! the built-in [`LogWriter`].
//!
//! ```text
//! Bus ──► node listener ──► SubscriberSet::emit(&Event)
//!                               ├──► [queue] ──► LogWriter (tracing)
//!                               └──► [queue] ──► custom subscribers
//! ```

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
