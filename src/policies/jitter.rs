//! # Jitter policy for retry delays.
//!
//! [`JitterPolicy`] adds randomness to backoff delays so that followers which saw
//! the same lease lapse do not all hit the consensus store at the same instant.
//!
//! - [`JitterPolicy::None`] no randomization, predictable delays
//! - [`JitterPolicy::Bounded`] `delay + random[0, bound)`, never shorter than the base delay

use std::time::Duration;

use rand::Rng;

/// Policy controlling randomization of retry delays.
///
/// ## Trade-offs
/// - **None**: Predictable, but risks thundering herd
/// - **Bounded**: Keeps the base delay as a floor and spreads retries above it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum JitterPolicy {
    /// No jitter: use exact backoff delay.
    #[default]
    None,

    /// Additive jitter: `delay + random[0, bound)`.
    ///
    /// The result always satisfies `delay <= result < delay + bound`
    /// (or `result == delay` when `bound` is zero).
    Bounded(Duration),
}

impl JitterPolicy {
    /// Applies jitter to the given delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Bounded(bound) => bounded_jitter(delay, *bound),
        }
    }

    /// Exclusive upper bound of what [`apply`](Self::apply) may add.
    pub fn spread(&self) -> Duration {
        match self {
            JitterPolicy::None => Duration::ZERO,
            JitterPolicy::Bounded(bound) => *bound,
        }
    }
}

/// Bounded jitter: delay + random[0, bound), in whole milliseconds.
fn bounded_jitter(delay: Duration, bound: Duration) -> Duration {
    let ms = bound.as_millis().min(u128::from(u64::MAX)) as u64;
    if ms == 0 {
        return delay;
    }
    delay.saturating_add(Duration::from_millis(rand::rng().random_range(0..ms)))
}
