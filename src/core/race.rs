//! # First-completed-wins combinator.
//!
//! [`first_completed`] drives two futures concurrently, returns the output of whichever
//! finishes first and drops the other one. Dropping is the cancellation: the loser's
//! in-flight work (a pending probe, a process wait) is abandoned, never awaited further.
//!
//! ```text
//! first_completed(a, b)
//!   ├─ a ready first ──► Race::First(a_out)    b dropped
//!   └─ b ready first ──► Race::Second(b_out)   a dropped
//! ```
//!
//! ## Rules
//! - Exactly one output is produced, so the caller can never react twice.
//! - Polling is biased towards `a`: if both are ready in the same poll, `a` wins.

use std::future::Future;

/// Which branch of a [`first_completed`] race finished first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Race<A, B> {
    /// The first future completed.
    First(A),
    /// The second future completed.
    Second(B),
}

/// Runs `a` and `b` concurrently and returns the first result; the other future is dropped.
pub async fn first_completed<A, B>(a: A, b: B) -> Race<A::Output, B::Output>
where
    A: Future,
    B: Future,
{
    tokio::select! {
        biased;
        out = a => Race::First(out),
        out = b => Race::Second(out),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use super::*;

    /// Sets the flag when dropped.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn faster_branch_wins_and_loser_is_dropped() {
        let dropped = Arc::new(AtomicBool::new(false));
        let guard = DropFlag(dropped.clone());
        let finished = Arc::new(AtomicBool::new(false));
        let finished_in_loser = finished.clone();

        let slow = async move {
            let _guard = guard;
            tokio::time::sleep(Duration::from_secs(10)).await;
            finished_in_loser.store(true, Ordering::SeqCst);
        };
        let fast = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            "fast"
        };

        assert_eq!(first_completed(slow, fast).await, Race::Second("fast"));
        assert!(dropped.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn pending_branch_never_wins() {
        let out = first_completed(std::future::pending::<()>(), async { 7 }).await;
        assert_eq!(out, Race::Second(7));
    }

    #[tokio::test]
    async fn simultaneous_completion_prefers_first() {
        let out = first_completed(async { 1 }, async { 2 }).await;
        assert_eq!(out, Race::First(1));
    }
}
