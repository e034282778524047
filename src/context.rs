//! Per-call cancellation and deadline carrier.
//!
//! Every operation that can block (waiting for a rate-limit token, a cache
//! round trip, the origin request) takes a `&Context` and races its work
//! against the context's cancellation token and deadline.
use std::{future::Future, time::Duration};

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context stopped the work it was guarding.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    #[error("context cancelled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Clone, Debug, Default)]
pub struct Context {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().timeout(timeout)
    }

    /// Builds a context driven by an existing token (e.g. a shutdown signal).
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: token,
            deadline: None,
        }
    }

    /// Returns a copy with a deadline `timeout` from now. An earlier deadline
    /// already on the context is kept. A timeout too large to represent
    /// leaves the context without a new deadline.
    pub fn timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(at) => self.deadline(at),
            None => self,
        }
    }

    pub fn deadline(mut self, at: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < at => current,
            _ => at,
        });
        self
    }

    /// Child shares the deadline; cancelling the parent cancels the child but
    /// not the other way around.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns the reason this context is done, if it already is.
    pub fn err(&self) -> Option<Interrupted> {
        if self.cancel.is_cancelled() {
            return Some(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(at) if Instant::now() >= at => Some(Interrupted::DeadlineExceeded),
            _ => None,
        }
    }

    /// Drives `fut` until it completes or the context is done, whichever comes
    /// first. On interruption `fut` is dropped.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        if let Some(reason) = self.err() {
            return Err(reason);
        }

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            _ = deadline => Err(Interrupted::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn background_runs_to_completion() {
        let ctx = Context::background();
        assert_eq!(ctx.run(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits() {
        let ctx = Context::background();
        ctx.cancel();
        let res = ctx.run(async { 1 }).await;
        assert_eq!(res, Err(Interrupted::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_interrupts_pending_work() {
        let ctx = Context::with_timeout(Duration::from_millis(50));
        let res = ctx.run(std::future::pending::<()>()).await;
        assert_eq!(res, Err(Interrupted::DeadlineExceeded));
    }

    #[tokio::test]
    async fn cancel_wakes_waiter() {
        let ctx = Context::background();
        let waiter = ctx.clone();
        let handle = tokio::spawn(async move { waiter.run(std::future::pending::<()>()).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        ctx.cancel();

        assert_eq!(handle.await.unwrap(), Err(Interrupted::Cancelled));
    }

    #[test]
    fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = Context::background()
            .deadline(now + Duration::from_secs(1))
            .deadline(now + Duration::from_secs(10));
        assert_eq!(ctx.deadline, Some(now + Duration::from_secs(1)));
    }

    #[test]
    fn unrepresentable_timeout_means_no_deadline() {
        let ctx = Context::with_timeout(Duration::MAX);
        assert_eq!(ctx.deadline, None);
        assert_eq!(ctx.err(), None);

        let bounded = Context::with_timeout(Duration::from_secs(5)).timeout(Duration::MAX);
        assert!(bounded.deadline.is_some());
    }

    #[test]
    fn child_cancellation_does_not_reach_parent() {
        let parent = Context::background();
        let child = parent.child();
        child.cancel();
        assert_eq!(child.err(), Some(Interrupted::Cancelled));
        assert_eq!(parent.err(), None);

        let child = parent.child();
        parent.cancel();
        assert_eq!(child.err(), Some(Interrupted::Cancelled));
    }
}
