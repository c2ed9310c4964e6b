//! Request-scoped deadline and cancellation.
//!
//! Every dependency call made while gating a request runs through
//! [`RequestContext::run`], which bounds it by the earlier of the request
//! deadline and a per-call limit, and aborts it when the request is cancelled.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reason a bounded call did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("request cancelled")]
    Cancelled,
}

/// Deadline and cancellation carrier for a single request.
///
/// Cloning is cheap and clones share the same cancellation token.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl RequestContext {
    /// Creates a context with a fresh request id and no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Creates a context whose deadline is `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().with_deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The earlier of the request deadline and `now + limit`.
    #[must_use]
    pub fn effective_deadline(&self, limit: Option<Duration>) -> Option<Instant> {
        let call_deadline = limit.map(|limit| Instant::now() + limit);
        match (self.deadline, call_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Runs `fut` bounded by the effective deadline and the cancellation token.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Cancelled`] if the context is cancelled first and
    /// [`ContextError::DeadlineExceeded`] if the deadline passes first.
    pub async fn run<F>(&self, limit: Option<Duration>, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return Err(ContextError::Cancelled);
        }

        let deadline = self.effective_deadline(limit);
        let bounded = async move {
            match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, fut)
                    .await
                    .map_err(|_| ContextError::DeadlineExceeded),
                None => Ok(fut.await),
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(ContextError::Cancelled),
            result = bounded => result,
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_completes_without_deadline() {
        let ctx = RequestContext::new();
        let value = ctx.run(None, async { 42 }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_respects_call_limit() {
        let ctx = RequestContext::new();
        let result = ctx
            .run(Some(Duration::from_millis(50)), async {
                tokio::time::sleep(Duration::from_secs(1)).await;
            })
            .await;
        assert_eq!(result, Err(ContextError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_deadline_wins_when_earlier() {
        let ctx = RequestContext::with_timeout(Duration::from_millis(10));
        let result = ctx
            .run(Some(Duration::from_secs(5)), async {
                tokio::time::sleep(Duration::from_millis(100)).await;
            })
            .await;
        assert_eq!(result, Err(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_cancelled_context_aborts() {
        let ctx = RequestContext::new();
        let clone = ctx.clone();
        clone.cancel();

        let result = ctx.run(None, std::future::pending::<()>()).await;
        assert_eq!(result, Err(ContextError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_call() {
        let ctx = RequestContext::new();
        let token = ctx.cancellation_token().clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            token.cancel();
        });

        let result = ctx.run(None, std::future::pending::<()>()).await;
        assert_eq!(result, Err(ContextError::Cancelled));
    }

    #[test]
    fn test_effective_deadline_takes_minimum() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();
        rt.block_on(async {
            let now = Instant::now();
            let ctx = RequestContext::new().with_deadline(now + Duration::from_secs(1));
            assert_eq!(
                ctx.effective_deadline(Some(Duration::from_secs(5))),
                Some(now + Duration::from_secs(1))
            );
            assert_eq!(
                ctx.effective_deadline(Some(Duration::from_millis(200))),
                Some(now + Duration::from_millis(200))
            );
            assert_eq!(RequestContext::new().effective_deadline(None), None);
        });
    }
}
