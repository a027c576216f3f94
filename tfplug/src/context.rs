//! Context implementation for request-scoped data
//!
//! A Context is created per lifecycle operation and handed to every async
//! trait method. It carries the log id used to correlate all API calls made
//! on behalf of one operation, and an optional deadline that bounds any
//! convergence wait started inside that operation.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Context carries the operation's log id and deadline
/// Pass this as first parameter to ALL async trait methods
#[derive(Clone, Debug)]
pub struct Context {
    inner: Arc<ContextInner>,
}

#[derive(Debug)]
struct ContextInner {
    log_id: String,
    deadline: Option<Instant>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_log_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_log_id(log_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                log_id: log_id.into(),
                deadline: None,
            }),
        }
    }

    /// Derive a context whose deadline is `timeout` from now, keeping the log id
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                log_id: self.inner.log_id.clone(),
                deadline: Some(Instant::now() + timeout),
            }),
        }
    }

    pub fn log_id(&self) -> &str {
        &self.inner.log_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline, `None` when the context is unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.remaining(), Some(left) if left.is_zero())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_generates_unique_log_ids() {
        let a = Context::new();
        let b = Context::new();

        assert!(!a.log_id().is_empty());
        assert_ne!(a.log_id(), b.log_id());
    }

    #[test]
    fn context_keeps_explicit_log_id() {
        let ctx = Context::with_log_id("op-42");
        assert_eq!(ctx.log_id(), "op-42");
    }

    #[tokio::test(start_paused = true)]
    async fn context_timeout_expires() {
        let ctx = Context::with_log_id("op").with_timeout(Duration::from_millis(100));

        assert_eq!(ctx.log_id(), "op");
        assert!(!ctx.is_expired());

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(ctx.is_expired());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn context_deadline() {
        let ctx = Context::new();
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());
        assert!(!ctx.is_expired());
    }
}
