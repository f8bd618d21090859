//! Request-scoped context and bounded execution
//!
//! A [`RequestContext`] is built by the transport for each request. It carries
//! the tenant explicitly, an optional deadline and a cancellation token. Every
//! use-case operation runs through [`run_bounded`], which derives an
//! [`OperationContext`] with a tighter deadline and a child token, converts a
//! deadline or cancellation into [`ErrorKind::Timeout`](crate::error::ErrorKind)
//! and a panic into [`ErrorKind::Fatal`](crate::error::ErrorKind).

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{Layer, PanicCause, StructuredError};

/// Identifier of the tenant whose storage a request targets
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Create a tenant id, rejecting blank values
    ///
    /// # Errors
    ///
    /// Returns a `BAD_REQUEST` error when `value` is empty or whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, StructuredError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(StructuredError::bad_request("tenant id must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the raw id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-side context for one request
#[derive(Debug, Clone)]
pub struct RequestContext {
    tenant: TenantId,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl RequestContext {
    /// Create a context for `tenant` with no deadline
    #[must_use]
    pub fn new(tenant: TenantId) -> Self {
        Self {
            tenant,
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Bound the whole request by `deadline`
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Tenant targeted by the request
    #[must_use]
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Request deadline, if any
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Token cancelled when the caller gives up
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn derive(&self, max: Duration) -> OperationContext {
        let budget = Instant::now() + max;
        let deadline = match self.deadline {
            Some(parent) if parent < budget => parent,
            _ => budget,
        };
        OperationContext {
            tenant: self.tenant.clone(),
            deadline,
            cancel: self.cancel.child_token(),
        }
    }
}

/// Context seen by repositories during one bounded operation
#[derive(Debug, Clone)]
pub struct OperationContext {
    tenant: TenantId,
    deadline: Instant,
    cancel: CancellationToken,
}

impl OperationContext {
    /// Tenant whose storage must be used
    #[must_use]
    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    /// Instant after which the operation is abandoned
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Whether the operation was cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Completes when the operation is cancelled
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}

#[cfg(test)]
impl OperationContext {
    /// Context with a generous deadline for exercising repositories directly
    pub(crate) fn for_tests(tenant: TenantId) -> Self {
        RequestContext::new(tenant).derive(Duration::from_secs(30))
    }
}

/// Run `operation` under a deadline derived from `parent` and `max`
///
/// The derived context's token is cancelled on every exit path. Deadline
/// expiry or parent cancellation yields a `TIMEOUT` error; a panic inside the
/// operation yields a `FATAL` error. `function` names the operation in both.
///
/// # Errors
///
/// Returns the operation's own error, or a timeout / fatal error as above.
pub async fn run_bounded<T, F, Fut>(
    parent: &RequestContext,
    max: Duration,
    function: &str,
    operation: F,
) -> Result<T, StructuredError>
where
    F: FnOnce(OperationContext) -> Fut,
    Fut: Future<Output = Result<T, StructuredError>>,
{
    let ctx = parent.derive(max);
    let deadline = ctx.deadline;
    let cancel = ctx.cancel.clone();
    let _guard = cancel.clone().drop_guard();

    let guarded = AssertUnwindSafe(async move { operation(ctx).await }).catch_unwind();

    tokio::select! {
        biased;
        outcome = guarded => match outcome {
            Ok(result) => result,
            Err(payload) => {
                let cause = PanicCause::from_payload(payload.as_ref());
                tracing::error!(function, panic = %cause.0, "operation panicked");
                Err(StructuredError::fatal(function, cause.0))
            }
        },
        () = tokio::time::sleep_until(deadline) => {
            tracing::warn!(function, "operation deadline elapsed");
            Err(StructuredError::timeout(Layer::UseCase, function))
        }
        () = cancel.cancelled() => {
            tracing::warn!(function, "operation cancelled by caller");
            Err(StructuredError::timeout(Layer::UseCase, function)
                .with_message("cancelled by caller"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, Level};

    fn tenant() -> TenantId {
        TenantId::new("acme").unwrap()
    }

    #[test]
    fn test_tenant_id_rejects_blank() {
        let error = TenantId::new("   ").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::BadRequest);
        assert_eq!(TenantId::new(" acme ").unwrap().as_str(), "acme");
    }

    #[tokio::test]
    async fn test_returns_operation_result() {
        let ctx = RequestContext::new(tenant());
        let value = run_bounded(&ctx, Duration::from_secs(1), "op", |op| async move {
            assert_eq!(op.tenant().as_str(), "acme");
            Ok::<_, StructuredError>(7)
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses_as_timeout() {
        let ctx = RequestContext::new(tenant());
        let error = run_bounded(&ctx, Duration::from_millis(50), "slow_op", |_| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, StructuredError>(())
        })
        .await
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Timeout);
        assert_eq!(error.function(), "slow_op");
        assert_eq!(error.layer(), Layer::UseCase);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_deadline_is_tighter() {
        let ctx = RequestContext::new(tenant())
            .with_deadline(Instant::now() + Duration::from_millis(10));
        let error = run_bounded(&ctx, Duration::from_secs(60), "op", |op| async move {
            assert!(op.remaining() <= Duration::from_millis(10));
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, StructuredError>(())
        })
        .await
        .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_caller_cancellation_is_timeout() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new(tenant()).with_cancellation(token.clone());
        token.cancel();

        let error = run_bounded(&ctx, Duration::from_secs(5), "op", |_| async {
            futures::future::pending::<()>().await;
            Ok::<_, StructuredError>(())
        })
        .await
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Timeout);
        assert_eq!(error.messages(), ["cancelled by caller".to_string()]);
    }

    #[tokio::test]
    async fn test_panic_becomes_fatal() {
        let ctx = RequestContext::new(tenant());
        let error = run_bounded(&ctx, Duration::from_secs(1), "explode", |_| async {
            if true {
                panic!("invariant broken");
            }
            Ok::<u8, StructuredError>(0)
        })
        .await
        .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Fatal);
        assert_eq!(error.level(), Level::Fatal);
        assert_eq!(error.function(), "explode");
        assert_eq!(
            error.raw().map(ToString::to_string),
            Some("panic: invariant broken".to_string())
        );
    }

    #[tokio::test]
    async fn test_derived_token_cancelled_on_exit() {
        let ctx = RequestContext::new(tenant());
        let mut captured = None;
        let result = run_bounded(&ctx, Duration::from_secs(1), "op", |op| {
            captured = Some(op.clone());
            async { Ok::<_, StructuredError>(()) }
        })
        .await;

        assert!(result.is_ok());
        assert!(captured.unwrap().is_cancelled());
        assert!(!ctx.cancellation().is_cancelled());
    }
}
