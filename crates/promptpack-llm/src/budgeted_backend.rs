//! Call-count limit for completion backends

use crate::LlmError;
use crate::types::{LlmBackend, LlmInvocation, LlmResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

/// A wrapper around an `LlmBackend` that caps the number of invocations.
///
/// The budget tracks attempted calls, not successful requests: a failed call
/// still consumes its slot. The limit comes from `[llm] budget` or
/// `PROMPTPACK_LLM_BUDGET`, resolved by configuration discovery.
pub struct BudgetedBackend {
    inner: Box<dyn LlmBackend>,
    calls: AtomicU32,
    limit: u32,
}

impl BudgetedBackend {
    pub fn new(inner: Box<dyn LlmBackend>, limit: u32) -> Self {
        debug!(limit = limit, "Creating BudgetedBackend");
        Self {
            inner,
            calls: AtomicU32::new(0),
            limit,
        }
    }

    /// Calls attempted so far, including rejected ones.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

#[async_trait]
impl LlmBackend for BudgetedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        // Count before calling so failures consume budget too
        let current = self.calls.fetch_add(1, Ordering::SeqCst);

        if current >= self.limit {
            let attempted = current + 1;
            warn!(
                limit = self.limit,
                attempted = attempted,
                purpose = %inv.purpose,
                "LLM call budget exceeded"
            );
            return Err(LlmError::CallBudgetExceeded {
                limit: self.limit,
                attempted,
            });
        }

        debug!(
            call_count = current + 1,
            limit = self.limit,
            "Budget check passed, invoking inner backend"
        );

        let result = self.inner.invoke(inv).await;

        if let Err(e) = &result {
            debug!(
                call_count = current + 1,
                limit = self.limit,
                error = %e,
                "Inner backend invocation failed (budget slot still consumed)"
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;
    use std::time::Duration;

    struct MockSuccessBackend;

    #[async_trait]
    impl LlmBackend for MockSuccessBackend {
        async fn invoke(&self, _inv: LlmInvocation) -> Result<LlmResult, LlmError> {
            Ok(LlmResult::new("test response", "mock", "mock-model"))
        }
    }

    struct MockFailureBackend;

    #[async_trait]
    impl LlmBackend for MockFailureBackend {
        async fn invoke(&self, _inv: LlmInvocation) -> Result<LlmResult, LlmError> {
            Err(LlmError::Transport("mock failure".to_string()))
        }
    }

    fn create_test_invocation() -> LlmInvocation {
        LlmInvocation::new(
            "test",
            "test-model",
            Duration::from_secs(60),
            vec![Message::user("test message")],
        )
    }

    #[tokio::test]
    async fn test_budget_allows_calls_under_limit() {
        let backend = BudgetedBackend::new(Box::new(MockSuccessBackend), 3);

        for expected in 1..=3 {
            assert!(backend.invoke(create_test_invocation()).await.is_ok());
            assert_eq!(backend.call_count(), expected);
        }
    }

    #[tokio::test]
    async fn test_budget_fails_at_limit() {
        let backend = BudgetedBackend::new(Box::new(MockSuccessBackend), 2);

        backend.invoke(create_test_invocation()).await.unwrap();
        backend.invoke(create_test_invocation()).await.unwrap();

        match backend.invoke(create_test_invocation()).await {
            Err(LlmError::CallBudgetExceeded { limit, attempted }) => {
                assert_eq!(limit, 2);
                assert_eq!(attempted, 3);
            }
            other => panic!("Expected CallBudgetExceeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_budget_tracks_failed_calls() {
        let backend = BudgetedBackend::new(Box::new(MockFailureBackend), 1);

        let first = backend.invoke(create_test_invocation()).await;
        assert!(matches!(first, Err(LlmError::Transport(_))));

        let second = backend.invoke(create_test_invocation()).await;
        assert!(matches!(second, Err(LlmError::CallBudgetExceeded { .. })));
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_budget_limit_zero() {
        let backend = BudgetedBackend::new(Box::new(MockSuccessBackend), 0);
        assert!(matches!(
            backend.invoke(create_test_invocation()).await,
            Err(LlmError::CallBudgetExceeded {
                limit: 0,
                attempted: 1
            })
        ));
        assert_eq!(backend.limit(), 0);
    }
}
