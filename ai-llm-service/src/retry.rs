//! Bounded retry with exponential backoff for provider calls.
//!
//! Only errors for which [`AiLlmError::is_transient`] returns `true` are
//! retried. Once the attempts are used up the last error is wrapped in
//! [`AiLlmError::RetriesExhausted`] so callers keep the underlying cause.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error_handler::{AiLlmError, Result, env_opt_u32, env_opt_u64};

/// How many times and how patiently a call is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (>= 1).
    pub max_attempts: usize,
    /// Delay before the second attempt; doubles each time.
    pub base_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Reads `LLM_MAX_RETRIES` (attempts after the first) and `LLM_RETRY_BASE_MS`.
    pub fn from_env() -> Result<Self> {
        let mut policy = Self::default();
        if let Some(retries) = env_opt_u32("LLM_MAX_RETRIES")? {
            policy.max_attempts = retries as usize + 1;
        }
        if let Some(ms) = env_opt_u64("LLM_RETRY_BASE_MS")? {
            policy.base_delay = Duration::from_millis(ms);
        }
        Ok(policy)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: usize) -> Duration {
        let exp = attempt.saturating_sub(1).min(16) as u32;
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }
}

/// Runs `call` until it succeeds, fails permanently, or the policy runs out.
///
/// `op` names the operation in logs and in the exhausted error.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, op: &'static str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0usize;
    loop {
        attempt += 1;
        match call().await {
            Ok(v) => return Ok(v),
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) if attempt >= max_attempts => {
                return Err(AiLlmError::RetriesExhausted {
                    op,
                    attempts: attempt,
                    source: Box::new(err),
                });
            }
            Err(err) => {
                let delay = policy.backoff(attempt);
                warn!(
                    op,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient provider error, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error_handler::ConfigError;

    fn fast_policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(p.backoff(1), Duration::from_millis(100));
        assert_eq!(p.backoff(2), Duration::from_millis(200));
        assert_eq!(p.backoff(3), Duration::from_millis(350));
        assert_eq!(p.backoff(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let out = with_retry(&fast_policy(3), "embed", move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AiLlmError::Timeout(Duration::from_millis(5)))
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();
        assert_eq!(out, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts_with_cause() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let err = with_retry(&fast_policy(2), "generate", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(AiLlmError::Timeout(Duration::from_millis(5)))
        })
        .await
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        match err {
            AiLlmError::RetriesExhausted { op, attempts, source } => {
                assert_eq!(op, "generate");
                assert_eq!(attempts, 2);
                assert!(matches!(*source, AiLlmError::Timeout(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let err = with_retry(&fast_policy(5), "embed", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(AiLlmError::from(ConfigError::MissingVar("GEMINI_API_KEY")))
        })
        .await
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, AiLlmError::Config(_)));
    }
}
