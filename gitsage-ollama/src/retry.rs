//! Retry with exponential backoff for the initial chat request.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::OllamaError;

/// How many times the initial request is attempted and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failure. Doubles after every further failure.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay to wait after the failed attempt with index `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for RetryPolicy {
    /// Three attempts with 1s, 2s, 4s backoff.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Run `attempt_fn` until it succeeds, fails with a non-retryable error, or
/// the policy's attempts are used up.
///
/// Backoff sleeps race against `cancel`; a cancellation during a sleep
/// returns [`OllamaError::Cancelled`] immediately.
pub(crate) async fn retry_request<F, Fut, T>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut attempt_fn: F,
) -> Result<T, OllamaError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, OllamaError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        let err = match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_retryable() || attempt + 1 >= max_attempts {
            return Err(err);
        }

        let delay = policy.delay(attempt);
        tracing::warn!(attempt = attempt + 1, ?delay, error = %err, "ollama request failed, retrying");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(OllamaError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}
