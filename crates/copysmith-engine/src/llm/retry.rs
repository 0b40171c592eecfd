//! Bounded retry with exponential backoff around a single backend call.

use copysmith_adapters::RetryBudget;
use copysmith_core::StageError;
use std::future::Future;
use std::time::Duration;

pub(crate) const BACKOFF_MULTIPLIER: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = BACKOFF_MULTIPLIER.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

impl From<RetryBudget> for RetryPolicy {
    fn from(budget: RetryBudget) -> Self {
        RetryPolicy::new(budget.attempts, budget.base_delay())
    }
}

/// Run `op` until it succeeds, fails with a non-transient error, or the
/// attempt budget is spent. The last error is returned unchanged.
pub async fn run_with_retry<T, F, Fut>(
    label: &str,
    policy: RetryPolicy,
    mut op: F,
) -> Result<T, StageError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, StageError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(stage = label, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                tracing::warn!(
                    stage = label,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient backend failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
