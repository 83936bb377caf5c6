//! Retry with exponential backoff around any model client.

use crate::client::{Completion, ModelClient};
use crate::error::ModelCallError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// How many times to call and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay unit; doubled after each failed attempt.
    pub multiplier_ms: u64,
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier_ms: 1_000,
            min_backoff_ms: 2_000,
            max_backoff_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// Retries without waiting. Useful in tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            multiplier_ms: 0,
            min_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    /// Delay after the given failed attempt (0-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let ceiling = self.max_backoff_ms.max(self.min_backoff_ms);
        let delay_ms = self
            .multiplier_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .clamp(self.min_backoff_ms, ceiling);
        Duration::from_millis(delay_ms)
    }
}

/// Wraps a client and retries its retryable failures.
///
/// Non-retryable errors are returned straight away. When every attempt
/// fails, the last error is wrapped in `ModelCallError::Exhausted`.
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: ModelClient> RetryingClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: ModelClient> ModelClient for RetryingClient<C> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_input: &str,
    ) -> Result<Completion, ModelCallError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            match self.inner.complete(system_prompt, user_input).await {
                Ok(completion) => {
                    if attempt > 0 {
                        info!(
                            client = self.inner.name(),
                            attempt = attempt + 1,
                            "Model call recovered after retries"
                        );
                    }
                    return Ok(completion);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_attempts {
                        return Err(ModelCallError::Exhausted {
                            attempts: max_attempts,
                            last: Box::new(e),
                        });
                    }

                    let delay = self.policy.backoff_delay(attempt - 1);
                    warn!(
                        client = self.inner.name(),
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Model call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedClient;

    fn unavailable() -> ModelCallError {
        ModelCallError::Status {
            status: 503,
            body: "busy".to_string(),
        }
    }

    #[test]
    fn test_backoff_is_clamped_exponential() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(8));
        assert_eq!(policy.backoff_delay(4), Duration::from_secs(10));
        assert_eq!(policy.backoff_delay(40), Duration::from_secs(10));
    }

    #[test]
    fn test_inverted_bounds_do_not_panic() {
        let policy = RetryPolicy {
            max_attempts: 2,
            multiplier_ms: 1,
            min_backoff_ms: 50,
            max_backoff_ms: 10,
        };
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let scripted = ScriptedClient::new()
            .with_failure(unavailable())
            .with_failure(unavailable())
            .with_reply("done");
        let client = RetryingClient::new(scripted, RetryPolicy::immediate(3));

        let completion = client.complete("s", "u").await.unwrap();
        assert_eq!(completion.text, "done");
        assert_eq!(client.inner().calls().len(), 3);
    }

    #[tokio::test]
    async fn test_exhausts_after_max_attempts() {
        let scripted = ScriptedClient::new()
            .with_failure(unavailable())
            .with_failure(unavailable())
            .with_failure(unavailable())
            .with_reply("never reached");
        let client = RetryingClient::new(scripted, RetryPolicy::immediate(3));

        let err = client.complete("s", "u").await.unwrap_err();
        match err {
            ModelCallError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last, ModelCallError::Status { status: 503, .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(client.inner().calls().len(), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let scripted = ScriptedClient::new()
            .with_failure(ModelCallError::Status {
                status: 401,
                body: "bad key".to_string(),
            })
            .with_reply("never reached");
        let client = RetryingClient::new(scripted, RetryPolicy::immediate(3));

        let err = client.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, ModelCallError::Status { status: 401, .. }));
        assert_eq!(client.inner().calls().len(), 1);
    }
}
