//! Activity invocation with per-call timeouts and bounded retry.

use crate::collaborators::ActivityError;
use crate::error::StewardCoreError;
use log::warn;
use std::future::Future;
use std::time::Duration;
use steward_rs_config::RetryConfig;
use tokio::time::{sleep, timeout};

/// Wraps every external call with a timeout and a retry policy.
///
/// Transient failures (including timeouts) are retried with exponential
/// backoff up to a fixed attempt ceiling; terminal failures propagate
/// immediately. The retry ceiling is deliberate policy: an activity that
/// keeps failing surfaces as a job failure instead of looping forever.
#[derive(Debug, Clone)]
pub struct ActivityInvoker {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl ActivityInvoker {
    /// Build an invoker from the configured retry policy.
    pub fn new(retry: &RetryConfig) -> Self {
        Self {
            max_attempts: retry.max_attempts.max(1),
            base_delay: retry.base_delay(),
            max_delay: retry.max_delay(),
        }
    }

    /// Invoke one activity, retrying transient failures.
    ///
    /// `op` is called once per attempt; collaborators are required to keep
    /// repeated calls idempotent-safe (see the collaborator contract).
    pub async fn invoke<T, F, Fut>(
        &self,
        name: &'static str,
        call_timeout: Duration,
        op: F,
    ) -> Result<T, StewardCoreError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ActivityError>>,
    {
        let mut attempt: u32 = 1;
        loop {
            let outcome = match timeout(call_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(ActivityError::Transient(format!(
                    "timed out after {}s",
                    call_timeout.as_secs()
                ))),
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() || attempt >= self.max_attempts {
                return Err(StewardCoreError::Activity {
                    name,
                    attempts: attempt,
                    message: err.to_string(),
                });
            }

            let delay = self.backoff_delay(attempt - 1);
            warn!(
                "activity failed, retrying (activity={}, attempt={}, retry_in_ms={}, error={})",
                name,
                attempt,
                delay.as_millis(),
                err
            );
            if !delay.is_zero() {
                sleep(delay).await;
            }
            attempt += 1;
        }
    }

    /// Exponential backoff for the given number of retries already used.
    fn backoff_delay(&self, retries_used: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        if base_ms == 0 {
            return Duration::from_millis(0);
        }
        let max_ms = self.max_delay.as_millis() as u64;
        let factor = 1u64 << retries_used.min(16);
        Duration::from_millis(base_ms.saturating_mul(factor).min(max_ms))
    }
}
