//! Bounded retries for single remote calls.

use std::{future::Future, time::Duration};

use crate::{error::NodeError, metrics::HEIGHT_QUERY_RETRIES};

/// How often and how patiently a call is retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub attempts: u32,
    /// Pause between two attempts.
    pub delay: Duration,
    /// Deadline of each individual attempt.
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    /// Policy used for latest-height queries.
    pub const HEIGHT_QUERY: Self = Self {
        attempts: 5,
        delay: Duration::from_secs(1),
        attempt_timeout: Duration::from_secs(5),
    };

    /// Upper bound on the time [`retry`] can take under this policy.
    #[must_use]
    pub fn worst_case(&self) -> Duration {
        let attempts = self.attempts.max(1);
        (self.attempt_timeout + self.delay) * attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::HEIGHT_QUERY
    }
}

/// Runs `op` until it succeeds or the policy's attempts are used up.
///
/// `on_retry` is invoked after every failed attempt with the 1-based attempt
/// number, the configured maximum and the error. Errors that
/// [`NodeError::is_retryable`] rejects end the loop at once; otherwise the last
/// error is returned when every attempt fails. An attempt that outlives
/// [`RetryPolicy::attempt_timeout`] fails with [`NodeError::Timeout`].
///
/// # Errors
/// Returns the error of the final attempt.
pub async fn retry<T, F, Fut, R>(policy: RetryPolicy, mut on_retry: R, mut op: F) -> Result<T, NodeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NodeError>>,
    R: FnMut(u32, u32, &NodeError),
{
    let max_attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = match tokio::time::timeout(policy.attempt_timeout, op()).await {
            Ok(result) => result,
            Err(_) => Err(NodeError::Timeout(policy.attempt_timeout)),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(err) => {
                on_retry(attempt, max_attempts, &err);
                if attempt >= max_attempts || !err.is_retryable() {
                    return Err(err);
                }
            }
        }

        attempt += 1;
        tokio::time::sleep(policy.delay).await;
    }
}

/// Retry callback of latest-height queries against `provider`: logs the
/// attempt and counts it.
pub(crate) fn log_height_query_retry(provider: &str) -> impl FnMut(u32, u32, &NodeError) + '_ {
    move |attempt, max_attempts, err: &NodeError| {
        tracing::info!(provider, attempt, max_attempts, %err, "failed to query latest height");
        HEIGHT_QUERY_RETRIES.with_label_values(&[provider]).inc();
    }
}
