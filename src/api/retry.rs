//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::{ApiError, HistoryPage, HistoryRequest, PandasAiApi, QueryReply, QueryRequest};

/// How many times to try a backend call, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. At least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
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
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after the `failed_attempt`-th failure (1-based):
    /// `base * 2^(n-1)`, capped at `max_delay`.
    #[must_use]
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Run `op` until it succeeds, fails with an error `should_retry`
    /// rejects, or the attempt budget runs out.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        should_retry: fn(&ApiError) -> bool,
        mut op: F,
    ) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if !should_retry(&err) => return Err(err),
                Err(err) if attempt >= max_attempts => {
                    return Err(if max_attempts == 1 {
                        err
                    } else {
                        ApiError::Exhausted {
                            attempts: attempt,
                            last: Box::new(err),
                        }
                    });
                }
                Err(err) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        name: "backend.retry",
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Backend call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// A [`PandasAiApi`] that retries transient failures of another one.
///
/// History fetches retry every transient error. Query submissions retry only
/// errors after which the backend cannot have run the query.
#[derive(Debug, Clone)]
pub struct RetryingApi<A> {
    inner: A,
    policy: RetryPolicy,
}

impl<A> RetryingApi<A> {
    pub fn new(inner: A, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<A: PandasAiApi> PandasAiApi for RetryingApi<A> {
    async fn send_query(&self, request: &QueryRequest) -> Result<QueryReply, ApiError> {
        self.policy
            .run("send_query", ApiError::is_safe_to_resend, || {
                self.inner.send_query(request)
            })
            .await
    }

    async fn fetch_history(&self, request: &HistoryRequest) -> Result<HistoryPage, ApiError> {
        self.policy
            .run("fetch_history", ApiError::is_retryable, || {
                self.inner.fetch_history(request)
            })
            .await
    }
}
