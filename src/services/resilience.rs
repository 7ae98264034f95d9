//! Retry, timeout and cancellation policies around an [`InferenceClient`].
//!
//! These wrap the provider call only. Parsing never sees a retry: once text
//! comes back it is handed to the parser exactly once.

use async_trait::async_trait;
use backoff::ExponentialBackoff;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::inference::{InferenceClient, ProviderError};
use crate::config::InferenceSettings;
use crate::domain::ImageReference;

/// Bounded exponential retry of transient provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; 1 disables retry.
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            current_interval: self.initial_interval,
            max_interval: self.max_interval,
            // attempts are bounded by max_attempts instead
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        }
    }
}

/// Deadline applied to each individual attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeoutPolicy {
    pub per_attempt: Option<Duration>,
}

/// Decorates a client with retry, timeout and cancellation.
#[derive(Clone)]
pub struct ResilientClient {
    inner: Arc<dyn InferenceClient>,
    retry: RetryPolicy,
    timeout: TimeoutPolicy,
    cancel: CancellationToken,
}

impl ResilientClient {
    pub fn new(inner: Arc<dyn InferenceClient>) -> Self {
        Self {
            inner,
            retry: RetryPolicy::none(),
            timeout: TimeoutPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_settings(
        inner: Arc<dyn InferenceClient>,
        settings: &InferenceSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self::new(inner)
            .with_retry(RetryPolicy {
                max_attempts: settings.retry_max_attempts.max(1),
                initial_interval: settings.retry_initial_interval,
                max_interval: settings.retry_max_interval,
            })
            .with_timeout(TimeoutPolicy {
                per_attempt: Some(Duration::from_secs(settings.timeout_seconds)),
            })
            .with_cancellation(cancel)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: TimeoutPolicy) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    async fn run<F, Fut>(&self, operation: F) -> Result<String, ProviderError>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<String, ProviderError>> + Send,
    {
        if self.cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        let attempts = AtomicU32::new(0);
        let max_attempts = self.retry.max_attempts.max(1);
        let per_attempt = self.timeout.per_attempt;

        let attempt = || {
            let current = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            let call = operation();
            async move {
                let outcome = match per_attempt {
                    Some(limit) => tokio::time::timeout(limit, call)
                        .await
                        .unwrap_or_else(|_| Err(ProviderError::Timeout(limit))),
                    None => call.await,
                };

                outcome.map_err(|err| {
                    if err.is_transient() && current < max_attempts {
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })
            }
        };

        let notify = |err: ProviderError, wait: Duration| {
            warn!(
                error = %err,
                attempt = attempts.load(Ordering::Relaxed),
                retry_in_ms = wait.as_millis() as u64,
                "Transient inference failure, retrying"
            );
        };

        tokio::select! {
            _ = self.cancel.cancelled() => {
                warn!("Inference call cancelled");
                Err(ProviderError::Cancelled)
            }
            result = backoff::future::retry_notify(self.retry.backoff(), attempt, notify) => result,
        }
    }
}

#[async_trait]
impl InferenceClient for ResilientClient {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        self.run(|| self.inner.complete(prompt)).await
    }

    async fn complete_multimodal(
        &self,
        prompt: &str,
        image: &ImageReference,
    ) -> Result<String, ProviderError> {
        self.run(|| self.inner.complete_multimodal(prompt, image))
            .await
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        self.inner.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::inference::testing::ScriptedClient;

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(2),
        }
    }

    fn upstream() -> ProviderError {
        ProviderError::Upstream {
            status: 503,
            message: "overloaded".into(),
        }
    }

    struct SlowClient(Duration);

    #[async_trait]
    impl InferenceClient for SlowClient {
        async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
            tokio::time::sleep(self.0).await;
            Ok("late".into())
        }

        async fn complete_multimodal(
            &self,
            prompt: &str,
            _image: &ImageReference,
        ) -> Result<String, ProviderError> {
            self.complete(prompt).await
        }
    }

    #[tokio::test]
    async fn no_retry_by_default() {
        let inner = Arc::new(ScriptedClient::new(vec![Err(upstream()), Ok("ok".into())]));
        let client = ResilientClient::new(inner.clone());

        assert_eq!(client.complete("p").await, Err(upstream()));
        assert_eq!(inner.call_count(), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let inner = Arc::new(ScriptedClient::new(vec![
            Err(upstream()),
            Err(ProviderError::RateLimited),
            Ok("done".into()),
        ]));
        let client = ResilientClient::new(inner.clone()).with_retry(fast_retry(3));

        assert_eq!(client.complete("p").await, Ok("done".into()));
        assert_eq!(inner.call_count(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let inner = Arc::new(ScriptedClient::failing(ProviderError::Network("reset".into())));
        let client = ResilientClient::new(inner.clone()).with_retry(fast_retry(2));

        assert_eq!(
            client.complete("p").await,
            Err(ProviderError::Network("reset".into()))
        );
        assert_eq!(inner.call_count(), 2);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let inner = Arc::new(ScriptedClient::failing(ProviderError::Unauthorized(401)));
        let client = ResilientClient::new(inner.clone()).with_retry(fast_retry(5));

        let image = ImageReference::parse("https://img.example.org/a.png").unwrap();
        assert_eq!(
            client.complete_multimodal("p", &image).await,
            Err(ProviderError::Unauthorized(401))
        );
        assert_eq!(inner.call_count(), 1);
    }

    #[tokio::test]
    async fn attempt_timeout_maps_to_provider_timeout() {
        let limit = Duration::from_millis(10);
        let client = ResilientClient::new(Arc::new(SlowClient(Duration::from_secs(5))))
            .with_timeout(TimeoutPolicy {
                per_attempt: Some(limit),
            });

        assert_eq!(client.complete("p").await, Err(ProviderError::Timeout(limit)));
    }

    #[tokio::test]
    async fn cancellation_stops_in_flight_call() {
        let token = CancellationToken::new();
        let client = ResilientClient::new(Arc::new(SlowClient(Duration::from_secs(5))))
            .with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        assert_eq!(client.complete("p").await, Err(ProviderError::Cancelled));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn already_cancelled_token_makes_no_call() {
        let token = CancellationToken::new();
        token.cancel();
        let inner = Arc::new(ScriptedClient::replying("ok"));
        let client = ResilientClient::new(inner.clone()).with_cancellation(token);

        assert_eq!(client.complete("p").await, Err(ProviderError::Cancelled));
        assert_eq!(inner.call_count(), 0);
    }
}
