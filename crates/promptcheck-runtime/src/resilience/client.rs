//! Timeout and retry decorator for any [`LlmClient`].

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::future::Future;

use promptcheck_core::LlmType;

use super::ResiliencePolicy;
use crate::providers::{LlmClient, ProviderError};
use crate::RuntimeError;

/// Applies a [`ResiliencePolicy`] to every call of the wrapped client.
///
/// Only transient errors (`HttpError`, `RateLimited`, `Timeout`) are retried.
pub struct ResilientClient<C> {
    inner: C,
    policy: ResiliencePolicy,
}

impl<C: LlmClient> ResilientClient<C> {
    pub fn new(inner: C, policy: ResiliencePolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &ResiliencePolicy {
        &self.policy
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.policy.initial_backoff)
            .with_max_times(self.policy.max_retries)
            .with_jitter()
    }

    async fn attempt<T, F>(&self, call: F) -> Result<T, RuntimeError>
    where
        F: Future<Output = Result<T, RuntimeError>>,
    {
        match self.policy.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| RuntimeError::from(ProviderError::Timeout(limit)))?,
            None => call.await,
        }
    }
}

#[async_trait]
impl<C: LlmClient> LlmClient for ResilientClient<C> {
    async fn execute_llm(
        &self,
        llm_type: &LlmType,
        prompt: &str,
        variations: usize,
        json_mode: bool,
    ) -> Result<Vec<String>, RuntimeError> {
        let this = self;
        (move || async move {
            this.attempt(this.inner.execute_llm(llm_type, prompt, variations, json_mode))
                .await
        })
        .retry(self.backoff())
        .when(RuntimeError::is_transient)
        .notify(|err, delay| {
            tracing::warn!(llm = %llm_type, error = %err, ?delay, "Retrying completion");
        })
        .await
    }

    async fn generate_embedding(
        &self,
        llm_type: &LlmType,
        text: &str,
        dimensions: Option<u32>,
    ) -> Result<Vec<f32>, RuntimeError> {
        let this = self;
        (move || async move {
            this.attempt(this.inner.generate_embedding(llm_type, text, dimensions))
                .await
        })
        .retry(self.backoff())
        .when(RuntimeError::is_transient)
        .notify(|err, delay| {
            tracing::warn!(llm = %llm_type, error = %err, ?delay, "Retrying embedding");
        })
        .await
    }
}
