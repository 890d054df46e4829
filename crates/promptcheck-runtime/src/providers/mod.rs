//! LLM backend abstractions for promptcheck-runtime.
//!
//! Two traits sit at this seam:
//! - [`LlmBackend`] is one provider integration, addressed by model name.
//! - [`LlmClient`] is what the rest of the runtime talks to, addressed by
//!   [`LlmType`]. [`ProviderRegistry`] routes an `LlmClient` call to the
//!   backend registered for its provider; the cache and resilience layers
//!   wrap any `LlmClient` and expose the same interface.
//!
//! ## Security
//!
//! Provider credentials go through the [`secrets`] module.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use promptcheck_core::LlmType;

use crate::RuntimeError;

mod factory;
pub mod secrets;

#[cfg(feature = "openai")]
mod openai;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "openai")]
pub use openai::{OpenAiBackend, OpenAiBackendFactory, OPENAI_API_KEY_ENV, OPENAI_PROVIDER};

/// Errors from LLM providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Operation not supported: {0}")]
    Unsupported(String),
}

impl ProviderError {
    /// Errors worth retrying at the boundary.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::HttpError(_) | ProviderError::RateLimited { .. } | ProviderError::Timeout(_)
        )
    }
}

/// One provider integration.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Run a single-turn prompt and return `variations` independent
    /// completions. In JSON mode the provider is asked for a JSON object.
    async fn execute_llm(
        &self,
        model: &str,
        prompt: &str,
        variations: usize,
        json_mode: bool,
    ) -> Result<Vec<String>, ProviderError>;

    /// Embed `text`, optionally truncated to `dimensions`.
    async fn generate_embedding(
        &self,
        _model: &str,
        _text: &str,
        _dimensions: Option<u32>,
    ) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::Unsupported(format!(
            "{} does not generate embeddings",
            self.name()
        )))
    }

    /// Provider name for logs.
    fn name(&self) -> &str;
}

/// Backend access keyed by [`LlmType`].
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn execute_llm(
        &self,
        llm_type: &LlmType,
        prompt: &str,
        variations: usize,
        json_mode: bool,
    ) -> Result<Vec<String>, RuntimeError>;

    async fn generate_embedding(
        &self,
        llm_type: &LlmType,
        text: &str,
        dimensions: Option<u32>,
    ) -> Result<Vec<f32>, RuntimeError>;
}

#[async_trait]
impl<C: LlmClient + ?Sized> LlmClient for Arc<C> {
    async fn execute_llm(
        &self,
        llm_type: &LlmType,
        prompt: &str,
        variations: usize,
        json_mode: bool,
    ) -> Result<Vec<String>, RuntimeError> {
        (**self)
            .execute_llm(llm_type, prompt, variations, json_mode)
            .await
    }

    async fn generate_embedding(
        &self,
        llm_type: &LlmType,
        text: &str,
        dimensions: Option<u32>,
    ) -> Result<Vec<f32>, RuntimeError> {
        (**self).generate_embedding(llm_type, text, dimensions).await
    }
}
