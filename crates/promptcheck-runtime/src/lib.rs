//! # promptcheck-runtime
//!
//! Backend-facing half of promptcheck.
//!
//! This crate runs prompts against LLM backends and evaluates the sampled
//! responses with the checks from `promptcheck-core`:
//! - [`providers`]: the backend traits, the provider registry and the
//!   OpenAI backend (feature `openai`)
//! - [`cache`]: a persistent, content-addressed response cache
//! - [`resilience`]: opt-in timeouts and retries at the backend boundary
//! - [`evaluator`], [`feedback`], [`candidates`], [`stability`]: the prompt
//!   testing operations
//!
//! ## Example
//!
//! ```rust,ignore
//! use promptcheck_runtime::{feedback, RuntimeConfig, ProviderRegistry};
//!
//! let config = RuntimeConfig::from_yaml_file("promptcheck.yaml")?;
//! let client = config.build_client(ProviderRegistry::with_defaults())?;
//!
//! let report = feedback::generate_feedback(
//!     client.as_ref(),
//!     &"openAI/gpt-4o-mini".parse()?,
//!     &suite.prompt,
//!     5,
//!     &suite.variables,
//!     &suite.tests,
//! )
//! .await?;
//! ```

use thiserror::Error;

pub mod cache;
pub mod candidates;
pub mod config;
pub mod evaluator;
pub mod feedback;
pub mod prompts;
pub mod providers;
pub mod resilience;
pub mod stability;
pub mod verdict;

pub use cache::{CacheConfig, CacheError, CacheStats, CachingClient};
pub use candidates::propose_candidates;
pub use config::RuntimeConfig;
pub use evaluator::{evaluate_all, evaluate_one};
pub use feedback::{execute_prompt, generate_feedback, test_response};
pub use providers::{LlmBackend, LlmClient, ProviderError, ProviderFactory, ProviderRegistry};
pub use resilience::{ResiliencePolicy, ResilientClient};
pub use stability::calculate_stability;

/// Errors from the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Malformed model reply: {0}")]
    Parse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RuntimeError {
    /// Whether a retry might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RuntimeError::Provider(e) if e.is_transient())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted backend shared by the operation tests.

    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use promptcheck_core::LlmType;

    use crate::providers::{LlmClient, ProviderError};
    use crate::RuntimeError;

    /// Answers completions from a prompt-substring script and embeddings
    /// from a text-keyed table. Records every completion prompt.
    #[derive(Default)]
    pub struct ScriptedClient {
        pub completions: Vec<(String, Vec<String>)>,
        pub embeddings: HashMap<String, Vec<f32>>,
        pub prompts: Mutex<Vec<String>>,
        pub calls: AtomicUsize,
    }

    impl ScriptedClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Reply with `replies` to any prompt containing `needle`.
        pub fn on(mut self, needle: &str, replies: &[&str]) -> Self {
            self.completions.push((
                needle.to_string(),
                replies.iter().map(|r| r.to_string()).collect(),
            ));
            self
        }

        pub fn embed(mut self, text: &str, vector: &[f32]) -> Self {
            self.embeddings.insert(text.to_string(), vector.to_vec());
            self
        }

        pub fn recorded_prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn execute_llm(
            &self,
            _llm_type: &LlmType,
            prompt: &str,
            variations: usize,
            _json_mode: bool,
        ) -> Result<Vec<String>, RuntimeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());

            let (_, replies) = self
                .completions
                .iter()
                .find(|(needle, _)| prompt.contains(needle.as_str()))
                .ok_or_else(|| ProviderError::ApiError {
                    status: 404,
                    message: format!("no scripted reply for: {}", prompt),
                })?;
            Ok(replies.iter().take(variations).cloned().collect())
        }

        async fn generate_embedding(
            &self,
            _llm_type: &LlmType,
            text: &str,
            _dimensions: Option<u32>,
        ) -> Result<Vec<f32>, RuntimeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.embeddings
                .get(text)
                .cloned()
                .ok_or_else(|| ProviderError::Unsupported(format!("no embedding for: {}", text)).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_transient_errors() {
        let transient: RuntimeError = ProviderError::Timeout(Duration::from_secs(1)).into();
        assert!(transient.is_transient());

        assert!(!RuntimeError::Parse("bad".to_string()).is_transient());
        assert!(!RuntimeError::from(ProviderError::AuthError).is_transient());
    }

    #[test]
    fn test_provider_errors_display_unchanged() {
        let err: RuntimeError = ProviderError::NotConfigured("openAI".to_string()).into();
        assert_eq!(err.to_string(), "Provider not configured: openAI");
    }
}
