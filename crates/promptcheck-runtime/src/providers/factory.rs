//! Provider registry and factories.
//!
//! A [`ProviderRegistry`] maps provider ids (the `provider` half of an
//! [`LlmType`]) to live backends. Backends are either registered directly
//! or built by a [`ProviderFactory`] from a JSON config block:
//!
//! ```ignore
//! let mut registry = ProviderRegistry::with_defaults();
//! registry.configure("openAI", &serde_json::json!({}))?;
//! let replies = registry.execute_llm(&llm_type, "Say hi", 3, false).await?;
//! ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use promptcheck_core::LlmType;

use super::{LlmBackend, LlmClient, ProviderError};
use crate::RuntimeError;

/// Builds a backend from provider-specific configuration.
pub trait ProviderFactory: Send + Sync {
    /// Factory key, e.g. `"openAI"`.
    fn provider_type(&self) -> &'static str;

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmBackend>, ProviderError>;

    /// Cheap config check, no network.
    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError>;

    fn description(&self) -> &'static str {
        "LLM Provider"
    }
}

/// Routes [`LlmClient`] calls to the backend registered for each provider.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, Arc<dyn ProviderFactory>>,
    backends: BTreeMap<String, Arc<dyn LlmBackend>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live backend under `provider_id`, replacing any existing one.
    pub fn register(&mut self, provider_id: impl Into<String>, backend: Arc<dyn LlmBackend>) {
        self.backends.insert(provider_id.into(), backend);
    }

    /// Register a factory, replacing one with the same type.
    pub fn register_factory(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories
            .insert(factory.provider_type().to_string(), factory);
    }

    /// Build a backend for `provider_id` from its config block.
    ///
    /// The factory is chosen by the block's `type` field, falling back to
    /// the provider id itself.
    pub fn configure(&mut self, provider_id: &str, config: &JsonValue) -> Result<(), ProviderError> {
        let factory_type = config["type"].as_str().unwrap_or(provider_id);
        let factory = self.factories.get(factory_type).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Unknown provider type: '{}'. Available: {:?}",
                factory_type,
                self.factory_types()
            ))
        })?;

        factory.validate_config(config)?;
        let backend = factory.create(config)?;
        tracing::debug!(
            provider = provider_id,
            backend = backend.name(),
            kind = factory.description(),
            "Configured provider"
        );
        self.backends.insert(provider_id.to_string(), backend);
        Ok(())
    }

    /// The backend registered for `provider_id`.
    pub fn backend(&self, provider_id: &str) -> Result<Arc<dyn LlmBackend>, ProviderError> {
        self.backends.get(provider_id).cloned().ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "No backend for provider '{}'. Available: {:?}",
                provider_id,
                self.available_providers()
            ))
        })
    }

    /// Provider ids with a live backend.
    pub fn available_providers(&self) -> Vec<&str> {
        self.backends.keys().map(|s| s.as_str()).collect()
    }

    pub fn factory_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    pub fn has_provider(&self, provider_id: &str) -> bool {
        self.backends.contains_key(provider_id)
    }

    /// Registry with every built-in factory registered.
    #[cfg(feature = "openai")]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_factory(Arc::new(super::OpenAiBackendFactory));
        registry
    }

    /// Registry with every built-in factory registered.
    #[cfg(not(feature = "openai"))]
    pub fn with_defaults() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for ProviderRegistry {
    async fn execute_llm(
        &self,
        llm_type: &LlmType,
        prompt: &str,
        variations: usize,
        json_mode: bool,
    ) -> Result<Vec<String>, RuntimeError> {
        let backend = self.backend(&llm_type.provider)?;
        Ok(backend
            .execute_llm(&llm_type.model, prompt, variations, json_mode)
            .await?)
    }

    async fn generate_embedding(
        &self,
        llm_type: &LlmType,
        text: &str,
        dimensions: Option<u32>,
    ) -> Result<Vec<f32>, RuntimeError> {
        let backend = self.backend(&llm_type.provider)?;
        Ok(backend
            .generate_embedding(&llm_type.model, text, dimensions)
            .await?)
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("factories", &self.factory_types())
            .field("providers", &self.available_providers())
            .finish()
    }
}
