//! Runtime configuration.
//!
//! ```yaml
//! cache:
//!   enabled: true
//!   root: llm-cache
//!   memory_capacity: 1000
//! resilience:
//!   timeout: 30s
//!   max_retries: 2
//!   initial_backoff: 500ms
//! providers:
//!   openAI:
//!     api_key: sk-...        # optional, falls back to OPENAI_API_KEY
//! ```
//!
//! Every section is optional.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::cache::{CacheConfig, CachingClient};
use crate::providers::{LlmClient, ProviderRegistry};
use crate::resilience::{ResiliencePolicy, ResilientClient};
use crate::RuntimeError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub cache: CacheConfig,
    pub resilience: ResiliencePolicy,

    /// Provider id to provider config block
    pub providers: BTreeMap<String, JsonValue>,
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, RuntimeError> {
        serde_yaml::from_str(yaml).map_err(|e| RuntimeError::Config(e.to_string()))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RuntimeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&contents)
    }

    /// Build a backend for every configured provider.
    pub fn configure_providers(&self, registry: &mut ProviderRegistry) -> Result<(), RuntimeError> {
        for (provider_id, block) in &self.providers {
            registry.configure(provider_id, block)?;
        }
        Ok(())
    }

    /// Compose registry, resilience and cache into one client.
    ///
    /// The cache is outermost so hits never touch the resilience layer.
    pub fn build_client(&self, mut registry: ProviderRegistry) -> Result<Arc<dyn LlmClient>, RuntimeError> {
        self.configure_providers(&mut registry)?;
        tracing::debug!(?registry, "Provider registry ready");

        let mut client: Arc<dyn LlmClient> = Arc::new(registry);
        if self.resilience.is_enabled() {
            client = Arc::new(ResilientClient::new(client, self.resilience.clone()));
        }
        if self.cache.enabled {
            client = Arc::new(CachingClient::with_config(client, &self.cache));
        }

        tracing::info!(
            cache = self.cache.enabled,
            cache_root = %self.cache.root.display(),
            retries = self.resilience.max_retries,
            timeout = ?self.resilience.timeout,
            "LLM client configured"
        );
        Ok(client)
    }
}
