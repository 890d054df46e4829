//! Persistent response cache for promptcheck-runtime.
//!
//! [`CachingClient`] wraps any [`LlmClient`] and memoises completions and
//! embeddings on disk, one JSON file per distinct request:
//!
//! ```text
//! <root>/llmexecute/<provider>/<model>/<sha256>.prompt
//! <root>/embedding/<provider>/<model>/<sha256>.prompt
//! ```
//!
//! The fingerprint is the hex SHA-256 of the compact JSON of the request
//! parameters (`{"prompt","resultVariations","returnJson"}` or
//! `{"text","dimensions"}`). Entries never expire; a hit is returned
//! verbatim. An optional in-memory `moka` front saves re-reading files
//! within one process.

use async_trait::async_trait;
use moka::future::Cache;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

use promptcheck_core::LlmType;

use crate::providers::LlmClient;
use crate::RuntimeError;

/// Errors from the on-disk cache. Always fatal to the call.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O failed at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cache entry (de)serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Directory holding the `llmexecute/` and `embedding/` partitions
    pub root: PathBuf,

    /// Entries held in memory in front of the disk; 0 disables the front
    pub memory_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: PathBuf::from("llm-cache"),
            memory_capacity: 1_000,
        }
    }
}

/// Hit/miss counters since the client was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Clone, Copy)]
enum Namespace {
    Execute,
    Embedding,
}

impl Namespace {
    fn dir(self) -> &'static str {
        match self {
            Namespace::Execute => "llmexecute",
            Namespace::Embedding => "embedding",
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PromptKey<'a> {
    prompt: &'a str,
    result_variations: usize,
    return_json: bool,
}

#[derive(Serialize)]
struct EmbeddingKey<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptEntry {
    prompt: String,
    result_variations: usize,
    return_json: bool,
    responses: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EmbeddingEntry {
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
    embeddings: Vec<f32>,
}

#[derive(Clone)]
enum Cached {
    Responses(Arc<[String]>),
    Embedding(Arc<[f32]>),
}

/// Disk-backed memoising [`LlmClient`].
pub struct CachingClient<C> {
    inner: C,
    root: PathBuf,
    memory: Option<Cache<PathBuf, Cached>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<C: LlmClient> CachingClient<C> {
    /// Cache under `root` with the default memory front.
    pub fn new(inner: C, root: impl Into<PathBuf>) -> Self {
        Self::with_config(
            inner,
            &CacheConfig {
                root: root.into(),
                ..CacheConfig::default()
            },
        )
    }

    pub fn with_config(inner: C, config: &CacheConfig) -> Self {
        let memory = (config.memory_capacity > 0)
            .then(|| Cache::builder().max_capacity(config.memory_capacity).build());

        Self {
            inner,
            root: config.root.clone(),
            memory,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn entry_path(&self, namespace: Namespace, llm_type: &LlmType, key: &str) -> PathBuf {
        self.root
            .join(namespace.dir())
            .join(path_component(&llm_type.provider))
            .join(path_component(&llm_type.model))
            .join(format!("{}.prompt", key))
    }

    async fn remembered(&self, path: &Path) -> Option<Cached> {
        match &self.memory {
            Some(memory) => memory.get(path).await,
            None => None,
        }
    }

    async fn remember(&self, path: PathBuf, value: Cached) {
        if let Some(memory) = &self.memory {
            memory.insert(path, value).await;
        }
    }

    fn hit(&self, llm_type: &LlmType, key: &str) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(llm = %llm_type, key, "Cache hit");
    }

    fn miss(&self, llm_type: &LlmType, key: &str) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(llm = %llm_type, key, "Cache miss");
    }
}

#[async_trait]
impl<C: LlmClient> LlmClient for CachingClient<C> {
    async fn execute_llm(
        &self,
        llm_type: &LlmType,
        prompt: &str,
        variations: usize,
        json_mode: bool,
    ) -> Result<Vec<String>, RuntimeError> {
        let key = fingerprint(&PromptKey {
            prompt,
            result_variations: variations,
            return_json: json_mode,
        })?;
        let path = self.entry_path(Namespace::Execute, llm_type, &key);

        if let Some(Cached::Responses(responses)) = self.remembered(&path).await {
            self.hit(llm_type, &key);
            return Ok(responses.to_vec());
        }

        if let Some(entry) = read_entry::<PromptEntry>(&path).await? {
            self.hit(llm_type, &key);
            self.remember(path, Cached::Responses(entry.responses.clone().into()))
                .await;
            return Ok(entry.responses);
        }

        self.miss(llm_type, &key);
        let responses = self
            .inner
            .execute_llm(llm_type, prompt, variations, json_mode)
            .await?;

        let entry = PromptEntry {
            prompt: prompt.to_string(),
            result_variations: variations,
            return_json: json_mode,
            responses,
        };
        write_entry(&path, &entry).await?;
        self.remember(path, Cached::Responses(entry.responses.clone().into()))
            .await;
        Ok(entry.responses)
    }

    async fn generate_embedding(
        &self,
        llm_type: &LlmType,
        text: &str,
        dimensions: Option<u32>,
    ) -> Result<Vec<f32>, RuntimeError> {
        let key = fingerprint(&EmbeddingKey { text, dimensions })?;
        let path = self.entry_path(Namespace::Embedding, llm_type, &key);

        if let Some(Cached::Embedding(embedding)) = self.remembered(&path).await {
            self.hit(llm_type, &key);
            return Ok(embedding.to_vec());
        }

        if let Some(entry) = read_entry::<EmbeddingEntry>(&path).await? {
            self.hit(llm_type, &key);
            self.remember(path, Cached::Embedding(entry.embeddings.clone().into()))
                .await;
            return Ok(entry.embeddings);
        }

        self.miss(llm_type, &key);
        let embeddings = self
            .inner
            .generate_embedding(llm_type, text, dimensions)
            .await?;

        let entry = EmbeddingEntry {
            text: text.to_string(),
            dimensions,
            embeddings,
        };
        write_entry(&path, &entry).await?;
        self.remember(path, Cached::Embedding(entry.embeddings.clone().into()))
            .await;
        Ok(entry.embeddings)
    }
}

fn fingerprint<K: Serialize>(key: &K) -> Result<String, CacheError> {
    let json = serde_json::to_vec(key)?;
    Ok(hex::encode(Sha256::digest(&json)))
}

/// Encode a provider or model name as one directory level.
///
/// The mapping is injective: `%`, path separators, `:` and NUL are
/// percent-encoded, and names made only of dots are encoded whole, so two
/// distinct names never share a partition. Common names pass through.
fn path_component(raw: &str) -> String {
    if raw.is_empty() {
        return "%".to_string();
    }
    if raw.chars().all(|c| c == '.') {
        return "%2E".repeat(raw.len());
    }

    let mut encoded = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' | '/' | '\\' | ':' | '\0' => encoded.push_str(&format!("%{:02X}", c as u32)),
            c => encoded.push(c),
        }
    }
    encoded
}

async fn read_entry<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CacheError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(CacheError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write through a unique temp file and rename, so readers never see a
/// partial entry.
async fn write_entry<T: Serialize>(path: &Path, entry: &T) -> Result<(), CacheError> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| CacheError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
    }

    let bytes = serde_json::to_vec_pretty(entry)?;
    let temp = path.with_extension(format!(
        "{}.{}.tmp",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    tokio::fs::write(&temp, &bytes)
        .await
        .map_err(|source| CacheError::Io {
            path: temp.clone(),
            source,
        })?;

    if let Err(source) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(CacheError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}
