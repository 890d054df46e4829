//! OpenAI chat completions and embeddings backend.
//!
//! ## Security
//!
//! The API key is held in an [`ApiCredential`] and only exposed when the
//! bearer header is set. See the [`secrets`](super::secrets) module.

use super::{
    factory::ProviderFactory,
    secrets::{ApiCredential, CredentialSource},
    LlmBackend, ProviderError,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

/// Provider id used in `LlmType.provider` for this backend.
pub const OPENAI_PROVIDER: &str = "openAI";

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAiBackend {
    credential: ApiCredential,
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiBackend {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_credential(ApiCredential::new(
            api_key,
            CredentialSource::Programmatic,
            "OpenAI API key",
        ))
    }

    /// Reads `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_env(OPENAI_API_KEY_ENV, "OpenAI API key")?;
        Ok(Self::with_credential(credential))
    }

    /// Build from a provider config block:
    ///
    /// ```json
    /// { "api_key": "sk-...", "base_url": "https://...", "timeout_secs": 120 }
    /// ```
    ///
    /// Every field is optional; `api_key` falls back to `OPENAI_API_KEY`.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_config_or_env(
            config,
            "api_key",
            OPENAI_API_KEY_ENV,
            "OpenAI API key",
        )?;
        if credential.is_empty() {
            return Err(ProviderError::NotConfigured(
                "OpenAI API key is empty".to_string(),
            ));
        }
        tracing::debug!(source = %credential.source(), "OpenAI credential loaded");

        let mut backend = Self::with_credential(credential);
        if let Some(url) = config["base_url"].as_str() {
            backend.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = config["timeout_secs"].as_u64() {
            backend.timeout = Duration::from_secs(secs);
        }
        Ok(backend)
    }

    fn with_credential(credential: ApiCredential) -> Self {
        Self {
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Resp, ProviderError> {
        // SECURITY: the key is exposed only for the header
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(self.credential.expose())
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if status == 401 {
            return Err(ProviderError::AuthError);
        }

        if !status.is_success() {
            let message = match response.json::<OpenAiError>().await {
                Ok(body) => body.error.message,
                Err(e) => e.to_string(),
            };
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    n: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    type_: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

fn chat_request<'a>(model: &'a str, prompt: &'a str, variations: usize, json_mode: bool) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![ChatMessage {
            role: "user",
            content: prompt,
        }],
        temperature: 1.0,
        top_p: 1.0,
        frequency_penalty: 0.0,
        presence_penalty: 0.0,
        n: variations,
        response_format: json_mode.then_some(ResponseFormat {
            type_: "json_object",
        }),
    }
}

fn choice_contents(response: ChatResponse) -> Vec<String> {
    response
        .choices
        .into_iter()
        .filter_map(|choice| choice.message.content)
        .collect()
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn execute_llm(
        &self,
        model: &str,
        prompt: &str,
        variations: usize,
        json_mode: bool,
    ) -> Result<Vec<String>, ProviderError> {
        tracing::debug!(model, variations, json_mode, "OpenAI chat completion");
        let request = chat_request(model, prompt, variations, json_mode);
        let response: ChatResponse = self.post("chat/completions", &request).await?;
        Ok(choice_contents(response))
    }

    async fn generate_embedding(
        &self,
        model: &str,
        text: &str,
        dimensions: Option<u32>,
    ) -> Result<Vec<f32>, ProviderError> {
        tracing::debug!(model, ?dimensions, "OpenAI embedding");
        let request = EmbeddingRequest {
            model,
            input: text,
            dimensions,
        };
        let response: EmbeddingResponse = self.post("embeddings", &request).await?;
        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::ParseError("embedding response has no data".to_string()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Builds [`OpenAiBackend`]s for the `openAI` provider id.
pub struct OpenAiBackendFactory;

impl ProviderFactory for OpenAiBackendFactory {
    fn provider_type(&self) -> &'static str {
        OPENAI_PROVIDER
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmBackend>, ProviderError> {
        Ok(Arc::new(OpenAiBackend::from_config(config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        if !ApiCredential::is_available(config, "api_key", OPENAI_API_KEY_ENV) {
            return Err(ProviderError::NotConfigured(format!(
                "OpenAI API key required: set 'api_key' in config or {} env",
                OPENAI_API_KEY_ENV
            )));
        }

        if let Some(url) = config["base_url"].as_str() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ProviderError::NotConfigured(
                    "base_url must start with http:// or https://".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn description(&self) -> &'static str {
        "OpenAI chat completions and embeddings"
    }
}
