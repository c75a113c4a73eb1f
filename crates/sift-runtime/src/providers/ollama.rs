//! Ollama chat provider.
//!
//! Talks to a local or proxied Ollama server through `POST /api/chat` with
//! streaming disabled. An API key is optional; when present it is sent as a
//! bearer token for proxies that require one.

use super::{
    factory::ProviderFactory,
    secrets::{ApiCredential, CredentialSource},
    ChatMessage, Completion, CompletionConfig, LlmProvider, ProviderError, TokenUsage,
    SIFT_API_KEY_ENV,
};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default Ollama endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

const CREDENTIAL_NAME: &str = "Ollama proxy key";

pub struct OllamaProvider {
    credential: Option<ApiCredential>,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OllamaProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl OllamaProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            credential: None,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Server and key from the `provider` section; the key falls back to
    /// `SIFT_API_KEY`.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let mut provider = Self::new(&config.base_url)?;
        provider.credential =
            ApiCredential::resolve(config.api_key.as_deref(), SIFT_API_KEY_ENV, CREDENTIAL_NAME);
        Ok(provider)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.credential = Some(ApiCredential::new(
            key,
            CredentialSource::Programmatic,
            CREDENTIAL_NAME,
        ));
        self
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credential {
            Some(cred) => builder.bearer_auth(cred.expose()),
            None => builder,
        }
    }
}

/// Ollama chat request.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama chat response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    message: ChatMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl From<ChatResponse> for Completion {
    fn from(body: ChatResponse) -> Self {
        Completion {
            text: body.message.content,
            usage: TokenUsage {
                prompt_tokens: body.prompt_eval_count,
                completion_tokens: body.eval_count,
            },
            model: body.model,
            done_reason: body.done_reason,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &CompletionConfig,
    ) -> Result<Completion, ProviderError> {
        let request = ChatRequest {
            model: &config.model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: config.temperature,
                num_predict: config.max_tokens,
            },
        };

        let response = self
            .request(self.client.post(format!("{}/api/chat", self.base_url)))
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(config.timeout)
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        let status = response.status();

        if status == 401 || status == 403 {
            return Err(ProviderError::Unauthorized);
        }

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(body.into())
    }

    async fn health_check(&self) -> bool {
        match self
            .request(self.client.get(format!("{}/api/tags", self.base_url)))
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(error = %e, base_url = %self.base_url, "Ollama health check failed");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Builds [`OllamaProvider`]s for `provider.kind: ollama`.
pub struct OllamaProviderFactory;

impl ProviderFactory for OllamaProviderFactory {
    fn kind(&self) -> &'static str {
        "ollama"
    }

    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        Ok(Arc::new(OllamaProvider::from_config(config)?))
    }

    fn validate(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
        let url = config.base_url.as_str();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ProviderError::NotConfigured(format!(
                "base_url must start with http:// or https://, got '{}'",
                url
            )));
        }
        if config.model.trim().is_empty() {
            return Err(ProviderError::NotConfigured(
                "ollama provider needs a model name".to_string(),
            ));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Ollama local model server"
    }
}
