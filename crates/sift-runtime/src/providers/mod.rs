//! Language model providers.
//!
//! A provider turns a list of chat messages into one completion. Screening
//! and refinement never call a provider directly: they go through
//! [`ProviderGateway`](crate::gateway::ProviderGateway), which owns budget
//! accounting.
//!
//! Providers are built by kind from the `provider` section of the runtime
//! configuration through a [`ProviderRegistry`]. Keys, when a deployment needs
//! one, are held as [`ApiCredential`] and never printed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

mod factory;
pub mod secrets;

#[cfg(feature = "ollama")]
mod ollama;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "ollama")]
pub use ollama::{OllamaProvider, OllamaProviderFactory};

/// Environment variable consulted when no API key is configured.
pub const SIFT_API_KEY_ENV: &str = "SIFT_API_KEY";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Rate limited by provider, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Provider returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Could not decode provider response: {0}")]
    Decode(String),

    #[error("Provider rejected the credentials")]
    Unauthorized,

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Unknown provider kind '{kind}', available: {available:?}")]
    UnknownKind { kind: String, available: Vec<String> },
}

/// Per-request generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionConfig {
    pub model: String,

    /// Upper bound on generated tokens
    pub max_tokens: u32,

    /// 0.0 keeps screening answers reproducible
    pub temperature: f32,

    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "mixtral:latest".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// One finished completion.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,

    /// Model that actually answered, as reported by the provider
    pub model: String,

    /// Why generation stopped, when the provider says
    pub done_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &CompletionConfig,
    ) -> Result<Completion, ProviderError>;

    /// Whether the backend answers at all. Used for a startup warning only.
    async fn health_check(&self) -> bool;

    fn name(&self) -> &str;

    /// Rough prompt size used for budget checks before a call.
    fn estimate_tokens(&self, messages: &[ChatMessage]) -> u32 {
        let chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();
        u32::try_from(chars.div_ceil(4)).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    #[async_trait]
    impl LlmProvider for Silent {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _config: &CompletionConfig,
        ) -> Result<Completion, ProviderError> {
            Err(ProviderError::Transport("offline".to_string()))
        }

        async fn health_check(&self) -> bool {
            false
        }

        fn name(&self) -> &str {
            "silent"
        }
    }

    #[test]
    fn test_role_wire_format() {
        let message = ChatMessage::user("Which criteria hold?");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "user");

        let parsed: ChatMessage =
            serde_json::from_str(r#"{"role": "assistant", "content": "{}"}"#).unwrap();
        assert_eq!(parsed.role, Role::Assistant);
        assert_eq!(ChatMessage::system("x").role.to_string(), "system");
    }

    #[test]
    fn test_estimate_rounds_up_per_message_set() {
        let messages = [ChatMessage::system("abcde"), ChatMessage::user("fgh")];
        assert_eq!(Silent.estimate_tokens(&messages), 2);
        assert_eq!(Silent.estimate_tokens(&[]), 0);
    }

    #[test]
    fn test_usage_total_saturates() {
        let usage = TokenUsage {
            prompt_tokens: u32::MAX,
            completion_tokens: 5,
        };
        assert_eq!(usage.total(), u32::MAX);
    }

    #[test]
    fn test_unknown_kind_lists_available() {
        let err = ProviderError::UnknownKind {
            kind: "gpt".to_string(),
            available: vec!["ollama".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unknown provider kind 'gpt', available: [\"ollama\"]"
        );
    }
}
