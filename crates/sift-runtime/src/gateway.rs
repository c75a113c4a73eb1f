//! Narrow interfaces to the retriever and the language model.
//!
//! The screening and refinement protocols never see providers or vector
//! stores directly; they see these two traits.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use sift_core::ScoredChunk;

use crate::providers::{ChatMessage, CompletionConfig, LlmProvider, ProviderError};
use crate::resilience::{BudgetTracker, Phase};

/// Transport-level failures. Never retried by the format loop.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),

    #[error("Token budget exceeded for {phase} phase")]
    BudgetExceeded { phase: Phase },
}

impl From<ProviderError> for GatewayError {
    fn from(err: ProviderError) -> Self {
        GatewayError::Unavailable(err.to_string())
    }
}

/// Source of document chunks.
#[async_trait]
pub trait RetrievalGateway: Send + Sync {
    /// Chunks of `document_id` relevant to `query`, best first. May be empty.
    async fn search(&self, document_id: &str, query: &str)
        -> Result<Vec<ScoredChunk>, GatewayError>;

    /// Every document this gateway can search.
    async fn documents(&self) -> Result<Vec<String>, GatewayError>;
}

/// Raw text generation. The caller validates the output.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError>;
}

#[async_trait]
impl<T: RetrievalGateway + ?Sized> RetrievalGateway for Arc<T> {
    async fn search(
        &self,
        document_id: &str,
        query: &str,
    ) -> Result<Vec<ScoredChunk>, GatewayError> {
        (**self).search(document_id, query).await
    }

    async fn documents(&self) -> Result<Vec<String>, GatewayError> {
        (**self).documents().await
    }
}

#[async_trait]
impl<T: GenerationGateway + ?Sized> GenerationGateway for Arc<T> {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        (**self).complete(prompt).await
    }
}

/// Generation through an [`LlmProvider`] with token budget enforcement.
#[derive(Clone)]
pub struct ProviderGateway {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
    budget: Arc<BudgetTracker>,
    phase: Phase,
}

impl ProviderGateway {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        config: CompletionConfig,
        budget: Arc<BudgetTracker>,
    ) -> Self {
        Self {
            provider,
            config,
            budget,
            phase: Phase::Screening,
        }
    }

    /// The same gateway, charging a different phase budget.
    pub fn with_phase(&self, phase: Phase) -> Self {
        Self {
            phase,
            ..self.clone()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn budget(&self) -> &BudgetTracker {
        &self.budget
    }
}

#[async_trait]
impl GenerationGateway for ProviderGateway {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        let messages = [ChatMessage::user(prompt)];
        let estimated = self
            .provider
            .estimate_tokens(&messages)
            .saturating_add(self.config.max_tokens);
        if !self.budget.can_afford(self.phase, estimated) {
            return Err(GatewayError::BudgetExceeded { phase: self.phase });
        }

        debug!(provider = self.provider.name(), phase = %self.phase, prompt, "Sending prompt");
        let completion = self.provider.complete(&messages, &self.config).await?;

        self.budget.record_usage(self.phase, &completion.usage);
        debug!(
            tokens = completion.usage.total(),
            model = %completion.model,
            done_reason = ?completion.done_reason,
            "Received completion"
        );
        Ok(completion.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{Completion, TokenUsage};
    use parking_lot::Mutex;

    struct EchoProvider {
        seen: Mutex<Vec<ChatMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl LlmProvider for EchoProvider {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _config: &CompletionConfig,
        ) -> Result<Completion, ProviderError> {
            if self.fail {
                return Err(ProviderError::Unauthorized);
            }
            let text = messages[0].content.to_uppercase();
            self.seen.lock().extend_from_slice(messages);
            Ok(Completion {
                text,
                usage: TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                },
                model: "echo".to_string(),
                done_reason: None,
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn gateway(fail: bool, budget: BudgetTracker) -> (Arc<EchoProvider>, ProviderGateway) {
        let provider = Arc::new(EchoProvider {
            seen: Mutex::new(Vec::new()),
            fail,
        });
        let config = CompletionConfig {
            max_tokens: 20,
            ..CompletionConfig::default()
        };
        let gateway = ProviderGateway::new(provider.clone(), config, Arc::new(budget));
        (provider, gateway)
    }

    #[tokio::test]
    async fn test_prompt_sent_as_user_message() {
        let (provider, gateway) = gateway(false, BudgetTracker::default());
        let text = gateway.complete("which criteria hold?").await.unwrap();

        assert_eq!(text, "WHICH CRITERIA HOLD?");
        assert_eq!(
            provider.seen.lock().as_slice(),
            &[ChatMessage::user("which criteria hold?")]
        );
    }

    #[tokio::test]
    async fn test_usage_recorded_against_phase() {
        let (_, gateway) = gateway(false, BudgetTracker::new(1_000, 100, 100));
        let gateway = gateway.with_phase(Phase::Optimization);
        gateway.complete("rewrite").await.unwrap();

        assert_eq!(gateway.budget().remaining_phase(Phase::Optimization), 85);
        assert_eq!(gateway.budget().remaining_phase(Phase::Screening), 100);
        assert_eq!(gateway.budget().usage(Phase::Optimization).calls, 1);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_blocks_call() {
        let (provider, gateway) = gateway(false, BudgetTracker::new(1_000, 10, 10));
        let result = gateway.complete("a prompt").await;

        assert!(matches!(
            result,
            Err(GatewayError::BudgetExceeded {
                phase: Phase::Screening
            })
        ));
        assert!(provider.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_is_unavailable() {
        let (_, gateway) = gateway(true, BudgetTracker::default());
        let result = gateway.complete("a prompt").await;
        assert!(matches!(result, Err(GatewayError::Unavailable(_))));
    }
}
