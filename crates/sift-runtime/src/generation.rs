//! Schema-validated generation with bounded retry.
//!
//! Malformed output is retried with the same prompt under exponential
//! backoff. Gateway failures end the call at once.

use backon::Retryable;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use sift_core::{FormatError, ResponseSchema, StructuredResponse};

use crate::gateway::{GatewayError, GenerationGateway};
use crate::resilience::RetryPolicy;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Model output stayed malformed after {attempts} attempts: {last}")]
    Format { attempts: usize, last: FormatError },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Failure of a single attempt.
#[derive(Debug)]
enum Attempt {
    Format(FormatError),
    Gateway(GatewayError),
}

/// The one place generation output is parsed and retried.
#[derive(Clone)]
pub struct StructuredGenerator {
    gateway: Arc<dyn GenerationGateway>,
    policy: RetryPolicy,
}

impl StructuredGenerator {
    pub fn new(gateway: Arc<dyn GenerationGateway>, policy: RetryPolicy) -> Self {
        Self { gateway, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Generate until the output parses against `schema` or attempts run out.
    pub async fn generate(
        &self,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<StructuredResponse, GenerationError> {
        let attempts = AtomicUsize::new(0);
        let counter = &attempts;

        let result = (|| async move {
            let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let raw = self
                .gateway
                .complete(prompt)
                .await
                .map_err(Attempt::Gateway)?;
            schema.parse(&raw).map_err(|e| {
                debug!(attempt, error = %e, raw = %raw, "Malformed model output");
                Attempt::Format(e)
            })
        })
        .retry(self.policy.backoff())
        .sleep(tokio::time::sleep)
        .when(|e| matches!(e, Attempt::Format(_)))
        .notify(|e: &Attempt, delay: Duration| {
            if let Attempt::Format(err) = e {
                warn!(error = %err, delay = ?delay, "Retrying malformed generation");
            }
        })
        .await;

        result.map_err(|e| match e {
            Attempt::Format(last) => GenerationError::Format {
                attempts: attempts.load(Ordering::SeqCst),
                last,
            },
            Attempt::Gateway(err) => GenerationError::Gateway(err),
        })
    }

    /// Generate a single text field.
    pub async fn generate_text(
        &self,
        prompt: &str,
        schema: &ResponseSchema,
        field: &str,
    ) -> Result<String, GenerationError> {
        let response = self.generate(prompt, schema).await?;
        response
            .text(field)
            .map(str::to_string)
            .ok_or_else(|| GenerationError::Format {
                attempts: 1,
                last: FormatError::SchemaViolation(vec![format!("missing {}", field)]),
            })
    }
}
