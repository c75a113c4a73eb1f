//! Runtime configuration.
//!
//! One `RuntimeConfig` is loaded from YAML at startup, validated once and
//! handed to the components that need it. Every section has defaults, so an
//! empty file is a valid configuration.
//!
//! ```yaml
//! provider:
//!   model: mixtral:latest
//!   timeout: 90s
//! retrieval:
//!   top_k: 6
//!   relevance_threshold: 0.6
//! optimizer:
//!   importance_threshold: 0.1
//!   weak_above_threshold: true
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use sift_core::{DocumentSelection, ExampleSource, ForestConfig, WeaknessPolicy};

use crate::providers::CompletionConfig;
use crate::resilience::{BudgetTracker, RetryPolicy};

/// Serde adapter for durations written as `"500ms"`, `"30s"`, `"1h"`.
pub mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Model provider settings.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Registered provider kind
    pub kind: String,

    pub model: String,

    pub base_url: String,

    pub max_tokens: u32,

    pub temperature: f32,

    #[serde(with = "humantime_duration")]
    pub timeout: Duration,

    /// Optional key; `SIFT_API_KEY` is consulted when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: "ollama".to_string(),
            model: "mixtral:latest".to_string(),
            base_url: "http://localhost:11434".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
            timeout: Duration::from_secs(60),
            api_key: None,
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ProviderConfig {
    pub fn completion_config(&self) -> CompletionConfig {
        CompletionConfig {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
        }
    }
}

/// Retrieval post-processing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks kept per query
    pub top_k: usize,

    /// Chunks must score strictly above this to survive filtering
    pub relevance_threshold: f64,

    pub apply_threshold: bool,

    pub apply_reranking: bool,

    /// Chunks kept after reranking
    pub rerank_top_n: usize,

    pub cache_entries: u64,

    #[serde(with = "humantime_duration")]
    pub cache_ttl: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            relevance_threshold: 0.7,
            apply_threshold: true,
            apply_reranking: false,
            rerank_top_n: 3,
            cache_entries: 10_000,
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

/// Token budgets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BudgetConfig {
    pub global_max_tokens: u32,
    pub screening_max_tokens: u32,
    pub optimization_max_tokens: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            global_max_tokens: 2_000_000,
            screening_max_tokens: 1_500_000,
            optimization_max_tokens: 500_000,
        }
    }
}

impl BudgetConfig {
    pub fn tracker(&self) -> BudgetTracker {
        BudgetTracker::new(
            self.global_max_tokens,
            self.screening_max_tokens,
            self.optimization_max_tokens,
        )
    }
}

/// Criteria refinement settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OptimizerConfig {
    pub importance_threshold: f64,

    /// Weak means importance above the threshold (true) or at/below it (false)
    pub weak_above_threshold: bool,

    /// Documents consulted per refinement
    pub max_documents: usize,

    /// Candidates offered to the arbiter
    pub expert_choices: usize,

    pub example_source: ExampleSource,

    /// Ask a human on the console instead of deciding automatically
    pub interactive: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            importance_threshold: 0.1,
            weak_above_threshold: true,
            max_documents: 10,
            expert_choices: 3,
            example_source: ExampleSource::GoldStandard,
            interactive: false,
        }
    }
}

impl OptimizerConfig {
    pub fn policy(&self) -> WeaknessPolicy {
        WeaknessPolicy::new(self.importance_threshold, self.weak_above_threshold)
    }
}

/// Verdict persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResultsConfig {
    /// JSON file for verdict records; in memory when unset
    pub path: Option<PathBuf>,

    /// Clear stored records before a screening round
    pub reset: bool,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            path: None,
            reset: true,
        }
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub provider: ProviderConfig,
    pub retrieval: RetrievalConfig,
    pub retry: RetryPolicy,
    pub budget: BudgetConfig,
    pub optimizer: OptimizerConfig,
    pub documents: DocumentSelection,
    pub evaluation: ForestConfig,
    pub results: ResultsConfig,
}

impl RuntimeConfig {
    /// Parse and validate a YAML configuration.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = if yaml.trim().is_empty() {
            RuntimeConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Reject settings no component can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.provider.model.trim().is_empty() {
            return invalid("provider.model must not be empty");
        }
        if self.retrieval.top_k == 0 {
            return invalid("retrieval.top_k must be at least 1");
        }
        if !self.retrieval.relevance_threshold.is_finite() {
            return invalid("retrieval.relevance_threshold must be finite");
        }
        if self.retrieval.apply_reranking && self.retrieval.rerank_top_n == 0 {
            return invalid("retrieval.rerank_top_n must be at least 1");
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts must be at least 1");
        }
        if self.retry.initial_delay > self.retry.max_delay {
            return invalid("retry.initial_delay must not exceed retry.max_delay");
        }
        if !self.retry.factor.is_finite() || self.retry.factor < 1.0 {
            return invalid("retry.factor must be at least 1.0");
        }
        if !self.optimizer.importance_threshold.is_finite() {
            return invalid("optimizer.importance_threshold must be finite");
        }
        if self.optimizer.max_documents == 0 {
            return invalid("optimizer.max_documents must be at least 1");
        }
        if self.optimizer.expert_choices == 0 {
            return invalid("optimizer.expert_choices must be at least 1");
        }
        if self.documents.random_subset && self.documents.subset_size == 0 {
            return invalid("documents.subset_size must be at least 1 when random_subset is on");
        }
        if self.evaluation.trees == 0 {
            return invalid("evaluation.trees must be at least 1");
        }
        Ok(())
    }
}
