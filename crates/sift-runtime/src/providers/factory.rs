//! Provider construction by kind.
//!
//! ```ignore
//! let registry = ProviderRegistry::with_defaults();
//! let provider = registry.create(&config.provider)?;
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{LlmProvider, ProviderError};
use crate::config::ProviderConfig;

/// Builds providers of one kind from the `provider` config section.
pub trait ProviderFactory: Send + Sync {
    /// Value of `provider.kind` this factory answers to.
    fn kind(&self) -> &'static str;

    fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError>;

    /// Checks that need no network access.
    fn validate(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
        if config.model.trim().is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "{} provider needs a model name",
                self.kind()
            )));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Language model provider"
    }
}

#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<&'static str, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later registrations of the same kind win.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories.insert(factory.kind(), factory);
    }

    pub fn create(&self, config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let factory = self.factory(&config.kind)?;
        factory.validate(config)?;
        factory.create(config)
    }

    pub fn validate(&self, config: &ProviderConfig) -> Result<(), ProviderError> {
        self.factory(&config.kind)?.validate(config)
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    pub fn supports(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    fn factory(&self, kind: &str) -> Result<&Arc<dyn ProviderFactory>, ProviderError> {
        self.factories
            .get(kind)
            .ok_or_else(|| ProviderError::UnknownKind {
                kind: kind.to_string(),
                available: self.kinds().into_iter().map(String::from).collect(),
            })
    }

    /// Registry with every provider compiled into this build.
    #[cfg(feature = "ollama")]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(super::OllamaProviderFactory));
        registry
    }

    /// Registry with every provider compiled into this build.
    #[cfg(not(feature = "ollama"))]
    pub fn with_defaults() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
