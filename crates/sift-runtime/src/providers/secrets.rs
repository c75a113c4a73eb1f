//! API keys for providers.
//!
//! A local Ollama needs no key; a proxy in front of it often does. A key is
//! wrapped in [`ApiCredential`] the moment it is read, which keeps it out of
//! `Debug`/`Display` output and zeroes it on drop.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Config,
    Environment,
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self {
            CredentialSource::Config => "config",
            CredentialSource::Environment => "environment",
            CredentialSource::Programmatic => "programmatic",
        };
        f.write_str(source)
    }
}

pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// The configured key if set and non-blank, else `env_var` if set and
    /// non-blank.
    pub fn resolve(configured: Option<&str>, env_var: &str, name: &'static str) -> Option<Self> {
        if let Some(value) = configured.filter(|v| !v.trim().is_empty()) {
            return Some(Self::new(value, CredentialSource::Config, name));
        }
        std::env::var(env_var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|v| Self::new(v, CredentialSource::Environment, name))
    }

    /// Like [`ApiCredential::resolve`], for providers that cannot run without a key.
    pub fn require(
        configured: Option<&str>,
        env_var: &str,
        name: &'static str,
    ) -> Result<Self, ProviderError> {
        Self::resolve(configured, env_var, name).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "{} required: set provider.api_key or {}",
                name, env_var
            ))
        })
    }

    /// Read the key at the point of use. Do not keep the returned slice.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}
