//! Caching layer for retrieval.
//!
//! Refinement strategies query the same `(document, criterion)` pairs the
//! screening round already asked for; the cache keeps those lookups local.

use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

use sift_core::ScoredChunk;

use crate::config::RetrievalConfig;
use crate::gateway::{GatewayError, RetrievalGateway};

/// Cache key for a retrieval lookup.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct CacheKey {
    document_id: String,
    query: String,
}

impl CacheKey {
    pub fn new(document_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            query: query.into(),
        }
    }
}

/// Memoises successful lookups of an inner retriever.
pub struct CachedRetriever<R> {
    inner: R,
    cache: Cache<CacheKey, Vec<ScoredChunk>>,
}

impl<R: RetrievalGateway> CachedRetriever<R> {
    /// Create a new cache with the given capacity and time to live.
    pub fn new(inner: R, max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { inner, cache }
    }

    pub fn from_config(inner: R, config: &RetrievalConfig) -> Self {
        Self::new(inner, config.cache_entries, config.cache_ttl)
    }

    /// Clear the cache.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl<R: RetrievalGateway> RetrievalGateway for CachedRetriever<R> {
    async fn search(
        &self,
        document_id: &str,
        query: &str,
    ) -> Result<Vec<ScoredChunk>, GatewayError> {
        let key = CacheKey::new(document_id, query);
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(hit);
        }

        let chunks = self.inner.search(document_id, query).await?;
        self.cache.insert(key, chunks.clone()).await;
        Ok(chunks)
    }

    async fn documents(&self) -> Result<Vec<String>, GatewayError> {
        self.inner.documents().await
    }
}
