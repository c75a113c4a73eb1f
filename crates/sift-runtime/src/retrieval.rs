//! Retrieval post-processing and an in-process lexical retriever.
//!
//! Post-processing order: keep `top_k`, rerank (keeping `rerank_top_n`),
//! then drop chunks at or below the relevance threshold.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use sift_core::ScoredChunk;

use crate::config::RetrievalConfig;
use crate::gateway::{GatewayError, RetrievalGateway};

lazy_static! {
    static ref TERM: Regex = Regex::new(r"[\p{L}\p{N}]+").unwrap();
}

/// Lowercased word terms of a text.
pub(crate) fn terms(text: &str) -> HashSet<String> {
    TERM.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Fraction of query terms present in the chunk, in `[0, 1]`.
fn overlap_score(query_terms: &HashSet<String>, chunk: &str) -> f64 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let chunk_terms = terms(chunk);
    let hits = query_terms.intersection(&chunk_terms).count();
    hits as f64 / query_terms.len() as f64
}

fn sort_by_score(chunks: &mut [ScoredChunk]) {
    chunks.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Reorders retrieved chunks by a second relevance model.
pub trait Reranker: Send + Sync {
    /// Rescore `chunks` against `query` and keep the best `top_n`.
    fn rerank(&self, query: &str, chunks: Vec<ScoredChunk>, top_n: usize) -> Vec<ScoredChunk>;
}

/// Reranks by query term overlap.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlapReranker;

impl Reranker for OverlapReranker {
    fn rerank(&self, query: &str, chunks: Vec<ScoredChunk>, top_n: usize) -> Vec<ScoredChunk> {
        let query_terms = terms(query);
        let mut rescored: Vec<ScoredChunk> = chunks
            .into_iter()
            .map(|c| {
                let score = overlap_score(&query_terms, &c.text);
                ScoredChunk::new(c.text, score)
            })
            .collect();
        sort_by_score(&mut rescored);
        rescored.truncate(top_n);
        rescored
    }
}

/// Applies `top_k`, optional reranking and an optional threshold to any retriever.
pub struct FilteredRetriever<R> {
    inner: R,
    config: RetrievalConfig,
    reranker: Arc<dyn Reranker>,
}

impl<R: RetrievalGateway> FilteredRetriever<R> {
    pub fn new(inner: R, config: RetrievalConfig) -> Self {
        Self {
            inner,
            config,
            reranker: Arc::new(OverlapReranker),
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = reranker;
        self
    }

    fn post_process(&self, query: &str, mut chunks: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
        chunks.truncate(self.config.top_k);

        if self.config.apply_reranking {
            chunks = self
                .reranker
                .rerank(query, chunks, self.config.rerank_top_n);
        }

        if self.config.apply_threshold {
            let threshold = self.config.relevance_threshold;
            chunks.retain(|c| c.score > threshold);
        }

        chunks
    }
}

#[async_trait]
impl<R: RetrievalGateway> RetrievalGateway for FilteredRetriever<R> {
    async fn search(
        &self,
        document_id: &str,
        query: &str,
    ) -> Result<Vec<ScoredChunk>, GatewayError> {
        let raw = self.inner.search(document_id, query).await?;
        let retrieved = raw.len();
        let kept = self.post_process(query, raw);
        debug!(document = document_id, retrieved, kept = kept.len(), "Filtered retrieval");
        Ok(kept)
    }

    async fn documents(&self) -> Result<Vec<String>, GatewayError> {
        self.inner.documents().await
    }
}

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Failed to read corpus: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse corpus JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct CorpusFile {
    documents: BTreeMap<String, Vec<String>>,
}

/// In-process retriever over pre-chunked documents.
///
/// ```json
/// { "documents": { "smith-2021": ["chunk one", "chunk two"] } }
/// ```
#[derive(Debug, Clone, Default)]
pub struct LexicalRetriever {
    documents: BTreeMap<String, Vec<String>>,
}

impl LexicalRetriever {
    pub fn new(documents: BTreeMap<String, Vec<String>>) -> Self {
        Self { documents }
    }

    pub fn from_json(json: &str) -> Result<Self, CorpusError> {
        let corpus: CorpusFile = serde_json::from_str(json)?;
        Ok(Self::new(corpus.documents))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl RetrievalGateway for LexicalRetriever {
    async fn search(
        &self,
        document_id: &str,
        query: &str,
    ) -> Result<Vec<ScoredChunk>, GatewayError> {
        let Some(chunks) = self.documents.get(document_id) else {
            return Ok(Vec::new());
        };

        let query_terms = terms(query);
        let mut scored: Vec<ScoredChunk> = chunks
            .iter()
            .map(|text| ScoredChunk::new(text.clone(), overlap_score(&query_terms, text)))
            .collect();
        sort_by_score(&mut scored);
        Ok(scored)
    }

    async fn documents(&self) -> Result<Vec<String>, GatewayError> {
        Ok(self.documents.keys().cloned().collect())
    }
}
