//! Context bundles: deduplicated retrieval results joined into prompt text.

use std::collections::HashSet;

use crate::types::ScoredChunk;

/// Separator placed between chunks in the prompt context.
pub const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

/// Remove chunks whose text was already seen, keeping the first occurrence.
pub fn dedup_chunks(chunks: Vec<ScoredChunk>) -> Vec<ScoredChunk> {
    let mut seen = HashSet::new();
    chunks
        .into_iter()
        .filter(|chunk| seen.insert(chunk.text.clone()))
        .collect()
}

/// Retrieved context for one document, grouped by the query that produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextBundle {
    sections: Vec<(String, Vec<ScoredChunk>)>,
}

impl ContextBundle {
    /// Build a bundle from `(query, results)` pairs, deduplicating each
    /// result set on its own.
    pub fn assemble(results: impl IntoIterator<Item = (String, Vec<ScoredChunk>)>) -> Self {
        Self {
            sections: results
                .into_iter()
                .map(|(query, chunks)| (query, dedup_chunks(chunks)))
                .collect(),
        }
    }

    /// True when no query produced any chunk.
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|(_, chunks)| chunks.is_empty())
    }

    pub fn chunk_count(&self) -> usize {
        self.sections.iter().map(|(_, chunks)| chunks.len()).sum()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &ScoredChunk> {
        self.sections.iter().flat_map(|(_, chunks)| chunks.iter())
    }

    /// Concatenate every chunk in query order.
    pub fn render(&self) -> String {
        self.chunks()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR)
    }
}
