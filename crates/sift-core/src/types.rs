//! Shared data types for screening and evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::verdict::{derive_relevance, missing_verdicts};

/// Note prefix on records whose answer skipped some criteria.
pub const MISSING_VERDICTS_NOTE: &str = "no verdict from the model for";

/// A retrieved text chunk with its relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// Chunk text as stored by the retriever
    pub text: String,

    /// Relevance of the chunk to the query (higher is better)
    pub score: f64,
}

impl ScoredChunk {
    pub fn new(text: impl Into<String>, score: f64) -> Self {
        Self {
            text: text.into(),
            score,
        }
    }
}

/// Outcome of screening one document in one pass.
///
/// Records are superseded, not merged, when a document is screened again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerdictRecord {
    /// Document identifier (title or file stem)
    pub document_id: String,

    /// Overall relevance; `None` when indeterminate
    pub relevant: Option<bool>,

    /// Per-criterion verdicts
    #[serde(default)]
    pub verdicts: BTreeMap<String, bool>,

    /// Per-criterion rationale
    #[serde(default)]
    pub reasoning: BTreeMap<String, String>,

    /// Why the record is indeterminate, if it is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// When the document was screened
    pub screened_at: DateTime<Utc>,
}

impl VerdictRecord {
    /// Create a record from parsed verdicts; relevance is derived over the
    /// criteria that have one.
    pub fn decided(
        document_id: impl Into<String>,
        verdicts: BTreeMap<String, bool>,
        reasoning: BTreeMap<String, String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            relevant: derive_relevance(&verdicts, verdicts.keys().map(String::as_str)),
            verdicts,
            reasoning,
            note: None,
            screened_at: Utc::now(),
        }
    }

    /// Create a record screened against `criteria`.
    ///
    /// A criterion without a verdict leaves the record indeterminate, with
    /// the missing names in the note.
    pub fn screened<'a>(
        document_id: impl Into<String>,
        criteria: impl IntoIterator<Item = &'a str> + Clone,
        verdicts: BTreeMap<String, bool>,
        reasoning: BTreeMap<String, String>,
    ) -> Self {
        let missing = missing_verdicts(&verdicts, criteria.clone());
        let note = (!missing.is_empty())
            .then(|| format!("{}: {}", MISSING_VERDICTS_NOTE, missing.join(", ")));
        Self {
            document_id: document_id.into(),
            relevant: derive_relevance(&verdicts, criteria),
            verdicts,
            reasoning,
            note,
            screened_at: Utc::now(),
        }
    }

    /// Create an indeterminate record without verdicts.
    pub fn indeterminate(document_id: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            relevant: None,
            verdicts: BTreeMap::new(),
            reasoning: BTreeMap::new(),
            note: Some(note.into()),
            screened_at: Utc::now(),
        }
    }

    /// Whether the record carries a verdict for every given criterion.
    pub fn covers<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        names.into_iter().all(|name| self.verdicts.contains_key(name))
    }
}

/// Documents used as positive and negative examples during discriminative refinement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LabeledExamples {
    /// Documents the criterion should evaluate true for
    pub positive: Vec<String>,

    /// Documents the criterion should evaluate false for
    pub negative: Vec<String>,
}

impl LabeledExamples {
    /// Cap each side to `per_side` documents, keeping the first ones.
    pub fn capped(mut self, per_side: usize) -> Self {
        self.positive.truncate(per_side);
        self.negative.truncate(per_side);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }
}

/// Where discriminative examples come from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExampleSource {
    /// Independently labeled reference data
    #[default]
    GoldStandard,

    /// The screening round's own predictions
    Predictions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indeterminate_record_has_no_relevance() {
        let record = VerdictRecord::indeterminate("doc-1", "no retrieval context");
        assert_eq!(record.relevant, None);
        assert!(record.verdicts.is_empty());
        assert_eq!(record.note.as_deref(), Some("no retrieval context"));
    }

    #[test]
    fn test_relevant_serializes_as_null() {
        let record = VerdictRecord::indeterminate("doc-1", "empty");
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["relevant"].is_null());

        let decided = VerdictRecord::decided(
            "doc-2",
            BTreeMap::from([("A".to_string(), true)]),
            BTreeMap::new(),
        );
        let json = serde_json::to_value(&decided).unwrap();
        assert_eq!(json["relevant"], true);
    }

    #[test]
    fn test_screened_with_missing_verdict_is_indeterminate() {
        let record = VerdictRecord::screened(
            "doc",
            ["Population", "Disease"],
            BTreeMap::from([("Population".to_string(), true)]),
            BTreeMap::new(),
        );
        assert_eq!(record.relevant, None);
        assert_eq!(
            record.note.as_deref(),
            Some("no verdict from the model for: Disease")
        );

        let complete = VerdictRecord::screened(
            "doc",
            ["Population"],
            BTreeMap::from([("Population".to_string(), true)]),
            BTreeMap::new(),
        );
        assert_eq!(complete.relevant, Some(true));
        assert_eq!(complete.note, None);
    }

    #[test]
    fn test_covers() {
        let record = VerdictRecord::decided(
            "doc",
            BTreeMap::from([("A".to_string(), true), ("B".to_string(), false)]),
            BTreeMap::new(),
        );
        assert!(record.covers(["A", "B"]));
        assert!(!record.covers(["A", "C"]));
    }

    #[test]
    fn test_examples_capped() {
        let examples = LabeledExamples {
            positive: vec!["a".into(), "b".into(), "c".into()],
            negative: vec!["d".into()],
        }
        .capped(2);
        assert_eq!(examples.positive, vec!["a", "b"]);
        assert_eq!(examples.negative, vec!["d"]);
    }
}
