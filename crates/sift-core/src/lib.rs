//! # sift-core
//!
//! Deterministic core of the sift literature-screening pipeline.
//!
//! This crate holds everything that does not talk to a model or a retriever:
//! - criteria sets and weak-criterion selection
//! - the structured response contract used to parse model output
//! - verdict records and relevance derivation
//! - context bundles with deduplication
//! - evaluation against a gold standard (metrics and feature importance)
//!
//! ## Example
//!
//! ```rust,ignore
//! use sift_core::{CriteriaSet, Evaluator, GoldStandard, WeaknessPolicy};
//!
//! let criteria = CriteriaSet::from_file("criteria.yaml")?;
//! let gold = GoldStandard::from_file("gold.yaml")?;
//! let importances = Evaluator::default().feature_importance(&criteria, &records, &gold)?;
//!
//! let policy = WeaknessPolicy::new(0.1, true);
//! for weak in policy.weak_criteria(&criteria.pair_importances(&importances)?) {
//!     println!("weak: {} ({:.3})", weak.name, weak.importance);
//! }
//! ```

pub mod context;
pub mod criteria;
pub mod documents;
pub mod evaluation;
pub mod gold;
pub mod response;
pub mod types;
pub mod verdict;

pub use context::{dedup_chunks, ContextBundle, CHUNK_SEPARATOR};
pub use criteria::{CriteriaError, CriteriaSet, Criterion, WeaknessPolicy, WeightedCriterion};
pub use documents::DocumentSelection;
pub use evaluation::{
    ConfusionMatrix, CriterionImportance, EvaluationError, EvaluationReport, Evaluator,
    ForestConfig, Metrics,
};
pub use gold::{GoldStandard, GoldStandardError};
pub use response::{
    FieldKind, FormatError, ResponseError, ResponseField, ResponseSchema, ScreeningAnswer,
    StructuredResponse,
};
pub use types::{ExampleSource, LabeledExamples, ScoredChunk, VerdictRecord};
pub use verdict::derive_relevance;
