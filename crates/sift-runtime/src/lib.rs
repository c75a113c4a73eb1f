//! # sift-runtime
//!
//! Model-backed screening and criteria refinement for sift.
//!
//! Everything deterministic lives in `sift-core`. This crate adds the parts
//! that talk to a language model or a retriever:
//!
//! - [`Screener`] turns a criteria set into one verdict record per document
//! - [`CriteriaOptimizer`] rewrites weak criteria using one of several
//!   [`Strategy`]s and an injected [`Arbiter`]
//! - [`Pipeline`] repeats screen, evaluate, refine across rounds
//!
//! Model output is always parsed through a response schema and retried under
//! a bounded [`RetryPolicy`]; transport failures are never retried that way.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sift_runtime::{Pipeline, RefinementPlan, RuntimeConfig, Strategy, AutoArbiter};
//!
//! let config = RuntimeConfig::from_file("sift.yaml")?;
//! let pipeline = Pipeline::new(&config, retriever, screening, optimization, store, gold)?;
//!
//! let plan = RefinementPlan::new(Strategy::ContextAware);
//! let reports = pipeline.run(3, &plan, &mut criteria, &mut AutoArbiter).await?;
//! ```

pub mod cache;
pub mod config;
pub mod gateway;
pub mod generation;
pub mod optimizer;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod resilience;
pub mod retrieval;
pub mod screener;
pub mod store;

pub use cache::CachedRetriever;
pub use config::{
    BudgetConfig, ConfigError, OptimizerConfig, ProviderConfig, ResultsConfig, RetrievalConfig,
    RuntimeConfig,
};
pub use gateway::{GatewayError, GenerationGateway, ProviderGateway, RetrievalGateway};
pub use generation::{GenerationError, StructuredGenerator};
pub use optimizer::{
    Arbiter, ArbiterError, AutoArbiter, ConsoleArbiter, CriteriaOptimizer, OptimizerError,
    RefinementReport, RefinementSession, Replacement, Review, Strategy,
};
pub use pipeline::{Pipeline, PipelineError, RefinementPlan, RoundReport};
pub use providers::{LlmProvider, ProviderError, ProviderRegistry};
pub use resilience::{BudgetTracker, ModelUsage, Phase, RetryPolicy};
pub use retrieval::{CorpusError, FilteredRetriever, LexicalRetriever, OverlapReranker, Reranker};
pub use screener::{Screener, ScreeningError, ScreeningSummary};
pub use store::{InMemoryStore, JsonFileStore, StoreError, VerdictStore};
