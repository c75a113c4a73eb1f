pub mod evaluate;
pub mod optimize;
pub mod run;
pub mod screen;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use sift_core::{CriteriaSet, GoldStandard};
use sift_runtime::{
    Arbiter, AutoArbiter, BudgetTracker, CachedRetriever, ConsoleArbiter, FilteredRetriever,
    GenerationGateway, InMemoryStore, JsonFileStore, LexicalRetriever, Phase, Pipeline,
    ProviderGateway, ProviderRegistry, RefinementReport, RetrievalGateway, RuntimeConfig,
    Strategy, VerdictStore,
};

use crate::cli::{CorpusArgs, RefineArgs};

pub fn load_config(path: Option<&Path>) -> Result<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(RuntimeConfig::default()),
    }
}

pub fn load_criteria(path: &Path) -> Result<CriteriaSet> {
    CriteriaSet::from_file(path).with_context(|| format!("failed to load criteria {}", path.display()))
}

pub fn load_gold(path: &Path) -> Result<GoldStandard> {
    GoldStandard::from_file(path)
        .with_context(|| format!("failed to load gold standard {}", path.display()))
}

pub fn open_store(config: &RuntimeConfig, results: Option<&PathBuf>) -> Result<Arc<dyn VerdictStore>> {
    match results.or(config.results.path.as_ref()) {
        Some(path) => {
            let store = JsonFileStore::open(path)
                .with_context(|| format!("failed to open verdict file {}", path.display()))?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryStore::new())),
    }
}

pub fn open_retriever(config: &RuntimeConfig, corpus: &Path) -> Result<Arc<dyn RetrievalGateway>> {
    let lexical = LexicalRetriever::from_file(corpus)
        .with_context(|| format!("failed to load corpus {}", corpus.display()))?;
    if lexical.is_empty() {
        bail!("corpus {} contains no documents", corpus.display());
    }
    info!(documents = lexical.len(), corpus = %corpus.display(), "Loaded corpus");

    let filtered = FilteredRetriever::new(lexical, config.retrieval.clone());
    Ok(Arc::new(CachedRetriever::from_config(filtered, &config.retrieval)))
}

/// Screening and optimization gateways sharing one provider and budget.
pub struct Gateways {
    pub screening: Arc<dyn GenerationGateway>,
    pub optimization: Arc<dyn GenerationGateway>,
    pub budget: Arc<BudgetTracker>,
}

pub async fn open_gateways(config: &RuntimeConfig) -> Result<Gateways> {
    let registry = ProviderRegistry::with_defaults();
    let provider = registry
        .create(&config.provider)
        .with_context(|| format!("failed to create provider '{}'", config.provider.kind))?;

    if !provider.health_check().await {
        warn!(provider = provider.name(), "Provider health check failed, continuing anyway");
    }

    let budget = Arc::new(config.budget.tracker());
    let base = ProviderGateway::new(provider, config.provider.completion_config(), budget.clone());
    Ok(Gateways {
        screening: Arc::new(base.with_phase(Phase::Screening)),
        optimization: Arc::new(base.with_phase(Phase::Optimization)),
        budget,
    })
}

pub async fn open_pipeline(
    config: &RuntimeConfig,
    corpus: &CorpusArgs,
    gold: GoldStandard,
) -> Result<(Pipeline, Arc<BudgetTracker>)> {
    let retriever = open_retriever(config, &corpus.corpus)?;
    let store = open_store(config, corpus.results.as_ref())?;
    let gateways = open_gateways(config).await?;
    let pipeline = Pipeline::new(
        config,
        retriever,
        gateways.screening,
        gateways.optimization,
        store,
        gold,
    )?;
    Ok((pipeline, gateways.budget))
}

pub fn arbiter(strategy: Strategy, interactive: bool) -> Box<dyn Arbiter> {
    if interactive {
        return Box::new(ConsoleArbiter::stdio());
    }
    if strategy.needs_arbiter() {
        warn!(
            strategy = %strategy,
            "Strategy asks for expert review but interactive mode is off, accepting candidates automatically"
        );
    }
    Box::new(AutoArbiter)
}

pub fn write_criteria(criteria: &CriteriaSet, refine: &RefineArgs) -> Result<()> {
    match &refine.output {
        Some(path) => {
            criteria
                .write_yaml_file(path)
                .with_context(|| format!("failed to write criteria {}", path.display()))?;
            info!(path = %path.display(), "Wrote refined criteria");
        }
        None => print!("{}", criteria.to_yaml()?),
    }
    Ok(())
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_refinement(report: &RefinementReport) {
    println!("Strategy: {}", report.strategy);
    if report.replacements.is_empty() {
        println!("No criteria replaced");
    }
    for replacement in &report.replacements {
        println!(
            "  {}: \"{}\" -> \"{}\"",
            replacement.name, replacement.previous, replacement.replacement
        );
    }
    for name in &report.unchanged {
        println!("  {}: unchanged (no candidates)", name);
    }
}

pub fn log_usage(budget: &BudgetTracker) {
    for phase in Phase::ALL {
        let usage = budget.usage(phase);
        if usage.calls > 0 {
            info!(
                phase = %phase,
                calls = usage.calls,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Model usage"
            );
        }
    }
    info!(
        tokens = budget.total_usage().total_tokens(),
        remaining = budget.remaining_global(),
        "Token budget"
    );
}
