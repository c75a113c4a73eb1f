//! The screen, evaluate, refine loop.
//!
//! The criteria set is the only state carried between rounds. Verdict
//! records from one round are superseded by the next.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use sift_core::{
    CriteriaSet, DocumentSelection, EvaluationError, EvaluationReport, Evaluator, ExampleSource,
    GoldStandard, LabeledExamples, VerdictRecord,
};

use crate::config::RuntimeConfig;
use crate::gateway::{GatewayError, GenerationGateway, RetrievalGateway};
use crate::generation::StructuredGenerator;
use crate::optimizer::{
    Arbiter, CriteriaOptimizer, OptimizerError, RefinementReport, RefinementSession, Strategy,
};
use crate::screener::{Screener, ScreeningError, ScreeningSummary};
use crate::store::{StoreError, VerdictStore};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Screening(#[from] ScreeningError),

    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    #[error("Evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to list documents: {0}")]
    Documents(#[from] GatewayError),
}

/// Outcome of one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: usize,
    pub screening: ScreeningSummary,
    pub evaluation: EvaluationReport,
    pub refinement: RefinementReport,
}

/// Refinement options that stay fixed across rounds.
#[derive(Debug, Clone)]
pub struct RefinementPlan {
    pub strategy: Strategy,
    pub annotations: Option<String>,
}

impl RefinementPlan {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            annotations: None,
        }
    }

    pub fn with_annotations(mut self, annotations: Option<String>) -> Self {
        self.annotations = annotations;
        self
    }
}

pub struct Pipeline {
    retriever: Arc<dyn RetrievalGateway>,
    store: Arc<dyn VerdictStore>,
    screener: Screener,
    optimizer: CriteriaOptimizer,
    evaluator: Evaluator,
    gold: GoldStandard,
    selection: DocumentSelection,
    example_source: ExampleSource,
    max_documents: usize,
    reset_results: bool,
}

impl Pipeline {
    /// Wire the protocols together.
    ///
    /// Screening and refinement get separate gateways so each can charge
    /// its own phase budget.
    pub fn new(
        config: &RuntimeConfig,
        retriever: Arc<dyn RetrievalGateway>,
        screening: Arc<dyn GenerationGateway>,
        optimization: Arc<dyn GenerationGateway>,
        store: Arc<dyn VerdictStore>,
        gold: GoldStandard,
    ) -> Result<Self, PipelineError> {
        let screener = Screener::new(
            retriever.clone(),
            StructuredGenerator::new(screening, config.retry),
            store.clone(),
        )?;
        let optimizer = CriteriaOptimizer::new(
            retriever.clone(),
            StructuredGenerator::new(optimization, config.retry),
            &config.optimizer,
        )?;

        Ok(Self {
            retriever,
            store,
            screener,
            optimizer,
            evaluator: Evaluator::new(config.evaluation),
            gold,
            selection: config.documents,
            example_source: config.optimizer.example_source,
            max_documents: config.optimizer.max_documents,
            reset_results: config.results.reset,
        })
    }

    pub fn store(&self) -> &dyn VerdictStore {
        self.store.as_ref()
    }

    /// Documents a round runs over.
    pub async fn documents(&self) -> Result<Vec<String>, PipelineError> {
        Ok(self.selection.select(self.retriever.documents().await?))
    }

    /// Screen the selected documents, clearing old records first if configured.
    pub async fn screen(&self, criteria: &CriteriaSet) -> Result<ScreeningSummary, PipelineError> {
        if self.reset_results {
            self.store.reset()?;
        }
        let documents = self.documents().await?;
        info!(documents = documents.len(), "Starting screening round");
        Ok(self.screener.run(criteria, &documents).await?)
    }

    /// Evaluate the stored records against the gold standard.
    pub fn evaluate(&self, criteria: &CriteriaSet) -> Result<EvaluationReport, PipelineError> {
        let records = self.store.records()?;
        Ok(self.evaluator.evaluate(criteria, &records, &self.gold)?)
    }

    /// Example documents for discriminative refinement.
    pub fn examples(&self, records: &[VerdictRecord]) -> LabeledExamples {
        let per_side = self.max_documents / 2;
        match self.example_source {
            ExampleSource::GoldStandard => self.gold.examples(per_side),
            ExampleSource::Predictions => Evaluator::prediction_examples(records, per_side),
        }
    }

    /// Refine weak criteria in place.
    pub async fn refine(
        &self,
        plan: &RefinementPlan,
        criteria: &mut CriteriaSet,
        importances: &[f64],
        arbiter: &mut dyn Arbiter,
    ) -> Result<RefinementReport, PipelineError> {
        let records = self.store.records()?;
        let mut session = RefinementSession::new(arbiter)
            .with_documents(self.documents().await?)
            .with_examples(self.examples(&records));
        if let Some(notes) = &plan.annotations {
            session = session.with_annotations(notes.clone());
        }

        Ok(self
            .optimizer
            .refine(plan.strategy, criteria, importances, &mut session)
            .await?)
    }

    /// Run `rounds` rounds of screening, evaluation and refinement.
    pub async fn run(
        &self,
        rounds: usize,
        plan: &RefinementPlan,
        criteria: &mut CriteriaSet,
        arbiter: &mut dyn Arbiter,
    ) -> Result<Vec<RoundReport>, PipelineError> {
        let mut reports = Vec::with_capacity(rounds);

        for round in 1..=rounds {
            info!(round, of = rounds, "Starting round");
            let screening = self.screen(criteria).await?;
            let evaluation = self.evaluate(criteria)?;
            let refinement = self
                .refine(plan, criteria, &evaluation.importance_vector(), &mut *arbiter)
                .await?;

            reports.push(RoundReport {
                round,
                screening,
                evaluation,
                refinement,
            });
        }

        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizerConfig;
    use crate::generation::tests::ScriptedGateway;
    use crate::optimizer::AutoArbiter;
    use crate::resilience::RetryPolicy;
    use crate::screener::tests::FixedRetriever;
    use crate::store::InMemoryStore;
    use std::collections::BTreeMap;

    const ANSWER: &str = r#"{"title": "t", "criteria": {"Population": true, "Disease": false}, "reasoning": {}}"#;

    fn config(weak_above_threshold: bool) -> RuntimeConfig {
        RuntimeConfig {
            retry: RetryPolicy::immediate(2),
            optimizer: OptimizerConfig {
                weak_above_threshold,
                ..OptimizerConfig::default()
            },
            evaluation: sift_core::ForestConfig {
                trees: 10,
                ..Default::default()
            },
            ..RuntimeConfig::default()
        }
    }

    fn pipeline(config: &RuntimeConfig, optimization: Arc<ScriptedGateway>) -> Pipeline {
        let retriever = Arc::new(FixedRetriever(BTreeMap::from([
            ("a".to_string(), vec!["context a".to_string()]),
            ("b".to_string(), vec!["context b".to_string()]),
        ])));
        let gold = GoldStandard::new(BTreeMap::from([
            ("a".to_string(), Some(true)),
            ("b".to_string(), Some(false)),
        ]));
        Pipeline::new(
            config,
            retriever,
            Arc::new(ScriptedGateway::repeating(ANSWER)),
            optimization,
            Arc::new(InMemoryStore::new()),
            gold,
        )
        .unwrap()
    }

    fn criteria() -> CriteriaSet {
        CriteriaSet::from_pairs(
            "review",
            [("Population", "human subjects"), ("Disease", "thyroid cancer")],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_round_screens_evaluates_and_refines() {
        let optimization = Arc::new(ScriptedGateway::repeating(
            r#"{"improved_criterion": "rewritten"}"#,
        ));
        let config = config(false);
        let pipeline = pipeline(&config, optimization.clone());
        let mut criteria = criteria();

        let reports = pipeline
            .run(1, &RefinementPlan::new(Strategy::Automated), &mut criteria, &mut AutoArbiter)
            .await
            .unwrap();

        let report = &reports[0];
        assert_eq!(report.screening.screened, 2);
        assert_eq!(report.evaluation.training_rows, 2);
        // constant verdicts give zero importance, which is weak at or below 0.1
        assert_eq!(report.evaluation.importance_vector(), vec![0.0, 0.0]);
        assert_eq!(report.refinement.replacements.len(), 2);
        assert_eq!(criteria.get("Population"), Some("rewritten"));
        assert_eq!(optimization.calls(), 2);
    }

    #[tokio::test]
    async fn test_records_superseded_between_rounds() {
        let optimization = Arc::new(ScriptedGateway::repeating(
            r#"{"improved_criterion": "rewritten"}"#,
        ));
        let config = config(true);
        let pipeline = pipeline(&config, optimization.clone());
        let mut criteria = criteria();

        let reports = pipeline
            .run(2, &RefinementPlan::new(Strategy::Automated), &mut criteria, &mut AutoArbiter)
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(pipeline.store().records().unwrap().len(), 2);
        assert!(reports.iter().all(|r| r.refinement.is_empty()));
        assert_eq!(optimization.calls(), 0);
        assert_eq!(criteria, self::criteria());
    }

    #[test]
    fn test_examples_follow_source() {
        let mut config = config(true);
        let pipeline_gold = pipeline(&config, Arc::new(ScriptedGateway::default()));
        let records = vec![
            VerdictRecord::indeterminate("a", "none"),
            VerdictRecord::decided(
                "b",
                BTreeMap::from([("Population".to_string(), true)]),
                BTreeMap::new(),
            ),
        ];

        let examples = pipeline_gold.examples(&records);
        assert_eq!(examples.positive, vec!["a"]);
        assert_eq!(examples.negative, vec!["b"]);

        config.optimizer.example_source = ExampleSource::Predictions;
        let pipeline_pred = pipeline(&config, Arc::new(ScriptedGateway::default()));
        let examples = pipeline_pred.examples(&records);
        assert_eq!(examples.positive, vec!["b"]);
        assert!(examples.negative.is_empty());
    }
}
