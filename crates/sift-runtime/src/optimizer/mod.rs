//! Criteria refinement driven by classifier importances.
//!
//! The optimizer pairs importances with criteria once, selects the weak
//! ones through the configured [`WeaknessPolicy`], and replaces each weak
//! criterion in key order. A replacement is fully resolved, including any
//! arbitration, before the next criterion is looked at.

mod arbiter;
mod strategy;

pub use arbiter::{Arbiter, ArbiterError, AutoArbiter, ConsoleArbiter, Review};
pub use strategy::{group_candidates, Strategy};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use sift_core::response::fields;
use sift_core::{
    ContextBundle, CriteriaError, CriteriaSet, LabeledExamples, ResponseError, ResponseSchema,
    WeaknessPolicy, CHUNK_SEPARATOR,
};

use crate::config::OptimizerConfig;
use crate::gateway::{GatewayError, RetrievalGateway};
use crate::generation::{GenerationError, StructuredGenerator};
use crate::prompts;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error(transparent)]
    Criteria(#[from] CriteriaError),

    #[error("Response schema error: {0}")]
    Schema(#[from] ResponseError),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] GatewayError),

    #[error("Arbitration failed: {0}")]
    Arbiter(#[from] ArbiterError),

    #[error("No positive or negative example documents to refine '{criterion}' against")]
    MissingExamples { criterion: String },
}

/// One criterion text swapped for another.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Replacement {
    pub name: String,
    pub previous: String,
    pub replacement: String,
}

/// What a refinement pass changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefinementReport {
    pub strategy: Strategy,

    /// Replacements in key order
    pub replacements: Vec<Replacement>,

    /// Weak criteria left unchanged for lack of candidates
    pub unchanged: Vec<String>,
}

impl RefinementReport {
    fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            replacements: Vec::new(),
            unchanged: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }
}

/// Inputs a refinement pass needs beyond the criteria and importances.
pub struct RefinementSession<'a> {
    arbiter: &'a mut dyn Arbiter,
    documents: Vec<String>,
    examples: LabeledExamples,
    annotations: Option<String>,
}

impl<'a> RefinementSession<'a> {
    pub fn new(arbiter: &'a mut dyn Arbiter) -> Self {
        Self {
            arbiter,
            documents: Vec::new(),
            examples: LabeledExamples::default(),
            annotations: None,
        }
    }

    /// Documents to ground rewrites in.
    pub fn with_documents(mut self, documents: Vec<String>) -> Self {
        self.documents = documents;
        self
    }

    /// Positive and negative documents for discriminative rewrites.
    pub fn with_examples(mut self, examples: LabeledExamples) -> Self {
        self.examples = examples;
        self
    }

    /// Expert notes passed to every rewrite prompt that accepts them.
    pub fn with_annotations(mut self, annotations: impl Into<String>) -> Self {
        let annotations = annotations.into();
        self.annotations = (!annotations.trim().is_empty()).then_some(annotations);
        self
    }
}

pub struct CriteriaOptimizer {
    retriever: Arc<dyn RetrievalGateway>,
    generator: StructuredGenerator,
    schema: ResponseSchema,
    policy: WeaknessPolicy,
    max_documents: usize,
    expert_choices: usize,
}

impl CriteriaOptimizer {
    pub fn new(
        retriever: Arc<dyn RetrievalGateway>,
        generator: StructuredGenerator,
        config: &OptimizerConfig,
    ) -> Result<Self, OptimizerError> {
        Ok(Self {
            retriever,
            generator,
            schema: ResponseSchema::improved_criterion()?,
            policy: config.policy(),
            max_documents: config.max_documents,
            expert_choices: config.expert_choices,
        })
    }

    pub fn policy(&self) -> &WeaknessPolicy {
        &self.policy
    }

    /// Replace every weak criterion using `strategy`.
    ///
    /// `importances[i]` belongs to the i-th criterion in key order. The key
    /// set of `criteria` never changes.
    pub async fn refine(
        &self,
        strategy: Strategy,
        criteria: &mut CriteriaSet,
        importances: &[f64],
        session: &mut RefinementSession<'_>,
    ) -> Result<RefinementReport, OptimizerError> {
        let weighted = criteria.pair_importances(importances)?;
        let weak: Vec<_> = self
            .policy
            .weak_criteria(&weighted)
            .into_iter()
            .cloned()
            .collect();
        info!(
            strategy = %strategy,
            weak = weak.len(),
            total = weighted.len(),
            "Refining weak criteria"
        );

        let mut report = RefinementReport::new(strategy);
        for criterion in weak {
            debug!(criterion = %criterion.name, importance = criterion.importance, "Weak criterion");
            let current = criterion.text.as_str();

            let replacement = match strategy {
                Strategy::Automated => Some(self.blind_candidates(current, None, 1).await?.remove(0)),
                Strategy::ExpertInTheLoop => {
                    Some(self.expert_in_the_loop(&criterion.name, current, session).await?)
                }
                Strategy::ContextAware => self.context_aware(current, session).await?,
                Strategy::ContextDiscriminative => {
                    Some(self.discriminative(&criterion.name, current, session).await?)
                }
                Strategy::Advanced => self.advanced(current, session).await?,
            };

            match replacement {
                Some(text) => {
                    let previous = criteria.replace(&criterion.name, text.clone())?;
                    info!(criterion = %criterion.name, old = %previous, new = %text, "Criterion replaced");
                    report.replacements.push(Replacement {
                        name: criterion.name,
                        previous,
                        replacement: text,
                    });
                }
                None => {
                    warn!(criterion = %criterion.name, "No candidates generated, criterion left unchanged");
                    report.unchanged.push(criterion.name);
                }
            }
        }

        Ok(report)
    }

    async fn improve(&self, prompt: &str) -> Result<String, OptimizerError> {
        debug!(prompt, "Requesting improved criterion");
        let text = self
            .generator
            .generate_text(prompt, &self.schema, fields::IMPROVED_CRITERION)
            .await?;
        debug!(candidate = %text, "Candidate criterion");
        Ok(text)
    }

    async fn blind_candidates(
        &self,
        current: &str,
        annotations: Option<&str>,
        count: usize,
    ) -> Result<Vec<String>, OptimizerError> {
        let prompt =
            prompts::render_blind_rewrite(current, annotations, &self.schema.render_instructions());
        let mut candidates = Vec::with_capacity(count);
        for _ in 0..count {
            candidates.push(self.improve(&prompt).await?);
        }
        Ok(candidates)
    }

    async fn expert_in_the_loop(
        &self,
        name: &str,
        current: &str,
        session: &mut RefinementSession<'_>,
    ) -> Result<String, OptimizerError> {
        let mut candidates = self
            .blind_candidates(current, session.annotations.as_deref(), self.expert_choices)
            .await?;

        while let Review::Annotate(notes) = session.arbiter.review(name, &candidates)? {
            info!(criterion = %name, "Regenerating candidates with expert annotations");
            candidates = self
                .blind_candidates(current, Some(&notes), self.expert_choices)
                .await?;
        }

        choose(&mut *session.arbiter, candidates)
    }

    /// Context for `query` in one document, rendered for a prompt.
    async fn document_context(&self, document: &str, query: &str) -> Result<String, OptimizerError> {
        let chunks = self.retriever.search(document, query).await?;
        Ok(ContextBundle::assemble([(query.to_string(), chunks)]).render())
    }

    /// One grounded candidate per document with any context, up to `max_documents`.
    async fn grounded_candidates(
        &self,
        current: &str,
        annotations: Option<&str>,
        documents: &[String],
    ) -> Result<Vec<String>, OptimizerError> {
        let instructions = self.schema.render_instructions();
        let mut candidates = Vec::new();

        for document in documents.iter().take(self.max_documents) {
            let context = self.document_context(document, current).await?;
            if context.is_empty() {
                debug!(document = %document, "No context for criterion, skipping document");
                continue;
            }
            let prompt =
                prompts::render_grounded_rewrite(&context, current, annotations, &instructions);
            candidates.push(self.improve(&prompt).await?);
        }

        Ok(candidates)
    }

    /// Collapse candidates into one; a single candidate passes through.
    async fn average(&self, mut candidates: Vec<String>) -> Result<Option<String>, OptimizerError> {
        match candidates.len() {
            0 => Ok(None),
            1 => Ok(candidates.pop()),
            _ => {
                let prompt =
                    prompts::render_averaging(&candidates, &self.schema.render_instructions());
                Ok(Some(self.improve(&prompt).await?))
            }
        }
    }

    async fn context_aware(
        &self,
        current: &str,
        session: &RefinementSession<'_>,
    ) -> Result<Option<String>, OptimizerError> {
        let candidates = self
            .grounded_candidates(current, None, &session.documents)
            .await?;
        self.average(candidates).await
    }

    async fn discriminative(
        &self,
        name: &str,
        current: &str,
        session: &RefinementSession<'_>,
    ) -> Result<String, OptimizerError> {
        let examples = session.examples.clone().capped(self.max_documents / 2);
        if examples.is_empty() {
            return Err(OptimizerError::MissingExamples {
                criterion: name.to_string(),
            });
        }
        info!(criterion = %name, examples = %prompts::describe_examples(&examples), "Discriminative refinement");

        let positive = self.joined_context(&examples.positive, current).await?;
        let negative = self.joined_context(&examples.negative, current).await?;
        let prompt = prompts::render_discriminative(
            current,
            &positive,
            &negative,
            &self.schema.render_instructions(),
        );
        self.improve(&prompt).await
    }

    async fn joined_context(&self, documents: &[String], query: &str) -> Result<String, OptimizerError> {
        let mut contexts = Vec::with_capacity(documents.len());
        for document in documents {
            let context = self.document_context(document, query).await?;
            if !context.is_empty() {
                contexts.push(context);
            }
        }
        Ok(contexts.join(CHUNK_SEPARATOR))
    }

    async fn advanced(
        &self,
        current: &str,
        session: &mut RefinementSession<'_>,
    ) -> Result<Option<String>, OptimizerError> {
        let candidates = self
            .grounded_candidates(current, session.annotations.as_deref(), &session.documents)
            .await?;

        let mut representatives = Vec::new();
        for group in group_candidates(candidates, self.expert_choices) {
            if let Some(representative) = self.average(group).await? {
                representatives.push(representative);
            }
        }
        if representatives.is_empty() {
            return Ok(None);
        }

        choose(&mut *session.arbiter, representatives).map(Some)
    }
}

fn choose(arbiter: &mut dyn Arbiter, mut candidates: Vec<String>) -> Result<String, OptimizerError> {
    let index = arbiter.choose_one(&candidates)?;
    if index >= candidates.len() {
        return Err(ArbiterError::InvalidChoice {
            index,
            available: candidates.len(),
        }
        .into());
    }
    Ok(candidates.swap_remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::Strategy;
    use crate::generation::tests::ScriptedGateway;
    use crate::resilience::RetryPolicy;
    use crate::screener::tests::FixedRetriever;
    use proptest::prelude::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn improved(text: &str) -> String {
        format!("```json\n{{\"improved_criterion\": \"{}\"}}\n```", text)
    }

    fn scripted(texts: &[&str]) -> Arc<ScriptedGateway> {
        let gateway = ScriptedGateway::default();
        gateway
            .outputs
            .lock()
            .extend(texts.iter().map(|t| Ok(improved(t))));
        Arc::new(gateway)
    }

    fn retriever() -> Arc<FixedRetriever> {
        Arc::new(FixedRetriever(BTreeMap::from([
            ("a".to_string(), vec!["context of a".to_string()]),
            ("b".to_string(), vec!["context of b".to_string()]),
            ("c".to_string(), vec!["context of c".to_string()]),
            ("empty".to_string(), vec![]),
        ])))
    }

    fn optimizer(gateway: Arc<ScriptedGateway>, config: OptimizerConfig) -> CriteriaOptimizer {
        CriteriaOptimizer::new(
            retriever(),
            StructuredGenerator::new(gateway, RetryPolicy::immediate(3)),
            &config,
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

    /// Arbiter that follows a script and records what it saw.
    #[derive(Default)]
    struct ScriptedArbiter {
        reviews: Vec<Review>,
        choice: usize,
        seen_reviews: Vec<Vec<String>>,
        seen_choices: Vec<Vec<String>>,
    }

    impl Arbiter for ScriptedArbiter {
        fn review(&mut self, _criterion: &str, candidates: &[String]) -> Result<Review, ArbiterError> {
            self.seen_reviews.push(candidates.to_vec());
            Ok(if self.reviews.is_empty() {
                Review::Accept
            } else {
                self.reviews.remove(0)
            })
        }

        fn choose_one(&mut self, candidates: &[String]) -> Result<usize, ArbiterError> {
            self.seen_choices.push(candidates.to_vec());
            Ok(self.choice)
        }
    }

    async fn automated(importances: &[f64], weak_above_threshold: bool) -> (CriteriaSet, RefinementReport) {
        let optimizer = optimizer(
            Arc::new(ScriptedGateway::repeating(improved("rewritten"))),
            OptimizerConfig {
                weak_above_threshold,
                ..OptimizerConfig::default()
            },
        );
        let mut criteria = criteria();
        let mut arbiter = AutoArbiter;
        let mut session = RefinementSession::new(&mut arbiter);
        let report = optimizer
            .refine(Strategy::Automated, &mut criteria, importances, &mut session)
            .await
            .unwrap();
        (criteria, report)
    }

    #[tokio::test]
    async fn test_polarity_weak_above_threshold() {
        let (criteria, report) = automated(&[0.05, 0.5], true).await;
        assert_eq!(criteria.get("Population"), Some("human subjects"));
        assert_eq!(criteria.get("Disease"), Some("rewritten"));
        assert_eq!(report.replacements.len(), 1);
        assert_eq!(report.replacements[0].previous, "thyroid cancer");
    }

    #[tokio::test]
    async fn test_polarity_weak_at_or_below_threshold() {
        let (criteria, _) = automated(&[0.05, 0.5], false).await;
        assert_eq!(criteria.get("Population"), Some("rewritten"));
        assert_eq!(criteria.get("Disease"), Some("thyroid cancer"));
    }

    #[tokio::test]
    async fn test_end_to_end_only_disease_replaced() {
        let (criteria, report) = automated(&[0.02, 0.3], true).await;
        assert_eq!(criteria.get("Population"), Some("human subjects"));
        assert_ne!(criteria.get("Disease"), Some("thyroid cancer"));
        assert_eq!(report.replacements[0].name, "Disease");
    }

    #[tokio::test]
    async fn test_importance_length_mismatch() {
        let optimizer = optimizer(Arc::new(ScriptedGateway::default()), OptimizerConfig::default());
        let mut criteria = criteria();
        let mut arbiter = AutoArbiter;
        let mut session = RefinementSession::new(&mut arbiter);
        let result = optimizer
            .refine(Strategy::Automated, &mut criteria, &[0.5], &mut session)
            .await;
        assert!(matches!(
            result,
            Err(OptimizerError::Criteria(CriteriaError::ImportanceMismatch {
                expected: 2,
                got: 1
            }))
        ));
    }

    #[tokio::test]
    async fn test_expert_annotation_regenerates_candidates() {
        let gateway = scripted(&["d1", "d2", "e1", "e2"]);
        let optimizer = optimizer(
            gateway.clone(),
            OptimizerConfig {
                expert_choices: 2,
                ..OptimizerConfig::default()
            },
        );
        let mut criteria = criteria();
        let mut arbiter = ScriptedArbiter {
            reviews: vec![Review::Annotate("only papillary carcinoma".to_string())],
            choice: 1,
            ..ScriptedArbiter::default()
        };

        {
            let mut session = RefinementSession::new(&mut arbiter);
            optimizer
                .refine(Strategy::ExpertInTheLoop, &mut criteria, &[0.0, 0.9], &mut session)
                .await
                .unwrap();
        }

        assert_eq!(criteria.get("Disease"), Some("e2"));
        assert_eq!(arbiter.seen_reviews, vec![vec!["d1", "d2"], vec!["e1", "e2"]]);
        let prompts = gateway.prompts.lock();
        assert!(prompts[..2].iter().all(|p| p.contains("if there are any: none")));
        assert!(prompts[2..].iter().all(|p| p.contains("only papillary carcinoma")));
    }

    #[tokio::test]
    async fn test_context_aware_averages_grounded_candidates() {
        let gateway = scripted(&["from a", "from b", "averaged"]);
        let optimizer = optimizer(gateway.clone(), OptimizerConfig::default());
        let mut criteria = criteria();
        let mut arbiter = AutoArbiter;
        let mut session = RefinementSession::new(&mut arbiter)
            .with_documents(vec!["a".to_string(), "empty".to_string(), "b".to_string()]);

        optimizer
            .refine(Strategy::ContextAware, &mut criteria, &[0.0, 0.9], &mut session)
            .await
            .unwrap();

        assert_eq!(criteria.get("Disease"), Some("averaged"));
        let prompts = gateway.prompts.lock();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[0].contains("context of a"));
        assert!(prompts[1].contains("context of b"));
        assert!(prompts[2].contains("1. from a\n2. from b"));
    }

    #[tokio::test]
    async fn test_context_aware_respects_max_documents() {
        let gateway = scripted(&["from a"]);
        let optimizer = optimizer(
            gateway.clone(),
            OptimizerConfig {
                max_documents: 1,
                ..OptimizerConfig::default()
            },
        );
        let mut criteria = criteria();
        let mut arbiter = AutoArbiter;
        let mut session = RefinementSession::new(&mut arbiter)
            .with_documents(vec!["a".to_string(), "b".to_string()]);

        optimizer
            .refine(Strategy::ContextAware, &mut criteria, &[0.0, 0.9], &mut session)
            .await
            .unwrap();

        // a single candidate passes through without an averaging call
        assert_eq!(criteria.get("Disease"), Some("from a"));
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn test_context_aware_without_documents_leaves_criterion() {
        let gateway = Arc::new(ScriptedGateway::default());
        let optimizer = optimizer(gateway.clone(), OptimizerConfig::default());
        let mut criteria = criteria();
        let mut arbiter = AutoArbiter;
        let mut session = RefinementSession::new(&mut arbiter);

        let report = optimizer
            .refine(Strategy::ContextAware, &mut criteria, &[0.0, 0.9], &mut session)
            .await
            .unwrap();

        assert!(report.is_empty());
        assert_eq!(report.unchanged, vec!["Disease"]);
        assert_eq!(criteria.get("Disease"), Some("thyroid cancer"));
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn test_discriminative_contrasts_examples() {
        let gateway = scripted(&["sharper"]);
        let optimizer = optimizer(
            gateway.clone(),
            OptimizerConfig {
                max_documents: 2,
                ..OptimizerConfig::default()
            },
        );
        let mut criteria = criteria();
        let mut arbiter = AutoArbiter;
        let mut session = RefinementSession::new(&mut arbiter).with_examples(LabeledExamples {
            positive: vec!["a".to_string(), "c".to_string()],
            negative: vec!["b".to_string()],
        });

        optimizer
            .refine(Strategy::ContextDiscriminative, &mut criteria, &[0.0, 0.9], &mut session)
            .await
            .unwrap();

        assert_eq!(criteria.get("Disease"), Some("sharper"));
        let prompts = gateway.prompts.lock();
        assert_eq!(prompts.len(), 1);
        let positive_at = prompts[0].find("context of a").unwrap();
        let negative_at = prompts[0].find("context of b").unwrap();
        assert!(positive_at < negative_at);
        // capped at max_documents / 2 per side
        assert!(!prompts[0].contains("context of c"));
    }

    #[tokio::test]
    async fn test_discriminative_requires_examples() {
        let optimizer = optimizer(Arc::new(ScriptedGateway::default()), OptimizerConfig::default());
        let mut criteria = criteria();
        let mut arbiter = AutoArbiter;
        let mut session = RefinementSession::new(&mut arbiter);

        let result = optimizer
            .refine(Strategy::ContextDiscriminative, &mut criteria, &[0.0, 0.9], &mut session)
            .await;

        assert!(matches!(
            result,
            Err(OptimizerError::MissingExamples { criterion }) if criterion == "Disease"
        ));
        assert_eq!(criteria.get("Disease"), Some("thyroid cancer"));
    }

    #[tokio::test]
    async fn test_advanced_groups_average_and_choose() {
        let gateway = scripted(&["ga", "gb", "gc", "avg-ab"]);
        let optimizer = optimizer(
            gateway.clone(),
            OptimizerConfig {
                expert_choices: 2,
                ..OptimizerConfig::default()
            },
        );
        let mut criteria = criteria();
        let mut arbiter = ScriptedArbiter {
            choice: 1,
            ..ScriptedArbiter::default()
        };

        {
            let mut session = RefinementSession::new(&mut arbiter)
                .with_documents(vec!["a".to_string(), "b".to_string(), "c".to_string()])
                .with_annotations("adults only");
            optimizer
                .refine(Strategy::Advanced, &mut criteria, &[0.0, 0.9], &mut session)
                .await
                .unwrap();
        }

        assert_eq!(arbiter.seen_choices, vec![vec!["avg-ab", "gc"]]);
        assert_eq!(criteria.get("Disease"), Some("gc"));
        let prompts = gateway.prompts.lock();
        assert_eq!(prompts.len(), 4);
        assert!(prompts[..3].iter().all(|p| p.contains("adults only")));
    }

    #[tokio::test]
    async fn test_out_of_range_choice_is_error() {
        let optimizer = optimizer(
            scripted(&["x", "y", "z"]),
            OptimizerConfig::default(),
        );
        let mut criteria = criteria();
        let mut arbiter = ScriptedArbiter {
            choice: 7,
            ..ScriptedArbiter::default()
        };
        let mut session = RefinementSession::new(&mut arbiter);

        let result = optimizer
            .refine(Strategy::ExpertInTheLoop, &mut criteria, &[0.0, 0.9], &mut session)
            .await;
        assert!(matches!(
            result,
            Err(OptimizerError::Arbiter(ArbiterError::InvalidChoice { index: 7, available: 3 }))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_refinement_preserves_key_set(
            strategy in prop::sample::select(Strategy::ALL.to_vec()),
            importances in prop::collection::vec(0.0f64..1.0, 1..6),
            weak_above_threshold in any::<bool>(),
        ) {
            let pairs: Vec<(String, String)> = (0..importances.len())
                .map(|i| (format!("C{}", i), format!("text {}", i)))
                .collect();
            let original = CriteriaSet::from_pairs("prop", pairs).unwrap();
            let mut criteria = original.clone();

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build().unwrap();
            let report = runtime.block_on(async {
                let optimizer = optimizer(
                    Arc::new(ScriptedGateway::repeating(improved("rewritten"))),
                    OptimizerConfig { weak_above_threshold, ..OptimizerConfig::default() },
                );
                let mut arbiter = AutoArbiter;
                let mut session = RefinementSession::new(&mut arbiter)
                    .with_documents(vec!["a".to_string(), "b".to_string(), "c".to_string()])
                    .with_examples(LabeledExamples {
                        positive: vec!["a".to_string()],
                        negative: vec!["b".to_string()],
                    });
                optimizer
                    .refine(strategy, &mut criteria, &importances, &mut session)
                    .await
                    .unwrap()
            });

            let before: Vec<&str> = original.names().collect();
            let after: Vec<&str> = criteria.names().collect();
            prop_assert_eq!(before, after);

            let policy = WeaknessPolicy::new(0.1, weak_above_threshold);
            let expected: BTreeSet<String> = original
                .names()
                .zip(&importances)
                .filter(|(_, imp)| policy.is_weak(**imp))
                .map(|(name, _)| name.to_string())
                .collect();
            let replaced: BTreeSet<String> =
                report.replacements.iter().map(|r| r.name.clone()).collect();
            prop_assert_eq!(replaced, expected);
            prop_assert!(report.unchanged.is_empty());
        }
    }
}
