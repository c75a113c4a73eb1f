//! Screening protocol: one verdict record per runnable document.
//!
//! For each document the screener retrieves context per criterion, asks
//! the model which criteria hold, and stores the resulting record. A failing
//! document is logged and skipped; only an exhausted token budget stops
//! the batch.

use serde::{Deserialize, Serialize};
use std::iter;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use sift_core::response::OVERALL_KEY;
use sift_core::verdict::retain_known;
use sift_core::{
    ContextBundle, CriteriaSet, FormatError, ResponseError, ResponseSchema, ScreeningAnswer,
    VerdictRecord,
};

use crate::gateway::{GatewayError, RetrievalGateway};
use crate::generation::{GenerationError, StructuredGenerator};
use crate::prompts;
use crate::store::{StoreError, VerdictStore};

/// Note stored on records screened without any retrieved context.
pub const NO_CONTEXT_NOTE: &str = "no context retrieved for any criterion";

#[derive(Error, Debug)]
pub enum ScreeningError {
    #[error("Response schema error: {0}")]
    Schema(#[from] ResponseError),

    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] GatewayError),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Unusable screening answer: {0}")]
    Answer(#[from] FormatError),

    #[error("Failed to store verdict: {0}")]
    Store(#[from] StoreError),
}

impl ScreeningError {
    /// Errors that make screening further documents pointless.
    fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScreeningError::Generation(GenerationError::Gateway(
                GatewayError::BudgetExceeded { .. }
            )) | ScreeningError::Retrieval(GatewayError::BudgetExceeded { .. })
        )
    }
}

/// Counts for one screening round.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreeningSummary {
    /// Documents with a decided or indeterminate record
    pub screened: usize,

    /// Of those, records without a relevance decision
    pub indeterminate: usize,

    /// Documents skipped after an error
    pub failed: usize,
}

pub struct Screener {
    retriever: Arc<dyn RetrievalGateway>,
    generator: StructuredGenerator,
    store: Arc<dyn VerdictStore>,
    schema: ResponseSchema,
}

impl Screener {
    pub fn new(
        retriever: Arc<dyn RetrievalGateway>,
        generator: StructuredGenerator,
        store: Arc<dyn VerdictStore>,
    ) -> Result<Self, ScreeningError> {
        Ok(Self {
            retriever,
            generator,
            store,
            schema: ResponseSchema::screening()?,
        })
    }

    /// Screen every document against the criteria and persist the records.
    pub async fn run(
        &self,
        criteria: &CriteriaSet,
        documents: &[String],
    ) -> Result<ScreeningSummary, ScreeningError> {
        let mut summary = ScreeningSummary::default();
        let total = documents.len();

        for (i, document) in documents.iter().enumerate() {
            info!(document = %document, "Processing document {} of {}", i + 1, total);

            let outcome = match self.screen_document(criteria, document).await {
                Ok(record) => {
                    let indeterminate = record.relevant.is_none();
                    self.store
                        .save(record)
                        .map(|_| indeterminate)
                        .map_err(ScreeningError::from)
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(indeterminate) => {
                    summary.screened += 1;
                    if indeterminate {
                        summary.indeterminate += 1;
                    }
                }
                Err(e) if e.is_fatal() => {
                    error!(document = %document, error = %e, "Stopping screening");
                    return Err(e);
                }
                Err(e) => {
                    error!(document = %document, error = %e, "Skipping document");
                    summary.failed += 1;
                }
            }
        }

        info!(
            screened = summary.screened,
            indeterminate = summary.indeterminate,
            failed = summary.failed,
            "Screening round finished"
        );
        Ok(summary)
    }

    /// Screen one document without persisting the result.
    pub async fn screen_document(
        &self,
        criteria: &CriteriaSet,
        document: &str,
    ) -> Result<VerdictRecord, ScreeningError> {
        let mut results = Vec::with_capacity(criteria.len());
        for criterion in criteria.iter() {
            let chunks = self.retriever.search(document, &criterion.text).await?;
            results.push((criterion.name.clone(), chunks));
        }

        let bundle = ContextBundle::assemble(results);
        if bundle.is_empty() {
            warn!(document = %document, "No context retrieved, recording as indeterminate");
            return Ok(VerdictRecord::indeterminate(document, NO_CONTEXT_NOTE));
        }

        let prompt = prompts::render_screening(
            &bundle.render(),
            criteria,
            &self.schema.render_instructions(),
        );
        let response = self.generator.generate(&prompt, &self.schema).await?;
        let answer = ScreeningAnswer::from_response(&response)?;

        let names: Vec<&str> = criteria.names().collect();
        let (verdicts, dropped) = retain_known(answer.criteria, names.iter().copied());
        if !dropped.is_empty() {
            warn!(document = %document, dropped = ?dropped, "Dropping verdicts for unknown criteria");
        }
        let (reasoning, _) = retain_known(
            answer.reasoning,
            names.iter().copied().chain(iter::once(OVERALL_KEY)),
        );

        let record = VerdictRecord::screened(document, names.iter().copied(), verdicts, reasoning);
        if let Some(note) = &record.note {
            warn!(document = %document, note = %note, "Answer incomplete, recording as indeterminate");
        }
        info!(document = %document, relevant = ?record.relevant, "Document screened");
        Ok(record)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::gateway::GenerationGateway;
    use crate::generation::tests::ScriptedGateway;
    use crate::resilience::{Phase, RetryPolicy};
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use sift_core::ScoredChunk;
    use std::collections::BTreeMap;

    /// Retriever returning the same chunks for every query of a document.
    pub(crate) struct FixedRetriever(pub BTreeMap<String, Vec<String>>);

    #[async_trait]
    impl RetrievalGateway for FixedRetriever {
        async fn search(
            &self,
            document_id: &str,
            _query: &str,
        ) -> Result<Vec<ScoredChunk>, GatewayError> {
            Ok(self
                .0
                .get(document_id)
                .map(|chunks| chunks.iter().map(|c| ScoredChunk::new(c.clone(), 0.9)).collect())
                .unwrap_or_default())
        }

        async fn documents(&self) -> Result<Vec<String>, GatewayError> {
            Ok(self.0.keys().cloned().collect())
        }
    }

    fn criteria() -> CriteriaSet {
        CriteriaSet::from_pairs(
            "review",
            [("Population", "human subjects"), ("Disease", "thyroid cancer")],
        )
        .unwrap()
    }

    fn retriever() -> Arc<FixedRetriever> {
        Arc::new(FixedRetriever(BTreeMap::from([
            (
                "smith-2021".to_string(),
                vec!["120 patients with thyroid cancer".to_string()],
            ),
            ("lee-2019".to_string(), vec!["mice on a diet".to_string()]),
            ("empty-2000".to_string(), vec![]),
        ])))
    }

    fn screener(gateway: Arc<dyn GenerationGateway>) -> (Screener, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let screener = Screener::new(
            retriever(),
            StructuredGenerator::new(gateway, RetryPolicy::immediate(3)),
            store.clone(),
        )
        .unwrap();
        (screener, store)
    }

    const SMITH: &str = r#"```json
{"title": "Smith 2021", "criteria": {"Population": true, "Disease": true}, "reasoning": {"Population": "patients", "Disease": "thyroid cancer cohort"}}
```"#;

    const LEE: &str = r#"{"title": "Lee 2019", "criteria": {"Population": "no", "Disease": false, "Species": true}, "reasoning": "animal study"}"#;

    #[tokio::test]
    async fn test_run_stores_one_record_per_document() {
        let gateway = Arc::new(ScriptedGateway::new([LEE, SMITH]));
        let (screener, store) = screener(gateway.clone());
        let docs = vec!["lee-2019".to_string(), "smith-2021".to_string()];

        let summary = screener.run(&criteria(), &docs).await.unwrap();

        assert_eq!(
            summary,
            ScreeningSummary {
                screened: 2,
                indeterminate: 0,
                failed: 0
            }
        );
        let labels = store.load_all().unwrap();
        assert_eq!(labels.get("smith-2021"), Some(&Some(true)));
        assert_eq!(labels.get("lee-2019"), Some(&Some(false)));
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test]
    async fn test_unknown_criteria_are_dropped() {
        let gateway = Arc::new(ScriptedGateway::new([LEE]));
        let (screener, _) = screener(gateway);

        let record = screener
            .screen_document(&criteria(), "lee-2019")
            .await
            .unwrap();

        assert_eq!(record.verdicts.len(), 2);
        assert!(!record.verdicts.contains_key("Species"));
        assert_eq!(record.reasoning.len(), 1);
        assert_eq!(
            record.reasoning.get(OVERALL_KEY).map(String::as_str),
            Some("animal study")
        );
    }

    #[tokio::test]
    async fn test_partial_answer_is_indeterminate() {
        let gateway = Arc::new(ScriptedGateway::new([
            r#"{"title": "Smith 2021", "criteria": {"Population": true}, "reasoning": {"Population": "patients"}}"#,
        ]));
        let (screener, store) = screener(gateway);
        let docs = vec!["smith-2021".to_string()];

        let summary = screener.run(&criteria(), &docs).await.unwrap();

        assert_eq!(summary.indeterminate, 1);
        let records = store.records().unwrap();
        assert_eq!(records[0].relevant, None);
        assert_eq!(records[0].verdicts.len(), 1);
        assert_eq!(
            records[0].note.as_deref(),
            Some("no verdict from the model for: Disease")
        );
    }

    #[tokio::test]
    async fn test_empty_context_skips_generation() {
        let gateway = Arc::new(ScriptedGateway::default());
        let (screener, store) = screener(gateway.clone());

        let summary = screener
            .run(&criteria(), &["empty-2000".to_string(), "unknown".to_string()])
            .await
            .unwrap();

        assert_eq!(summary.screened, 2);
        assert_eq!(summary.indeterminate, 2);
        assert_eq!(gateway.calls(), 0);
        let records = store.records().unwrap();
        assert_eq!(records[0].relevant, None);
        assert_eq!(records[0].note.as_deref(), Some(NO_CONTEXT_NOTE));
    }

    #[tokio::test]
    async fn test_failed_document_does_not_abort_batch() {
        let gateway = Arc::new(ScriptedGateway::new([SMITH]));
        gateway
            .outputs
            .lock()
            .push_front(Err("connection reset".to_string()));
        let (screener, store) = screener(gateway);
        let docs = vec!["lee-2019".to_string(), "smith-2021".to_string()];

        let summary = screener.run(&criteria(), &docs).await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.screened, 1);
        assert!(!store.load_all().unwrap().contains_key("lee-2019"));
    }

    #[tokio::test]
    async fn test_budget_exhaustion_stops_batch() {
        struct Broke;

        #[async_trait]
        impl GenerationGateway for Broke {
            async fn complete(&self, _prompt: &str) -> Result<String, GatewayError> {
                Err(GatewayError::BudgetExceeded {
                    phase: Phase::Screening,
                })
            }
        }

        let (screener, store) = screener(Arc::new(Broke));
        let docs = vec!["lee-2019".to_string(), "smith-2021".to_string()];

        let result = screener.run(&criteria(), &docs).await;

        assert!(result.is_err());
        assert!(store.records().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prompt_carries_context_and_criteria() {
        let gateway = Arc::new(ScriptedGateway::new([SMITH]));
        let (screener, _) = screener(gateway.clone());

        screener
            .screen_document(&criteria(), "smith-2021")
            .await
            .unwrap();

        let prompts = gateway.prompts.lock();
        // identical chunks for both criteria stay separate sections
        assert_eq!(prompts[0].matches("120 patients with thyroid cancer").count(), 2);
        assert!(prompts[0].contains("- Disease: thyroid cancer"));
        assert!(prompts[0].contains("\"criteria\""));
    }
}
