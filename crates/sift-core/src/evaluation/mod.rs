//! Evaluation of a screening round against the gold standard.
//!
//! Supplies the per-criterion importance vector the optimizer consumes,
//! plus agreement metrics for reporting.

mod forest;
mod metrics;

pub use forest::{ForestConfig, RandomForest};
pub use metrics::{
    accuracy, cohen_kappa, f_score, precision, recall, smoothed_mcc, specificity,
    ConfusionMatrix, Metrics,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::criteria::CriteriaSet;
use crate::gold::{examples_from_labels, GoldStandard};
use crate::types::{LabeledExamples, VerdictRecord};

#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error("No verdict records cover every criterion and carry a gold label")]
    NoTrainingRows,
}

/// Importance of one criterion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriterionImportance {
    pub name: String,
    pub importance: f64,
}

/// Everything the evaluator reports for one round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationReport {
    pub confusion: ConfusionMatrix,
    pub metrics: Metrics,
    pub importances: Vec<CriterionImportance>,
    pub training_rows: usize,
}

impl EvaluationReport {
    /// Importance values in criteria key order.
    pub fn importance_vector(&self) -> Vec<f64> {
        self.importances.iter().map(|c| c.importance).collect()
    }
}

/// Feature rows built from verdict records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub rows: Vec<Vec<bool>>,
    pub labels: Vec<bool>,
}

impl TrainingSet {
    /// One row per record whose verdicts cover every criterion and whose
    /// document has a gold label; columns follow criteria key order.
    pub fn build(criteria: &CriteriaSet, records: &[VerdictRecord], gold: &GoldStandard) -> Self {
        let mut set = Self::default();
        for record in records {
            let Some(label) = gold.label(&record.document_id) else {
                continue;
            };
            let row: Option<Vec<bool>> = criteria
                .names()
                .map(|name| record.verdicts.get(name).copied())
                .collect();
            if let Some(row) = row {
                set.rows.push(row);
                set.labels.push(label);
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Trains the importance classifier and computes metrics.
#[derive(Debug, Clone)]
pub struct Evaluator {
    forest: RandomForest,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(ForestConfig::default())
    }
}

impl Evaluator {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            forest: RandomForest::new(config),
        }
    }

    /// Per-criterion importances, aligned to the criteria key order.
    pub fn feature_importance(
        &self,
        criteria: &CriteriaSet,
        records: &[VerdictRecord],
        gold: &GoldStandard,
    ) -> Result<Vec<f64>, EvaluationError> {
        let training = TrainingSet::build(criteria, records, gold);
        if training.is_empty() {
            return Err(EvaluationError::NoTrainingRows);
        }
        debug!(rows = training.len(), "Training importance forest");

        let importances = self.forest.feature_importances(&training.rows, &training.labels);
        for (name, importance) in criteria.names().zip(&importances) {
            info!(criterion = %name, importance = *importance, "Feature importance");
        }
        Ok(importances)
    }

    /// Confusion matrix and metrics for a round.
    pub fn metrics(&self, records: &[VerdictRecord], gold: &GoldStandard) -> (ConfusionMatrix, Metrics) {
        let matrix = ConfusionMatrix::from_records(records, gold);
        let decided = records.iter().filter(|r| r.relevant.is_some()).count();
        let metrics = Metrics::compute(&matrix, decided, records.len());
        (matrix, metrics)
    }

    /// Full evaluation: metrics plus importances.
    pub fn evaluate(
        &self,
        criteria: &CriteriaSet,
        records: &[VerdictRecord],
        gold: &GoldStandard,
    ) -> Result<EvaluationReport, EvaluationError> {
        let (confusion, metrics) = self.metrics(records, gold);
        info!(
            mcc = metrics.mcc,
            f1 = metrics.f1,
            accuracy = metrics.accuracy,
            "Evaluated screening round"
        );

        let training_rows = TrainingSet::build(criteria, records, gold).len();
        let importances = self
            .feature_importance(criteria, records, gold)?
            .into_iter()
            .zip(criteria.names())
            .map(|(importance, name)| CriterionImportance {
                name: name.to_string(),
                importance,
            })
            .collect();

        Ok(EvaluationReport {
            confusion,
            metrics,
            importances,
            training_rows,
        })
    }

    /// Examples drawn from the round's own predictions, capped per side.
    pub fn prediction_examples(records: &[VerdictRecord], per_side: usize) -> LabeledExamples {
        examples_from_labels(
            records.iter().map(|r| (r.document_id.as_str(), r.relevant)),
            per_side,
        )
    }
}
