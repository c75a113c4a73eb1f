//! Agreement metrics over a predicted-vs-gold confusion matrix.

use serde::{Deserialize, Serialize};

use crate::gold::GoldStandard;
use crate::types::VerdictRecord;

/// Counts of predicted vs gold relevance.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_positives: u64,
    pub true_negatives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
}

impl ConfusionMatrix {
    pub fn new(tp: u64, tn: u64, fp: u64, fn_: u64) -> Self {
        Self {
            true_positives: tp,
            true_negatives: tn,
            false_positives: fp,
            false_negatives: fn_,
        }
    }

    /// Compare predictions with the gold standard.
    ///
    /// Indeterminate records and documents without a gold label are skipped.
    pub fn from_records(records: &[VerdictRecord], gold: &GoldStandard) -> Self {
        let mut matrix = Self::default();
        for record in records {
            let (Some(predicted), Some(actual)) = (record.relevant, gold.label(&record.document_id))
            else {
                continue;
            };
            match (predicted, actual) {
                (true, true) => matrix.true_positives += 1,
                (false, false) => matrix.true_negatives += 1,
                (true, false) => matrix.false_positives += 1,
                (false, true) => matrix.false_negatives += 1,
            }
        }
        matrix
    }

    pub fn total(&self) -> u64 {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }
}

/// Every agreement metric reported for a screening round.
///
/// A ratio whose denominator is zero is reported as 0.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Metrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub mcc: f64,
    pub cohen_kappa: f64,
    pub pabak: f64,
    pub fowlkes_mallows: f64,
    pub specificity: f64,
    pub sensitivity: f64,
    pub accuracy: f64,
    pub completion_rate: f64,
}

impl Metrics {
    /// Compute metrics from a confusion matrix.
    ///
    /// `decided` and `total` are the number of records with a relevance
    /// verdict and the number of records overall.
    pub fn compute(matrix: &ConfusionMatrix, decided: usize, total: usize) -> Self {
        let precision = precision(matrix);
        let recall = recall(matrix);
        let accuracy = accuracy(matrix);

        Self {
            precision,
            recall,
            f1: f_score(matrix),
            mcc: smoothed_mcc(matrix),
            cohen_kappa: cohen_kappa(matrix),
            pabak: 2.0 * accuracy - 1.0,
            fowlkes_mallows: (precision * recall).sqrt(),
            specificity: specificity(matrix),
            sensitivity: recall,
            accuracy,
            completion_rate: ratio(decided as f64, total as f64),
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn counts(m: &ConfusionMatrix) -> (f64, f64, f64, f64) {
    (
        m.true_positives as f64,
        m.true_negatives as f64,
        m.false_positives as f64,
        m.false_negatives as f64,
    )
}

pub fn precision(m: &ConfusionMatrix) -> f64 {
    let (tp, _, fp, _) = counts(m);
    ratio(tp, tp + fp)
}

pub fn recall(m: &ConfusionMatrix) -> f64 {
    let (tp, _, _, fn_) = counts(m);
    ratio(tp, tp + fn_)
}

pub fn specificity(m: &ConfusionMatrix) -> f64 {
    let (_, tn, fp, _) = counts(m);
    ratio(tn, tn + fp)
}

pub fn accuracy(m: &ConfusionMatrix) -> f64 {
    let (tp, tn, _, _) = counts(m);
    ratio(tp + tn, m.total() as f64)
}

/// F1 as `tp / (tp + (fp + fn) / 2)`.
pub fn f_score(m: &ConfusionMatrix) -> f64 {
    let (tp, _, fp, fn_) = counts(m);
    ratio(tp, tp + 0.5 * (fp + fn_))
}

/// Matthews correlation coefficient with one added to every cell.
///
/// The smoothing keeps the denominator positive; the result is clamped to
/// [-1, 1] against rounding.
pub fn smoothed_mcc(m: &ConfusionMatrix) -> f64 {
    let (tp, tn, fp, fn_) = counts(m);
    let (tp, tn, fp, fn_) = (tp + 1.0, tn + 1.0, fp + 1.0, fn_ + 1.0);
    let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
    ratio(tp * tn - fp * fn_, denominator).clamp(-1.0, 1.0)
}

pub fn cohen_kappa(m: &ConfusionMatrix) -> f64 {
    let (tp, tn, fp, fn_) = counts(m);
    let n = m.total() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let observed = (tp + tn) / n;
    let expected = ((tp + fp) * (tp + fn_) + (tn + fn_) * (tn + fp)) / (n * n);
    ratio(observed - expected, 1.0 - expected)
}
