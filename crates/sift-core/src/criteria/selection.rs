//! Weak-criterion selection from classifier importances.

use serde::{Deserialize, Serialize};

/// A criterion paired with the importance the classifier assigned to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightedCriterion {
    pub name: String,
    pub text: String,
    pub importance: f64,
}

/// Decides which criteria count as weak.
///
/// `weak_above_threshold` flips the meaning: when true a criterion is weak
/// iff its importance is strictly above the threshold, when false iff it is
/// at or below it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WeaknessPolicy {
    pub threshold: f64,
    pub weak_above_threshold: bool,
}

impl Default for WeaknessPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.1,
            weak_above_threshold: true,
        }
    }
}

impl WeaknessPolicy {
    pub fn new(threshold: f64, weak_above_threshold: bool) -> Self {
        Self {
            threshold,
            weak_above_threshold,
        }
    }

    pub fn is_weak(&self, importance: f64) -> bool {
        (importance > self.threshold) == self.weak_above_threshold
    }

    /// Weak criteria, in key order.
    pub fn weak_criteria<'a>(&self, weighted: &'a [WeightedCriterion]) -> Vec<&'a WeightedCriterion> {
        weighted.iter().filter(|w| self.is_weak(w.importance)).collect()
    }
}
