//! Seeded random forest over boolean features, used only for its
//! mean-decrease-in-impurity feature importances.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Forest hyperparameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees
    pub trees: usize,

    /// Seed for bootstrap samples and feature draws
    pub seed: u64,

    /// Depth limit; unlimited when `None`
    pub max_depth: Option<usize>,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            trees: 500,
            seed: 42,
            max_depth: None,
        }
    }
}

/// Gini random forest classifier for boolean rows and labels.
#[derive(Debug, Clone)]
pub struct RandomForest {
    config: ForestConfig,
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<bool>],
    labels: &'a [bool],
    features_per_split: usize,
    max_depth: Option<usize>,
    importances: Vec<f64>,
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}

impl TreeBuilder<'_> {
    fn grow(&mut self, sample: &[usize], depth: usize, rng: &mut StdRng) {
        let n = sample.len();
        let positives = sample.iter().filter(|&&i| self.labels[i]).count();
        let impurity = gini(positives, n);

        if n < 2 || impurity == 0.0 || self.max_depth.is_some_and(|max| depth >= max) {
            return;
        }

        let n_features = self.importances.len();
        let mut order: Vec<usize> = (0..n_features).collect();
        order.shuffle(rng);

        // (feature, decrease); keep inspecting past the draw until a valid
        // split turns up
        let mut best: Option<(usize, f64)> = None;
        for (inspected, &feature) in order.iter().enumerate() {
            if inspected >= self.features_per_split && best.is_some() {
                break;
            }

            let (mut left_n, mut left_pos) = (0usize, 0usize);
            for &i in sample {
                if self.rows[i][feature] {
                    left_n += 1;
                    if self.labels[i] {
                        left_pos += 1;
                    }
                }
            }
            let right_n = n - left_n;
            if left_n == 0 || right_n == 0 {
                continue;
            }
            let right_pos = positives - left_pos;
            let decrease = n as f64 * impurity
                - left_n as f64 * gini(left_pos, left_n)
                - right_n as f64 * gini(right_pos, right_n);

            if best.map_or(true, |(_, d)| decrease > d) {
                best = Some((feature, decrease));
            }
        }

        let Some((feature, decrease)) = best else {
            return;
        };

        self.importances[feature] += decrease.max(0.0);
        let (left, right): (Vec<usize>, Vec<usize>) =
            sample.iter().partition(|&&i| self.rows[i][feature]);
        self.grow(&left, depth + 1, rng);
        self.grow(&right, depth + 1, rng);
    }
}

fn normalize(values: &mut [f64]) -> bool {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        values.iter_mut().for_each(|v| *v /= sum);
        true
    } else {
        false
    }
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self { config }
    }

    /// Train on `rows` and return one importance per feature.
    ///
    /// Importances sum to 1, or are all zero when no tree could split.
    /// Every row must have the same length.
    pub fn feature_importances(&self, rows: &[Vec<bool>], labels: &[bool]) -> Vec<f64> {
        let n_features = rows.first().map_or(0, Vec::len);
        let mut total = vec![0.0; n_features];
        if rows.is_empty() || n_features == 0 || rows.len() != labels.len() {
            return total;
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let features_per_split = ((n_features as f64).sqrt().floor() as usize).max(1);

        for _ in 0..self.config.trees {
            let sample: Vec<usize> = (0..rows.len())
                .map(|_| rng.gen_range(0..rows.len()))
                .collect();

            let mut builder = TreeBuilder {
                rows,
                labels,
                features_per_split,
                max_depth: self.config.max_depth,
                importances: vec![0.0; n_features],
            };
            builder.grow(&sample, 0, &mut rng);

            if normalize(&mut builder.importances) {
                for (acc, v) in total.iter_mut().zip(&builder.importances) {
                    *acc += v;
                }
            }
        }

        normalize(&mut total);
        total
    }
}
