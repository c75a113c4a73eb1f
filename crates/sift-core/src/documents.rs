//! Selection of the documents a screening round runs over.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Which documents a round screens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DocumentSelection {
    /// Screen a random subset instead of every document
    pub random_subset: bool,

    /// Size of the random subset
    pub subset_size: usize,

    /// Seed for the subset draw
    pub seed: u64,
}

impl Default for DocumentSelection {
    fn default() -> Self {
        Self {
            random_subset: false,
            subset_size: 5,
            seed: 42,
        }
    }
}

impl DocumentSelection {
    /// Apply the selection to sorted document ids.
    ///
    /// The subset is drawn with a seeded generator and returned in the
    /// original order, so the same inputs always give the same round.
    pub fn select(&self, mut documents: Vec<String>) -> Vec<String> {
        documents.sort();
        documents.dedup();

        if !self.random_subset || self.subset_size >= documents.len() {
            return documents;
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut picked: Vec<usize> = (0..documents.len()).collect();
        picked.shuffle(&mut rng);
        picked.truncate(self.subset_size);
        picked.sort_unstable();

        picked.into_iter().map(|i| documents[i].clone()).collect()
    }
}
