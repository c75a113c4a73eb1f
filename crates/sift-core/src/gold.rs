//! Gold-standard relevance labels.
//!
//! A gold standard is a mapping of document id to relevance, loaded from
//! JSON or YAML:
//!
//! ```yaml
//! "Radioiodine outcomes in papillary thyroid cancer": true
//! "Goitre prevalence in coastal regions": false
//! "Unlabeled preprint": null
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::types::LabeledExamples;

#[derive(Error, Debug)]
pub enum GoldStandardError {
    #[error("Failed to read gold standard: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Reference relevance labels keyed by document id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct GoldStandard {
    labels: BTreeMap<String, Option<bool>>,
}

impl GoldStandard {
    pub fn new(labels: BTreeMap<String, Option<bool>>) -> Self {
        Self { labels }
    }

    pub fn from_json(json: &str) -> Result<Self, GoldStandardError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, GoldStandardError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from a file; `.json` files are read as JSON, everything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GoldStandardError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    /// The label for a document, if it has one.
    pub fn label(&self, document_id: &str) -> Option<bool> {
        self.labels.get(document_id).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Positive and negative examples, in id order, capped per side.
    pub fn examples(&self, per_side: usize) -> LabeledExamples {
        examples_from_labels(self.labels.iter().map(|(k, v)| (k.as_str(), *v)), per_side)
    }
}

/// Split labeled documents into positive and negative examples.
pub fn examples_from_labels<'a>(
    labels: impl IntoIterator<Item = (&'a str, Option<bool>)>,
    per_side: usize,
) -> LabeledExamples {
    let mut examples = LabeledExamples::default();
    for (id, label) in labels {
        match label {
            Some(true) => examples.positive.push(id.to_string()),
            Some(false) => examples.negative.push(id.to_string()),
            None => {}
        }
    }
    examples.capped(per_side)
}
