//! Criteria set parsing from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::schema::validate_criteria_schema;
use super::selection::WeightedCriterion;

/// Errors that can occur when loading or mutating criteria.
#[derive(Error, Debug)]
pub enum CriteriaError {
    #[error("Failed to read criteria file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Criteria validation failed: {0}")]
    ValidationError(String),

    #[error("Unknown criterion: {0}")]
    UnknownCriterion(String),

    #[error("Importance vector has {got} entries but the criteria set has {expected}")]
    ImportanceMismatch { expected: usize, got: usize },
}

/// A single named criterion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Criterion {
    /// Stable key (e.g., "Population")
    pub name: String,

    /// The natural-language rule
    pub text: String,
}

/// An ordered set of criteria.
///
/// The key set never changes after construction: criteria can only be
/// replaced in place, so iteration order stays aligned with any importance
/// vector computed over the same set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CriteriaSet {
    /// Human-readable name of the review
    pub name: String,

    /// What the review is looking for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    criteria: Vec<Criterion>,
}

impl CriteriaSet {
    /// Build a criteria set from `(name, text)` pairs, in order.
    pub fn from_pairs<N, T>(
        name: impl Into<String>,
        pairs: impl IntoIterator<Item = (N, T)>,
    ) -> Result<Self, CriteriaError>
    where
        N: Into<String>,
        T: Into<String>,
    {
        let set = Self {
            name: name.into(),
            description: None,
            criteria: pairs
                .into_iter()
                .map(|(n, t)| Criterion {
                    name: n.into(),
                    text: t.into(),
                })
                .collect(),
        };
        set.validate()?;
        Ok(set)
    }

    /// Parse a criteria set from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, CriteriaError> {
        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a criteria set from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, CriteriaError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Load a criteria set from a file; `.json` files are read as JSON,
    /// everything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CriteriaError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    fn from_value(value: serde_json::Value) -> Result<Self, CriteriaError> {
        validate_criteria_schema(&value)
            .map_err(|errors| CriteriaError::ValidationError(errors.join("; ")))?;
        let set: CriteriaSet = serde_json::from_value(value)?;
        set.validate()?;
        Ok(set)
    }

    /// Serialize the set as YAML.
    pub fn to_yaml(&self) -> Result<String, CriteriaError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Write the set to a YAML file, replacing its contents.
    pub fn write_yaml_file(&self, path: impl AsRef<Path>) -> Result<(), CriteriaError> {
        fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), CriteriaError> {
        if self.criteria.is_empty() {
            return Err(CriteriaError::ValidationError(
                "criteria set is empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for criterion in &self.criteria {
            if criterion.name.trim().is_empty() {
                return Err(CriteriaError::ValidationError(
                    "criterion name is empty".to_string(),
                ));
            }
            if criterion.text.trim().is_empty() {
                return Err(CriteriaError::ValidationError(format!(
                    "criterion {} has no text",
                    criterion.name
                )));
            }
            if !seen.insert(criterion.name.as_str()) {
                return Err(CriteriaError::ValidationError(format!(
                    "Duplicate criterion name: {}",
                    criterion.name
                )));
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Criteria in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Criterion> {
        self.criteria.iter()
    }

    /// Criterion names in key order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.criteria.iter().map(|c| c.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.criteria
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.text.as_str())
    }

    /// Replace the text of an existing criterion.
    ///
    /// Returns the previous text. Unknown names are rejected; the key set
    /// never grows.
    pub fn replace(
        &mut self,
        name: &str,
        text: impl Into<String>,
    ) -> Result<String, CriteriaError> {
        let criterion = self
            .criteria
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| CriteriaError::UnknownCriterion(name.to_string()))?;
        Ok(std::mem::replace(&mut criterion.text, text.into()))
    }

    /// Pair each criterion with its importance, positionally.
    ///
    /// This is the only place an importance vector is matched to criteria;
    /// downstream code works on the returned pairs by name.
    pub fn pair_importances(
        &self,
        importances: &[f64],
    ) -> Result<Vec<WeightedCriterion>, CriteriaError> {
        if importances.len() != self.criteria.len() {
            return Err(CriteriaError::ImportanceMismatch {
                expected: self.criteria.len(),
                got: importances.len(),
            });
        }

        Ok(self
            .criteria
            .iter()
            .zip(importances)
            .map(|(c, &importance)| WeightedCriterion {
                name: c.name.clone(),
                text: c.text.clone(),
                importance,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_CRITERIA: &str = r#"
name: "Thyroid review"
description: "Studies on thyroid cancer in humans"
criteria:
  - name: Population
    text: "human subjects"
  - name: Disease
    text: "thyroid cancer"
"#;

    #[test]
    fn test_parse_valid_criteria() {
        let set = CriteriaSet::from_yaml(VALID_CRITERIA).unwrap();
        assert_eq!(set.name, "Thyroid review");
        assert_eq!(set.len(), 2);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["Population", "Disease"]);
        assert_eq!(set.get("Disease"), Some("thyroid cancer"));
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{"name": "r", "criteria": [{"name": "A", "text": "a"}]}"#;
        let set = CriteriaSet::from_json(json).unwrap();
        assert_eq!(set.get("A"), Some("a"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let yaml = r#"
name: "Dup"
criteria:
  - name: A
    text: "first"
  - name: A
    text: "second"
"#;
        let result = CriteriaSet::from_yaml(yaml);
        assert!(matches!(result, Err(CriteriaError::ValidationError(_))));
    }

    #[test]
    fn test_schema_violation_rejected() {
        let yaml = r#"
name: "Broken"
criteria:
  - name: A
"#;
        assert!(matches!(
            CriteriaSet::from_yaml(yaml),
            Err(CriteriaError::ValidationError(_))
        ));
    }

    #[test]
    fn test_replace_keeps_key_set() {
        let mut set = CriteriaSet::from_yaml(VALID_CRITERIA).unwrap();
        let previous = set.replace("Disease", "papillary thyroid carcinoma").unwrap();
        assert_eq!(previous, "thyroid cancer");
        assert_eq!(set.get("Disease"), Some("papillary thyroid carcinoma"));
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["Population", "Disease"]);
    }

    #[test]
    fn test_replace_unknown_is_error() {
        let mut set = CriteriaSet::from_yaml(VALID_CRITERIA).unwrap();
        assert!(matches!(
            set.replace("Outcome", "survival"),
            Err(CriteriaError::UnknownCriterion(_))
        ));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_pair_importances() {
        let set = CriteriaSet::from_yaml(VALID_CRITERIA).unwrap();
        let pairs = set.pair_importances(&[0.02, 0.3]).unwrap();
        assert_eq!(pairs[0].name, "Population");
        assert_eq!(pairs[1].name, "Disease");
        assert_eq!(pairs[1].importance, 0.3);
    }

    #[test]
    fn test_pair_importances_length_mismatch() {
        let set = CriteriaSet::from_yaml(VALID_CRITERIA).unwrap();
        assert!(matches!(
            set.pair_importances(&[0.5]),
            Err(CriteriaError::ImportanceMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_yaml_write_back_preserves_order() {
        let mut set = CriteriaSet::from_yaml(VALID_CRITERIA).unwrap();
        set.replace("Population", "adult human subjects").unwrap();
        let reparsed = CriteriaSet::from_yaml(&set.to_yaml().unwrap()).unwrap();
        assert_eq!(reparsed, set);
    }
}
