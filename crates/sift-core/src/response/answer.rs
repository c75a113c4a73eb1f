//! Typed views over parsed responses.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::{fields, FormatError};

/// A response that passed schema validation.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredResponse {
    values: Map<String, Value>,
}

impl StructuredResponse {
    pub(crate) fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(Value::as_str)
    }

    /// Boolean entries of an object field; non-boolean entries are skipped.
    pub fn boolean_map(&self, field: &str) -> BTreeMap<String, bool> {
        self.object(field)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_bool().map(|b| (k.clone(), b)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Text entries of an object field; non-text entries are skipped.
    pub fn text_map(&self, field: &str) -> BTreeMap<String, String> {
        self.object(field)
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn object(&self, field: &str) -> Option<&Map<String, Value>> {
        self.values.get(field).and_then(Value::as_object)
    }

    /// Render as a fenced JSON block, the shape the format instructions ask for.
    pub fn render(&self) -> String {
        let body = serde_json::to_string_pretty(&self.values).unwrap_or_else(|_| "{}".to_string());
        format!("```json\n{}\n```", body)
    }
}

/// A screening answer for one document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScreeningAnswer {
    pub title: String,
    pub criteria: BTreeMap<String, bool>,
    pub reasoning: BTreeMap<String, String>,
}

impl ScreeningAnswer {
    /// Read a screening answer out of a response parsed with
    /// `ResponseSchema::screening()`.
    pub fn from_response(response: &StructuredResponse) -> Result<Self, FormatError> {
        let title = response
            .text(fields::TITLE)
            .ok_or_else(|| FormatError::SchemaViolation(vec!["missing title".to_string()]))?;

        Ok(Self {
            title: title.to_string(),
            criteria: response.boolean_map(fields::CRITERIA),
            reasoning: response.text_map(fields::REASONING),
        })
    }

    /// Render the answer as a model response.
    pub fn to_response(&self) -> StructuredResponse {
        let mut values = Map::new();
        values.insert(fields::TITLE.to_string(), Value::String(self.title.clone()));
        values.insert(
            fields::CRITERIA.to_string(),
            Value::Object(
                self.criteria
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::Bool(*v)))
                    .collect(),
            ),
        );
        values.insert(
            fields::REASONING.to_string(),
            Value::Object(
                self.reasoning
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        );
        StructuredResponse::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseSchema;

    fn sample_answer() -> ScreeningAnswer {
        ScreeningAnswer {
            title: "Radioiodine outcomes in papillary thyroid cancer".to_string(),
            criteria: BTreeMap::from([
                ("Population".to_string(), true),
                ("Disease".to_string(), false),
            ]),
            reasoning: BTreeMap::from([
                ("Population".to_string(), "A cohort of 212 patients".to_string()),
                ("Disease".to_string(), "Studies goitre, not cancer".to_string()),
            ]),
        }
    }

    #[test]
    fn test_screening_answer_round_trip() {
        let schema = ResponseSchema::screening().unwrap();
        let answer = sample_answer();
        let parsed = schema.parse(&answer.to_response().render()).unwrap();
        assert_eq!(ScreeningAnswer::from_response(&parsed).unwrap(), answer);
    }

    #[test]
    fn test_single_reasoning_string_is_kept() {
        let schema = ResponseSchema::screening().unwrap();
        let raw = r#"```json
{"title": "T", "criteria": {"A": "yes"}, "reasoning": "Matches the population"}
```"#;
        let answer = ScreeningAnswer::from_response(&schema.parse(raw).unwrap()).unwrap();
        assert_eq!(answer.criteria.get("A"), Some(&true));
        assert_eq!(
            answer.reasoning.get("overall").map(String::as_str),
            Some("Matches the population")
        );
    }
}
