//! Structured response contract.
//!
//! A `ResponseSchema` names the fields a generation call must return. It
//! renders format instructions to embed in a prompt and parses raw model
//! output back into a validated `StructuredResponse`. A parse failure is a
//! `FormatError`, which callers treat as a retry signal rather than a fault.

mod answer;
mod extract;

pub use answer::{ScreeningAnswer, StructuredResponse};
pub use extract::{extract_json, OVERALL_KEY};

use serde_json::{json, Map, Value};
use std::fmt;
use thiserror::Error;

/// Why raw model output could not be parsed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("no JSON object found in response")]
    NoJson,

    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("response JSON is not an object")]
    NotAnObject,

    #[error("response does not match schema: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),
}

/// Errors building a response schema.
#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("Failed to compile response schema: {0}")]
    SchemaBuild(String),

    #[error("Response schema has no fields")]
    NoFields,
}

/// The value shape of one response field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Boolean,
    /// Object mapping names to booleans
    BooleanMap,
    /// Object mapping names to text
    TextMap,
}

impl FieldKind {
    fn json_schema(self) -> Value {
        match self {
            FieldKind::Text => json!({ "type": "string" }),
            FieldKind::Boolean => json!({ "type": "boolean" }),
            FieldKind::BooleanMap => json!({
                "type": "object",
                "additionalProperties": { "type": "boolean" }
            }),
            FieldKind::TextMap => json!({
                "type": "object",
                "additionalProperties": { "type": "string" }
            }),
        }
    }

    fn type_hint(self) -> &'static str {
        match self {
            FieldKind::Text => "string",
            FieldKind::Boolean => "boolean",
            FieldKind::BooleanMap => "object of string to boolean",
            FieldKind::TextMap => "object of string to string",
        }
    }
}

/// One field of a response schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseField {
    pub name: String,
    pub description: String,
    pub kind: FieldKind,
}

impl ResponseField {
    pub fn new(name: impl Into<String>, description: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
        }
    }
}

/// Field names of the screening response.
pub mod fields {
    pub const TITLE: &str = "title";
    pub const CRITERIA: &str = "criteria";
    pub const REASONING: &str = "reasoning";
    pub const IMPROVED_CRITERION: &str = "improved_criterion";
}

/// A set of expected fields plus the validator compiled from them.
pub struct ResponseSchema {
    fields: Vec<ResponseField>,
    validator: jsonschema::Validator,
}

impl fmt::Debug for ResponseSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseSchema")
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

impl ResponseSchema {
    /// Compile a schema from an ordered field list.
    pub fn new(fields: Vec<ResponseField>) -> Result<Self, ResponseError> {
        if fields.is_empty() {
            return Err(ResponseError::NoFields);
        }

        let properties: Map<String, Value> = fields
            .iter()
            .map(|f| (f.name.clone(), f.kind.json_schema()))
            .collect();
        let required: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        let schema = json!({
            "type": "object",
            "required": required,
            "properties": properties,
        });

        let validator = jsonschema::options()
            .build(&schema)
            .map_err(|e| ResponseError::SchemaBuild(e.to_string()))?;

        Ok(Self { fields, validator })
    }

    /// Schema for per-document screening answers.
    pub fn screening() -> Result<Self, ResponseError> {
        Self::new(vec![
            ResponseField::new(fields::TITLE, "Title of the document", FieldKind::Text),
            ResponseField::new(
                fields::CRITERIA,
                "Each criterion name mapped to whether it is true for this document",
                FieldKind::BooleanMap,
            ),
            ResponseField::new(
                fields::REASONING,
                "Each criterion name mapped to why it is true or false for this document",
                FieldKind::TextMap,
            ),
        ])
    }

    /// Schema for a single rewritten criterion.
    pub fn improved_criterion() -> Result<Self, ResponseError> {
        Self::new(vec![ResponseField::new(
            fields::IMPROVED_CRITERION,
            "The improved criterion",
            FieldKind::Text,
        )])
    }

    pub fn fields(&self) -> &[ResponseField] {
        &self.fields
    }

    /// Format instructions to append to a prompt.
    pub fn render_instructions(&self) -> String {
        let mut out = String::from(
            "The output should be a markdown code snippet formatted in the following schema, \
             including the leading and trailing \"```json\" and \"```\":\n\n```json\n{\n",
        );
        for (i, field) in self.fields.iter().enumerate() {
            let comma = if i + 1 < self.fields.len() { "," } else { "" };
            out.push_str(&format!(
                "\t\"{}\": {}{}  // {}\n",
                field.name,
                field.kind.type_hint(),
                comma,
                field.description
            ));
        }
        out.push_str("}\n```");
        out
    }

    /// Parse raw model output into a validated response.
    pub fn parse(&self, raw: &str) -> Result<StructuredResponse, FormatError> {
        let mut object = extract::decode_object(raw)?;
        extract::normalize(&mut object, &self.fields);

        let instance = Value::Object(object);
        let errors: Vec<String> = self
            .validator
            .iter_errors(&instance)
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect();
        if !errors.is_empty() {
            return Err(FormatError::SchemaViolation(errors));
        }

        match instance {
            Value::Object(values) => Ok(StructuredResponse::new(values)),
            _ => Err(FormatError::NotAnObject),
        }
    }

    /// A well-formed response for this schema, as a model would write it.
    pub fn example_response(&self) -> String {
        let values: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| {
                let value = match f.kind {
                    FieldKind::Text => json!(format!("example {}", f.name)),
                    FieldKind::Boolean => json!(true),
                    FieldKind::BooleanMap => json!({ "example": true }),
                    FieldKind::TextMap => json!({ "example": format!("example {}", f.name) }),
                };
                (f.name.clone(), value)
            })
            .collect();
        StructuredResponse::new(values).render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instructions_name_every_field() {
        let schema = ResponseSchema::screening().unwrap();
        let instructions = schema.render_instructions();
        assert!(instructions.contains("```json"));
        for name in ["title", "criteria", "reasoning"] {
            assert!(instructions.contains(&format!("\"{}\"", name)));
        }
    }

    #[test]
    fn test_instructions_are_deterministic() {
        let schema = ResponseSchema::improved_criterion().unwrap();
        assert_eq!(schema.render_instructions(), schema.render_instructions());
    }

    #[test]
    fn test_example_round_trip_screening() {
        let schema = ResponseSchema::screening().unwrap();
        let parsed = schema.parse(&schema.example_response()).unwrap();
        assert_eq!(parsed.text(fields::TITLE), Some("example title"));
        assert_eq!(parsed.boolean_map(fields::CRITERIA).get("example"), Some(&true));
        assert_eq!(
            parsed.text_map(fields::REASONING).get("example").map(String::as_str),
            Some("example reasoning")
        );
    }

    #[test]
    fn test_example_round_trip_improved_criterion() {
        let schema = ResponseSchema::improved_criterion().unwrap();
        let parsed = schema.parse(&schema.example_response()).unwrap();
        assert_eq!(
            parsed.text(fields::IMPROVED_CRITERION),
            Some("example improved_criterion")
        );
    }

    #[test]
    fn test_missing_field_is_format_error() {
        let schema = ResponseSchema::screening().unwrap();
        let result = schema.parse(r#"{"title": "Paper", "criteria": {"A": true}}"#);
        assert!(matches!(result, Err(FormatError::SchemaViolation(_))));
    }

    #[test]
    fn test_wrong_type_is_format_error() {
        let schema = ResponseSchema::screening().unwrap();
        let result = schema.parse(
            r#"{"title": "Paper", "criteria": {"A": "perhaps"}, "reasoning": {"A": "unclear"}}"#,
        );
        assert!(matches!(result, Err(FormatError::SchemaViolation(_))));
    }

    #[test]
    fn test_prose_is_format_error() {
        let schema = ResponseSchema::improved_criterion().unwrap();
        assert_eq!(
            schema.parse("The criterion looks fine to me."),
            Err(FormatError::NoJson)
        );
    }

    #[test]
    fn test_extra_keys_are_tolerated() {
        let schema = ResponseSchema::improved_criterion().unwrap();
        let parsed = schema
            .parse(r#"{"improved_criterion": "adults only", "confidence": 0.9}"#)
            .unwrap();
        assert_eq!(parsed.text(fields::IMPROVED_CRITERION), Some("adults only"));
    }

    #[test]
    fn test_empty_field_list_rejected() {
        assert!(matches!(
            ResponseSchema::new(Vec::new()),
            Err(ResponseError::NoFields)
        ));
    }
}
