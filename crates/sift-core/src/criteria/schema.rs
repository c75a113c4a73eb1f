//! JSON Schema check for criteria files, run before deserialization so
//! users see every structural problem at once.

use serde_json::Value;
use std::sync::OnceLock;

const CRITERIA_SCHEMA_JSON: &str = include_str!("../../../../schema/criteria.schema.json");

static VALIDATOR: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn validator() -> Result<&'static jsonschema::Validator, String> {
    VALIDATOR
        .get_or_init(|| {
            let schema: Value = serde_json::from_str(CRITERIA_SCHEMA_JSON)
                .map_err(|e| format!("embedded criteria schema is not JSON: {}", e))?;
            jsonschema::options()
                .build(&schema)
                .map_err(|e| format!("embedded criteria schema does not compile: {}", e))
        })
        .as_ref()
        .map_err(Clone::clone)
}

/// Every violation in `document`, each prefixed with its JSON pointer
/// (`/` for the root).
pub fn validate_criteria_schema(document: &Value) -> Result<(), Vec<String>> {
    let validator = validator().map_err(|e| vec![e])?;

    let violations: Vec<String> = validator
        .iter_errors(document)
        .map(|e| {
            let path = e.instance_path.to_string();
            let path = if path.is_empty() { "/".to_string() } else { path };
            format!("{}: {}", path, e)
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
