//! Locating and normalising the JSON payload inside raw model output.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

use super::{FieldKind, FormatError, ResponseField};

lazy_static! {
    static ref FENCED_JSON: Regex =
        Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*\})\s*```").unwrap();
}

/// Key used when a model returns a single rationale instead of a map.
pub const OVERALL_KEY: &str = "overall";

/// Find the JSON object in a model response.
///
/// Prefers a fenced code block; otherwise takes the span from the first `{`
/// to the last `}`.
pub fn extract_json(raw: &str) -> Result<&str, FormatError> {
    if let Some(caps) = FENCED_JSON.captures(raw) {
        if let Some(m) = caps.get(1) {
            return Ok(m.as_str());
        }
    }

    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&raw[start..=end]),
        _ => Err(FormatError::NoJson),
    }
}

/// Decode the payload into a JSON object.
pub fn decode_object(raw: &str) -> Result<Map<String, Value>, FormatError> {
    let payload = extract_json(raw)?;
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(FormatError::NotAnObject),
        Err(e) => Err(FormatError::InvalidJson(e.to_string())),
    }
}

/// Coerce loosely-typed values into the shapes the fields declare.
///
/// Values that cannot be coerced are left untouched so schema validation
/// reports them.
pub fn normalize(object: &mut Map<String, Value>, fields: &[ResponseField]) {
    for field in fields {
        let Some(value) = object.get_mut(&field.name) else {
            continue;
        };

        match field.kind {
            FieldKind::Text => {}
            FieldKind::Boolean => coerce_bool(value),
            FieldKind::BooleanMap => {
                if let Value::Object(map) = value {
                    map.values_mut().for_each(coerce_bool);
                }
            }
            FieldKind::TextMap => {
                if let Value::String(text) = value {
                    let mut map = Map::new();
                    map.insert(OVERALL_KEY.to_string(), Value::String(std::mem::take(text)));
                    *value = Value::Object(map);
                }
            }
        }
    }
}

fn coerce_bool(value: &mut Value) {
    if let Value::String(s) = value {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => *value = Value::Bool(true),
            "false" | "no" => *value = Value::Bool(false),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_fenced_block() {
        let raw = "Here you go:\n```json\n{\"a\": 1}\n```\nanything else?";
        assert_eq!(extract_json(raw).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_bare_braces() {
        let raw = "Sure. {\"a\": {\"b\": 2}} Hope this helps";
        assert_eq!(extract_json(raw).unwrap(), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn test_extract_no_json() {
        assert_eq!(extract_json("I cannot answer that."), Err(FormatError::NoJson));
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode_object("{\"a\": 1"),
            Err(FormatError::NoJson)
        ));
        assert!(matches!(
            decode_object("{not json}"),
            Err(FormatError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_normalize_lenient_booleans() {
        let fields = vec![
            ResponseField::new("flag", "", FieldKind::Boolean),
            ResponseField::new("criteria", "", FieldKind::BooleanMap),
        ];
        let mut object = json!({
            "flag": "Yes",
            "criteria": { "A": "TRUE", "B": "no", "C": "maybe" }
        })
        .as_object()
        .cloned()
        .unwrap();

        normalize(&mut object, &fields);

        assert_eq!(object["flag"], json!(true));
        assert_eq!(object["criteria"]["A"], json!(true));
        assert_eq!(object["criteria"]["B"], json!(false));
        assert_eq!(object["criteria"]["C"], json!("maybe"));
    }

    #[test]
    fn test_normalize_single_reasoning_string() {
        let fields = vec![ResponseField::new("reasoning", "", FieldKind::TextMap)];
        let mut object = json!({ "reasoning": "all criteria hold" })
            .as_object()
            .cloned()
            .unwrap();

        normalize(&mut object, &fields);

        assert_eq!(object["reasoning"], json!({ "overall": "all criteria hold" }));
    }
}
