//! The output document written at the end of every run.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::error::{RunnerError, RunnerResult};

/// Written when even the error document cannot be rendered.
pub const FALLBACK_ERROR_DOCUMENT: &str = r#"{"error":"Failed to serialize output document"}"#;

/// Normalized run outcome
///
/// Objects are written as-is; every other handler result is wrapped under
/// `output`; failures become `{"error": "<message>"}`.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputDocument {
    Composite(Map<String, Value>),
    Scalar(Value),
    Error(String),
}

impl OutputDocument {
    /// Classify a raw handler result by shape.
    pub fn from_result(value: Value) -> Self {
        match value {
            Value::Object(map) => OutputDocument::Composite(map),
            other => OutputDocument::Scalar(other),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        OutputDocument::Error(message.into())
    }

    /// Collapse a run outcome into the document that gets written.
    pub fn from_outcome(outcome: RunnerResult<OutputDocument>) -> Self {
        match outcome {
            Ok(document) => document,
            Err(e) => OutputDocument::error(e.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, OutputDocument::Error(_))
    }

    pub fn into_value(self) -> Value {
        match self {
            OutputDocument::Composite(map) => Value::Object(map),
            OutputDocument::Scalar(value) => {
                let mut map = Map::new();
                map.insert("output".to_string(), value);
                Value::Object(map)
            }
            OutputDocument::Error(message) => {
                let mut map = Map::new();
                map.insert("error".to_string(), Value::String(message));
                Value::Object(map)
            }
        }
    }

    /// Serialize to compact JSON text, enforcing an optional size cap.
    pub fn render(&self, max_bytes: Option<usize>) -> RunnerResult<String> {
        let text =
            serde_json::to_string(self).map_err(|e| RunnerError::Serialization(e.to_string()))?;
        if let Some(max) = max_bytes {
            if text.len() > max {
                return Err(RunnerError::OutputTooLarge {
                    max,
                    actual: text.len(),
                });
            }
        }
        Ok(text)
    }
}

impl Serialize for OutputDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OutputDocument::Composite(map) => map.serialize(serializer),
            OutputDocument::Scalar(value) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("output", value)?;
                map.end()
            }
            OutputDocument::Error(message) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", message)?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use xfunction_types::HandlerError;

    #[test]
    fn test_object_is_composite() {
        let doc = OutputDocument::from_result(json!({ "status": "ok" }));
        assert!(matches!(doc, OutputDocument::Composite(_)));
        assert_eq!(doc.render(None).unwrap(), r#"{"status":"ok"}"#);
    }

    #[test]
    fn test_scalars_are_wrapped() {
        for value in [json!("s"), json!(4), json!(2.5), json!(true), json!(null)] {
            let doc = OutputDocument::from_result(value.clone());
            assert!(matches!(doc, OutputDocument::Scalar(_)));
            assert_eq!(doc.into_value(), json!({ "output": value }));
        }
    }

    #[test]
    fn test_array_is_wrapped() {
        let doc = OutputDocument::from_result(json!([1, 2]));
        assert_eq!(doc.render(None).unwrap(), r#"{"output":[1,2]}"#);
    }

    #[test]
    fn test_error_document_has_single_field() {
        let doc = OutputDocument::from_outcome(Err(HandlerError::Execution("boom".into()).into()));
        assert!(doc.is_error());
        assert_eq!(doc.render(None).unwrap(), r#"{"error":"boom"}"#);
    }

    #[test]
    fn test_render_matches_into_value() {
        let doc = OutputDocument::from_result(json!({ "b": [1, { "c": null }], "a": "x" }));
        let text = doc.render(None).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, doc.into_value());
    }

    #[test]
    fn test_render_size_cap() {
        let doc = OutputDocument::from_result(json!("0123456789"));
        match doc.render(Some(8)).unwrap_err() {
            RunnerError::OutputTooLarge { max, actual } => {
                assert_eq!(max, 8);
                assert_eq!(actual, r#"{"output":"0123456789"}"#.len());
            }
            other => panic!("Expected OutputTooLarge, got: {:?}", other),
        }
        assert!(doc.render(Some(1024)).is_ok());
    }

    #[test]
    fn test_fallback_document_is_error_shaped() {
        let parsed: Value = serde_json::from_str(FALLBACK_ERROR_DOCUMENT).unwrap();
        assert_eq!(parsed, json!({ "error": "Failed to serialize output document" }));
        assert_eq!(parsed.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_composite_keeps_key_order() {
        let doc = OutputDocument::from_result(json!({ "b": 1, "a": 2 }));
        assert_eq!(doc.render(None).unwrap(), r#"{"b":1,"a":2}"#);
    }
}
