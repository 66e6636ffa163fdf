//! Payload normalization.
//!
//! Detectors run against one normalized representation of the full request
//! body so a threat embedded in any field is caught without assuming a
//! particular field layout. JSON bodies are flattened to their keys and
//! values; everything else is inspected as raw text.

use serde_json::Value;

/// A request payload prepared for inspection.
///
/// Case folding is left to the detectors' case-insensitive signatures.
#[derive(Debug, Clone)]
pub struct NormalizedPayload {
    /// Concatenated field content (or the raw body for non-JSON input).
    pub text: String,
    /// Byte length of the original body, before flattening.
    pub byte_len: usize,
    /// True when the body looked structured but could not be parsed.
    /// Inspection then runs over the raw text in degraded mode.
    pub malformed: bool,
}

impl NormalizedPayload {
    /// Normalizes a raw request body.
    pub fn from_raw(raw: &str) -> Self {
        let byte_len = raw.len();
        let trimmed = raw.trim_start();
        let looks_structured = trimmed.starts_with('{') || trimmed.starts_with('[');

        let (text, malformed) = if looks_structured {
            match serde_json::from_str::<Value>(raw) {
                Ok(value) => {
                    let mut fields = Vec::new();
                    collect_fields(&value, &mut fields);
                    (fields.join("\n"), false)
                }
                Err(_) => (raw.to_string(), true),
            }
        } else {
            (raw.to_string(), false)
        };

        Self {
            text,
            byte_len,
            malformed,
        }
    }
}

/// Walks a JSON value collecting every key and scalar as text.
fn collect_fields(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Array(items) => {
            for item in items {
                collect_fields(item, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                out.push(key.clone());
                collect_fields(item, out);
            }
        }
        Value::Null => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passthrough() {
        let payload = NormalizedPayload::from_raw("hello world");
        assert_eq!(payload.text, "hello world");
        assert!(!payload.malformed);
    }

    #[test]
    fn test_json_fields_flattened() {
        let payload = NormalizedPayload::from_raw(r#"{"username":"admin","age":42}"#);
        assert!(payload.text.contains("username"));
        assert!(payload.text.contains("admin"));
        assert!(payload.text.contains("42"));
        assert!(!payload.malformed);
    }

    #[test]
    fn test_nested_values_collected() {
        let payload =
            NormalizedPayload::from_raw(r#"{"outer":{"inner":["<script>alert(1)</script>"]}}"#);
        assert!(payload.text.contains("<script>"));
    }

    #[test]
    fn test_broken_json_marked_malformed() {
        let payload = NormalizedPayload::from_raw(r#"{"username": "admin""#);
        assert!(payload.malformed);
        // Raw text is still available for degraded inspection.
        assert!(payload.text.contains("admin"));
    }

    #[test]
    fn test_byte_len_is_original_size() {
        let raw = r#"{"k":"v"}"#;
        let payload = NormalizedPayload::from_raw(raw);
        assert_eq!(payload.byte_len, raw.len());
    }

}
