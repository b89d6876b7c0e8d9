//! Read access to a query's JSON payload.
//!
//! Presence checks follow JavaScript truthiness: an empty string, `0`,
//! `false` and `null` all count as missing for required fields.

use serde_json::{Map, Value};

use crate::error::QueryError;

/// Truthiness of a JSON value as the host module's callers expect it
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A query payload viewed as an object.
///
/// Anything other than a JSON object behaves as an object without fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    fields: Map<String, Value>,
    is_object: bool,
}

impl Payload {
    pub fn new(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self {
                fields,
                is_object: true,
            },
            _ => Self::default(),
        }
    }

    /// Whether the original payload was a JSON object
    pub fn is_object(&self) -> bool {
        self.is_object
    }

    /// Raw field, `null` included
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Field value when truthy
    pub fn truthy(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| is_truthy(v))
    }

    /// Non-empty string field
    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Non-empty string field, or a validation error with `message`
    pub fn require_str(&self, key: &str, message: &str) -> Result<String, QueryError> {
        self.str(key)
            .map(str::to_string)
            .ok_or_else(|| QueryError::validation(message))
    }

    /// Non-empty string field with the usual `{key} is required` message
    pub fn required(&self, key: &str) -> Result<String, QueryError> {
        self.require_str(key, &format!("{key} is required"))
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// Positive integer field, for values where zero means "use the default"
    pub fn positive_u64(&self, key: &str) -> Option<u64> {
        self.number(key)
            .filter(|n| *n > 0.0)
            .map(|n| n as u64)
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Object field (arrays count, as they do for `typeof x === 'object'`)
    pub fn object(&self, key: &str) -> Option<&Value> {
        self.get(key)
            .filter(|v| v.is_object() || v.is_array())
    }

    /// Array field with at least one element
    pub fn non_empty_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.get(key)
            .and_then(Value::as_array)
            .filter(|items| !items.is_empty())
    }

    /// String elements of an array field
    pub fn strings(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
    }

    /// All fields except `exclude`, for forwarding extras to the host
    pub fn extras(&self, exclude: &[&str]) -> Map<String, Value> {
        self.fields
            .iter()
            .filter(|(key, _)| !exclude.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// The payload as a JSON object
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(false)));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!(-1)));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }

    #[test]
    fn test_non_object_payload_has_no_fields() {
        let payload = Payload::new(json!("just a string"));
        assert!(!payload.is_object());
        assert!(payload.get("query").is_none());
        assert_eq!(payload.to_value(), json!({}));

        assert!(Payload::new(json!({})).is_object());
    }

    #[test]
    fn test_required_strings() {
        let payload = Payload::new(json!({"tokenId": "t1", "empty": "", "num": 5}));
        assert_eq!(payload.required("tokenId").unwrap(), "t1");
        assert_eq!(
            payload.required("empty").unwrap_err().to_string(),
            "empty is required"
        );
        assert_eq!(
            payload.require_str("num", "num must be a string").unwrap_err().to_string(),
            "num must be a string"
        );
    }

    #[test]
    fn test_typed_accessors() {
        let payload = Payload::new(json!({
            "x": 10.5,
            "quantity": 0,
            "active": false,
            "ids": ["a", 3, "b"],
            "none": [],
            "updates": {"hidden": true},
            "permission": null
        }));
        assert_eq!(payload.number("x"), Some(10.5));
        assert_eq!(payload.positive_u64("quantity"), None);
        assert_eq!(payload.flag("active"), Some(false));
        assert_eq!(payload.strings("ids").unwrap(), vec!["a", "b"]);
        assert!(payload.non_empty_array("none").is_none());
        assert!(payload.object("updates").is_some());
        assert!(payload.object("x").is_none());
        assert_eq!(payload.get("permission"), Some(&Value::Null));
        assert!(payload.truthy("permission").is_none());
    }

    #[test]
    fn test_extras_skip_named_fields() {
        let payload = Payload::new(json!({"tokenId": "t1", "x": 1, "animate": true}));
        let extras = payload.extras(&["tokenId", "x"]);
        assert_eq!(Value::Object(extras), json!({"animate": true}));
    }
}
