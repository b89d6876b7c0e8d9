//! Response envelopes returned to callers.

use serde_json::{Map, Value, json};

/// Constructors for the `{ success, error }` envelope shapes
pub struct QueryResponse;

impl QueryResponse {
    /// `{ "error": message, "success": false }`
    pub fn failure(message: impl Into<String>) -> Value {
        json!({ "error": message.into(), "success": false })
    }

    /// Returned to non-GM callers; says nothing about why
    pub fn access_denied() -> Value {
        Self::failure("Access denied")
    }

    /// `{ "success": true, ...fields }`
    pub fn success(fields: Map<String, Value>) -> Value {
        let mut body = Map::with_capacity(fields.len() + 1);
        body.insert("success".to_string(), Value::Bool(true));
        body.extend(fields);
        Value::Object(body)
    }
}
