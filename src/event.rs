use serde_json::{Map, Value};

use crate::errors::DecodeError;

/// Label assigned to messages without a usable `category` field.
pub const FALLBACK_LABEL: &str = "other";

const CATEGORY_FIELD: &str = "category";

/// A decoded message: the top-level JSON object of one payload.
/// Only the `category` field is consumed, everything else is carried along untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    fields: Map<String, Value>,
}

impl Message {
    pub fn new(fields: Map<String, Value>) -> Message { Message { fields: fields } }

    pub fn fields(&self) -> &Map<String, Value> { &self.fields }

    pub fn category(&self) -> &str { extract_category(&self.fields) }
}

/// Decode one raw payload. The bytes must be UTF-8 text holding a single JSON object.
pub fn deserialize(payload: &[u8]) -> Result<Message, DecodeError> {
    let text = std::str::from_utf8(payload)?;

    match serde_json::from_str::<Value>(text)? {
        Value::Object(fields) => Ok(Message::new(fields)),
        other => Err(DecodeError::NotAnObject(json_kind(&other))),
    }
}

/// Category of a message. Missing, null and non-string values all map to
/// [`FALLBACK_LABEL`]; the empty string is a label of its own.
pub fn extract_category(fields: &Map<String, Value>) -> &str {
    match fields.get(CATEGORY_FIELD) {
        Some(Value::String(category)) => category.as_str(),
        _ => FALLBACK_LABEL,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
