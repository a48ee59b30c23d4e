//! Request bodies as received from a transport.

use serde_json::{Map, Value as JsonValue};

use crate::error::ValidationError;

/// A request body: parsed JSON, or the reason it could not be parsed.
///
/// Parsing happens where the bytes arrive, but a malformed body is only
/// reported when an operation asks for the JSON, i.e. after authorization.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload(Result<JsonValue, ValidationError>);

impl Payload {
    /// Parse raw bytes. A blank body reads as `{}`.
    pub fn from_slice(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self(Ok(JsonValue::Object(Map::new())));
        }
        Self(serde_json::from_slice(bytes).map_err(|e| ValidationError::MalformedBody(e.to_string())))
    }

    pub fn json(&self) -> Result<&JsonValue, ValidationError> {
        self.0.as_ref().map_err(Clone::clone)
    }
}

impl From<JsonValue> for Payload {
    fn from(value: JsonValue) -> Self {
        Self(Ok(value))
    }
}

impl From<&JsonValue> for Payload {
    fn from(value: &JsonValue) -> Self {
        Self(Ok(value.clone()))
    }
}
