//! Opaque validated-JSON-object metadata attached to rotation records.
//!
//! Callers hand metadata to the rotation call as a raw JSON string. The only
//! contract the core enforces is "parses to a JSON object" — the contents
//! are never inspected, only stored and echoed back.

use serde::{Deserialize, Serialize};

use crate::error::{ChronicleError, ChronicleResult};

/// A validated, schema-less JSON object.
///
/// Construction is the validation boundary: `from_json_str` is the only way
/// request-supplied metadata enters the core, and it rejects anything that
/// is not a JSON object before any file is touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomMetadata(pub serde_json::Map<String, serde_json::Value>);

impl CustomMetadata {
    /// Parse request-supplied metadata.
    ///
    /// `None` and the empty string both mean "no metadata" and yield an
    /// empty object. Anything else must parse as a JSON object or the call
    /// fails with `InvalidMetadata`.
    pub fn from_json_str(raw: Option<&str>) -> ChronicleResult<Self> {
        let raw = match raw {
            None => return Ok(Self::default()),
            Some(s) if s.trim().is_empty() => return Ok(Self::default()),
            Some(s) => s,
        };

        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| ChronicleError::InvalidMetadata {
                reason: format!("metadata is not valid JSON: {}", e),
            })?;

        match value {
            serde_json::Value::Object(map) => Ok(Self(map)),
            other => Err(ChronicleError::InvalidMetadata {
                reason: format!("metadata must be a JSON object, got {}", json_kind(&other)),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
