//! Field-level reasons attached to classified errors

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DispatchError, Result};

/// One explanation of why an operation failed, usually for a single input path
///
/// Besides `path` and `message` a reason may carry arbitrary extra fields;
/// they are flattened next to `path` and `message` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    /// Location of the offending input (e.g. `user.email`)
    pub path: String,

    /// Human-readable explanation
    pub message: String,

    /// Additional caller-defined fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Reason {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            extra: Map::new(),
        }
    }

    /// Attach an extra field
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Parse one reason or an array of reasons from JSON
    ///
    /// Every entry must be an object with a string `path` and a string
    /// `message`; the whole input is rejected if any entry is not.
    pub fn list_from_json(value: &Value) -> Result<Vec<Reason>> {
        match value {
            Value::Array(items) => items.iter().map(Reason::from_json).collect(),
            single => Ok(vec![Reason::from_json(single)?]),
        }
    }

    /// Parse a single reason object
    pub fn from_json(value: &Value) -> Result<Reason> {
        let object = value.as_object().ok_or_else(|| {
            DispatchError::InvalidReason(format!("expected an object, got {}", value))
        })?;

        let path = object.get("path").and_then(Value::as_str).ok_or_else(|| {
            DispatchError::InvalidReason("reason.path must be a string".to_string())
        })?;
        let message = object
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DispatchError::InvalidReason("reason.message must be a string".to_string())
            })?;

        let extra = object
            .iter()
            .filter(|(key, _)| key.as_str() != "path" && key.as_str() != "message")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Reason {
            path: path.to_string(),
            message: message.to_string(),
            extra,
        })
    }
}
