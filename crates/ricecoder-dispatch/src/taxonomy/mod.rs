//! Classified application errors
//!
//! Every failure that leaves [`Store::dispatch`](crate::Store::dispatch) is an
//! [`AppError`]: one of six [`ErrorKind`]s, each with a fixed severity and
//! status code, plus a caller-settable message, opaque data, the original
//! cause and an ordered list of [`Reason`]s.
//!
//! Handlers and middleware work with `anyhow::Result`, so an `AppError`
//! raised deep in a call tree travels inside `anyhow::Error` untouched.
//! [`wrap_error`] is the single normalization point: it recovers the
//! classified error if there is one and wraps anything else into an
//! `internal` error that keeps the original as its source.
//!
//! # Examples
//!
//! ```
//! use ricecoder_dispatch::taxonomy::{AppError, ErrorKind, Reason};
//!
//! let mut err = AppError::validation("Post is invalid");
//! err.add_reason(Reason::new("title", "Title is required"));
//!
//! assert_eq!(err.kind(), ErrorKind::Validation);
//! assert_eq!(err.status_code(), 400);
//! assert_eq!(
//!     serde_json::to_value(&err).unwrap(),
//!     serde_json::json!({
//!         "type": "validation",
//!         "severity": "warning",
//!         "message": "Post is invalid",
//!         "reasons": [{ "path": "title", "message": "Title is required" }],
//!     })
//! );
//! ```

mod kind;
mod reason;

pub use kind::{ErrorKind, Severity};
pub use reason::Reason;

use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::{DispatchError, Result};

/// A classified application error
#[derive(Debug)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    source: Option<anyhow::Error>,
    data: Option<Value>,
    reasons: Option<Vec<Reason>>,
}

/// The wire projection of an [`AppError`]
///
/// Deliberately omits the original cause, the opaque data and the status
/// code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorJson {
    #[serde(rename = "type")]
    pub error_type: ErrorKind,
    pub severity: Severity,
    pub message: String,
    pub reasons: Option<Vec<Reason>>,
}

impl AppError {
    /// Create an error of the given kind with the kind's default message
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: kind.default_message().to_string(),
            source: None,
            data: None,
            reasons: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal).with_message(message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication).with_message(message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authorization).with_message(message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound).with_message(message)
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotImplemented).with_message(message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation).with_message(message)
    }

    /// Replace the message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Attach opaque data for diagnostics; it never reaches the wire projection
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach the original cause
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_reason(mut self, reason: Reason) -> Self {
        self.add_reason(reason);
        self
    }

    pub fn with_reasons(mut self, reasons: impl IntoIterator<Item = Reason>) -> Self {
        self.add_reasons(reasons);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Wire name of the kind (`validation`, `notFound`, ...)
    pub fn error_type(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The foreign error this one was built from, if any
    pub fn original_error(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn reasons(&self) -> Option<&[Reason]> {
        self.reasons.as_deref()
    }

    pub fn has_reasons(&self) -> bool {
        self.reasons.as_ref().is_some_and(|r| !r.is_empty())
    }

    /// Append one reason
    pub fn add_reason(&mut self, reason: Reason) -> &mut Self {
        self.reasons.get_or_insert_with(Vec::new).push(reason);
        self
    }

    /// Append reasons in iteration order
    pub fn add_reasons(&mut self, reasons: impl IntoIterator<Item = Reason>) -> &mut Self {
        self.reasons.get_or_insert_with(Vec::new).extend(reasons);
        self
    }

    /// Append one JSON reason object or an array of them
    ///
    /// Nothing is appended when any entry lacks a string `path` or a string
    /// `message`.
    pub fn add_reason_json(&mut self, value: &Value) -> Result<&mut Self> {
        let reasons = Reason::list_from_json(value)?;
        Ok(self.add_reasons(reasons))
    }

    /// The stable, externally safe projection
    pub fn to_json(&self) -> ErrorJson {
        ErrorJson {
            error_type: self.kind,
            severity: self.severity(),
            message: self.message.clone(),
            reasons: self.reasons.clone(),
        }
    }

    /// Rebuild a classified error from its wire projection
    ///
    /// Severity always follows the kind; a `severity` field in the input is
    /// ignored.
    pub fn from_json(json: &Value) -> Result<AppError> {
        let kind = match json.get("type") {
            Some(Value::String(name)) => name.parse::<ErrorKind>()?,
            Some(other) => return Err(DispatchError::UnknownErrorType(other.to_string())),
            None => return Err(DispatchError::UnknownErrorType("undefined".to_string())),
        };

        let mut err = AppError::new(kind);
        if let Some(message) = json.get("message").and_then(Value::as_str) {
            err.message = message.to_string();
        }
        match json.get("reasons") {
            None | Some(Value::Null) => {}
            Some(reasons) => {
                err.add_reason_json(reasons)?;
            }
        }

        Ok(err)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}

impl Serialize for AppError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<ErrorKind> for AppError {
    fn from(kind: ErrorKind) -> Self {
        AppError::new(kind)
    }
}

/// Normalize any error into the taxonomy
///
/// Classified errors pass through unchanged; anything else becomes an
/// `internal` error whose [`original_error`](AppError::original_error) is the
/// input. An absent error stays absent: use `Option::map(wrap_error)`.
pub fn wrap_error(err: anyhow::Error) -> AppError {
    match err.downcast::<AppError>() {
        Ok(classified) => classified,
        Err(foreign) => AppError::new(ErrorKind::Internal).with_source(foreign),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reasons_fixture() -> Vec<Reason> {
        vec![
            Reason::new("path1", "message1"),
            Reason::new("path2", "message2"),
        ]
    }

    #[test]
    fn test_every_kind_has_fixed_defaults() {
        for kind in ErrorKind::ALL {
            let err = AppError::new(kind);
            assert_eq!(err.kind(), kind);
            assert_eq!(err.message(), kind.default_message());
            assert_eq!(err.severity(), kind.severity());
            assert_eq!(err.status_code(), kind.status_code());
            assert!(err.original_error().is_none());
            assert!(err.data().is_none());
            assert!(err.reasons().is_none());
            assert!(!err.has_reasons());
            assert_eq!(
                serde_json::to_value(&err).unwrap(),
                json!({
                    "type": kind.as_str(),
                    "severity": kind.severity().as_str(),
                    "message": kind.default_message(),
                    "reasons": null,
                })
            );
        }
    }

    #[test]
    fn test_custom_fields_never_leak_into_json() {
        for kind in ErrorKind::ALL {
            let original = std::io::Error::new(std::io::ErrorKind::Other, "test");
            let mut err = AppError::new(kind)
                .with_message("abc")
                .with_data(json!({ "secret": true }))
                .with_source(original);
            err.add_reason(Reason::new("path1", "message1"))
                .add_reasons([Reason::new("path2", "message2")]);

            assert_eq!(err.message(), "abc");
            assert_eq!(err.data(), Some(&json!({ "secret": true })));
            assert_eq!(err.original_error().unwrap().to_string(), "test");
            assert_eq!(err.reasons().unwrap(), reasons_fixture().as_slice());
            assert!(err.has_reasons());

            let projected = serde_json::to_value(&err).unwrap();
            assert_eq!(
                projected,
                json!({
                    "type": kind.as_str(),
                    "severity": kind.severity().as_str(),
                    "message": "abc",
                    "reasons": [
                        { "path": "path1", "message": "message1" },
                        { "path": "path2", "message": "message2" },
                    ],
                })
            );
            let object = projected.as_object().unwrap();
            assert!(!object.contains_key("data"));
            assert!(!object.contains_key("err"));
            assert!(!object.contains_key("statusCode"));
        }
    }

    #[test]
    fn test_add_reason_json_appends_in_order() {
        let mut err = AppError::new(ErrorKind::Internal);
        err.add_reason_json(&json!({ "path": "path1", "message": "message1" }))
            .unwrap()
            .add_reason_json(&json!([
                { "path": "path2", "message": "message2" },
                { "path": "path3", "message": "message3", "custom1": 123 },
            ]))
            .unwrap();

        let reasons = err.reasons().unwrap();
        assert_eq!(reasons.len(), 3);
        assert_eq!(reasons[0].path, "path1");
        assert_eq!(reasons[2].path, "path3");
        assert_eq!(reasons[2].extra.get("custom1"), Some(&json!(123)));
    }

    #[test]
    fn test_add_reason_json_rejects_without_appending() {
        let mut err = AppError::validation("bad");
        err.add_reason(Reason::new("p", "m"));

        let result = err.add_reason_json(&json!([
            { "path": "p2", "message": "m2" },
            { "path": "p3" },
        ]));

        assert!(matches!(result, Err(DispatchError::InvalidReason(_))));
        assert_eq!(err.reasons().unwrap().len(), 1);
    }

    #[test]
    fn test_wrap_error_keeps_classified_errors() {
        for kind in ErrorKind::ALL {
            let err = AppError::new(kind).with_message("keep me").with_data(json!(7));
            let wrapped = wrap_error(err.into());
            assert_eq!(wrapped.kind(), kind);
            assert_eq!(wrapped.message(), "keep me");
            assert_eq!(wrapped.data(), Some(&json!(7)));
            assert!(wrapped.original_error().is_none());
        }
    }

    #[test]
    fn test_wrap_error_wraps_foreign_errors() {
        let foreign = std::io::Error::new(std::io::ErrorKind::Other, "test error");
        let wrapped = wrap_error(foreign.into());

        assert_eq!(wrapped.kind(), ErrorKind::Internal);
        assert_eq!(wrapped.message(), "Internal error");
        let original = wrapped.original_error().unwrap();
        assert_eq!(original.to_string(), "test error");
        assert!(original.downcast_ref::<std::io::Error>().is_some());
        assert_eq!(wrapped.source().unwrap().to_string(), "test error");
    }

    #[test]
    fn test_wrap_error_leaves_absent_errors_absent() {
        let absent: Option<anyhow::Error> = None;
        assert!(absent.map(wrap_error).is_none());
    }

    #[test]
    fn test_from_json_rebuilds_error() {
        let err = AppError::from_json(&json!({
            "type": "notFound",
            "severity": "error",
            "message": "Post not found",
            "reasons": [{ "path": "id", "message": "unknown id" }],
        }))
        .unwrap();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.severity(), Severity::Warning);
        assert_eq!(err.message(), "Post not found");
        assert_eq!(err.reasons().unwrap(), &[Reason::new("id", "unknown id")]);
    }

    #[test]
    fn test_from_json_defaults_message() {
        let err = AppError::from_json(&json!({ "type": "authorization" })).unwrap();
        assert_eq!(err.message(), "Authorization error");
        assert!(err.reasons().is_none());
    }

    #[test]
    fn test_from_json_rejects_unknown_type() {
        let err = AppError::from_json(&json!({ "type": "teapot" })).unwrap_err();
        assert_eq!(
            err.to_string(),
            "error type 'teapot' not found - could not build error from JSON"
        );
        assert!(AppError::from_json(&json!({})).is_err());
    }

    #[test]
    fn test_to_json_round_trips_through_from_json() {
        let err = AppError::authentication("Token expired")
            .with_reason(Reason::new("token", "expired").with_field("at", json!(1700000000)));
        let projected = serde_json::to_value(&err).unwrap();
        let rebuilt = AppError::from_json(&projected).unwrap();
        assert_eq!(rebuilt.to_json(), err.to_json());
    }
}
