//! Error kinds and severities

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// How loudly a classified error should be reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Something is broken on our side
    Error,
    /// The caller did something wrong; the system is fine
    Warning,
}

impl Severity {
    /// Wire name of the severity
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of classified error kinds
///
/// Each kind fixes its severity, HTTP-style status code and default message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Internal,
    Authentication,
    Authorization,
    NotFound,
    NotImplemented,
    Validation,
}

impl ErrorKind {
    /// All kinds, in a stable order
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::Authentication,
        ErrorKind::Authorization,
        ErrorKind::Internal,
        ErrorKind::NotFound,
        ErrorKind::NotImplemented,
        ErrorKind::Validation,
    ];

    /// Wire name of the kind (`notFound`, `notImplemented`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Internal => "internal",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Authorization => "authorization",
            ErrorKind::NotFound => "notFound",
            ErrorKind::NotImplemented => "notImplemented",
            ErrorKind::Validation => "validation",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ErrorKind::Internal | ErrorKind::NotImplemented => Severity::Error,
            ErrorKind::Authentication
            | ErrorKind::Authorization
            | ErrorKind::NotFound
            | ErrorKind::Validation => Severity::Warning,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Internal => 500,
            ErrorKind::Authentication => 401,
            ErrorKind::Authorization => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::NotImplemented => 503,
            ErrorKind::Validation => 400,
        }
    }

    /// Message used when the raising code does not supply one
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::Internal => "Internal error",
            ErrorKind::Authentication => "Authentication error",
            ErrorKind::Authorization => "Authorization error",
            ErrorKind::NotFound => "Not found error",
            ErrorKind::NotImplemented => "Not implemented error",
            ErrorKind::Validation => "Validation error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DispatchError::UnknownErrorType(s.to_string()))
    }
}
