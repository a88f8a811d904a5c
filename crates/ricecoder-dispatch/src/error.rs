//! Error types for the dispatch crate itself
//!
//! These are the failures of the crate's own plumbing: rebuilding classified
//! errors from JSON, validating reasons, chain misuse and configuration
//! loading. They are distinct from [`AppError`](crate::taxonomy::AppError),
//! the classified error that handlers raise and that `dispatch` returns.
//!
//! A `DispatchError` that escapes a handler or middleware is a foreign error
//! like any other and gets wrapped into an `internal` `AppError` at the
//! dispatch boundary.
//!
//! # Examples
//!
//! ```ignore
//! match StoreConfig::load(path) {
//!     Ok(config) => Store::from_config(&config),
//!     Err(DispatchError::IoError(e)) => eprintln!("Cannot read config: {}", e),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

/// Errors raised by the dispatch crate's own plumbing
///
/// Handlers never see these directly unless they call the plumbing
/// themselves (for example `AppError::from_json` on a payload received from a
/// remote store).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A JSON error projection named a type outside the taxonomy
    ///
    /// This error occurs when rebuilding an `AppError` from its JSON form.
    /// The string contains the offending type, or `undefined` when the
    /// projection carried no type at all.
    /// Common causes:
    /// - A remote peer running a newer taxonomy
    /// - A projection built by hand with a misspelled type (`notfound`)
    #[error("error type '{0}' not found - could not build error from JSON")]
    UnknownErrorType(String),

    /// A reason is missing its string `path` or string `message`
    ///
    /// This error occurs when adding reasons from JSON. Parsing is
    /// all-or-nothing: when any entry of an array is invalid, none are added.
    /// The string describes the first invalid entry.
    #[error("Invalid reason: {0}")]
    InvalidReason(String),

    /// A middleware invoked its continuation twice
    ///
    /// This error occurs on the second call to [`Next::run`](crate::chain::Next::run)
    /// within one frame, whether or not the first call was awaited.
    /// It surfaces as the cause of an `internal` classified error.
    /// Recovery: call `next.run` once and reuse its result.
    #[error("next() called more than once")]
    NextCalledMoreThanOnce,

    /// Configuration validation error
    ///
    /// This error occurs when a parsed configuration is well-formed YAML but
    /// holds values the store cannot use.
    /// Common causes:
    /// - An empty `logging.name`
    #[error("Configuration validation error: {0}")]
    ValidationError(String),

    /// IO error while reading configuration
    ///
    /// Common causes:
    /// - Configuration file not found
    /// - Insufficient permissions on the file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML configuration could not be parsed
    ///
    /// This error occurs when the configuration file is not valid YAML or a
    /// field has the wrong type (`include_payload: maybe`).
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_yaml::Error),
}

/// Result type for the crate's plumbing operations
pub type Result<T> = std::result::Result<T, DispatchError>;
