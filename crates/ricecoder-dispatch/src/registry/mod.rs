//! Method registry
//!
//! Maps method names to their handler and opaque metadata. Names are
//! hierarchical: one or more `/`-separated segments, each matching
//! `[A-Za-z_][A-Za-z_0-9]*`, e.g. `api/createPost` or `db/posts/insert`.
//!
//! The registry only validates and stores; it never inspects `meta` and
//! never runs handlers.
//!
//! # Examples
//!
//! ```ignore
//! let registry = MethodRegistry::new();
//! registry.define("auth/requireAdmin", Arc::new(require_admin), json!({ "public": false }))?;
//!
//! let entry = registry.resolve("auth/requireAdmin").unwrap();
//! assert_eq!(entry.meta, json!({ "public": false }));
//! ```

mod handler;
mod namespace;

pub use handler::Handler;
pub use namespace::{normalize_namespace, Namespace};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::taxonomy::AppError;

static METHOD_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z_0-9]*(/[a-zA-Z_][a-zA-Z_0-9]*)*$")
        .expect("method name pattern is valid")
});

/// Check a method name against the segment pattern
pub fn is_valid_method_name(name: &str) -> bool {
    METHOD_NAME.is_match(name)
}

/// A registered method
pub struct MethodEntry {
    pub name: String,
    pub handler: Arc<dyn Handler>,
    pub meta: Value,
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("name", &self.name)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Name-keyed method storage
///
/// Cloning is cheap and yields a handle to the same map, which is how
/// derived stores share their parent's methods.
#[derive(Clone, Default)]
pub struct MethodRegistry {
    methods: Arc<RwLock<HashMap<String, Arc<MethodEntry>>>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method
    ///
    /// # Errors
    ///
    /// Returns a `validation` error if the name does not match the segment
    /// pattern or is already defined. The registry is unchanged on error.
    pub fn define(
        &self,
        name: &str,
        handler: Arc<dyn Handler>,
        meta: Value,
    ) -> Result<(), AppError> {
        if !is_valid_method_name(name) {
            return Err(AppError::validation(format!(
                "Invalid method name: '{}'",
                name
            )));
        }

        let mut methods = self.methods.write();
        if methods.contains_key(name) {
            return Err(AppError::validation(format!(
                "Method '{}' is already defined",
                name
            )));
        }

        methods.insert(
            name.to_string(),
            Arc::new(MethodEntry {
                name: name.to_string(),
                handler,
                meta,
            }),
        );
        debug!(method = %name, "Method defined");
        Ok(())
    }

    /// Look up a method by exact name
    pub fn resolve(&self, name: &str) -> Option<Arc<MethodEntry>> {
        self.methods.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.methods.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All method names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.names())
            .finish()
    }
}
