//! Namespaced method modules
//!
//! A module is a registration function bound to a directory-like path. The
//! path becomes the namespace of every method the function defines:
//!
//! ```ignore
//! store.plugin(
//!     ModuleLoader::new()
//!         .module("./api", |ns| {
//!             ns.define("createPost", create_post)?;
//!             Ok(())
//!         })
//!         .module("db/posts", |ns| {
//!             ns.define("insert", insert_post)?;   // db/posts/insert
//!             Ok(())
//!         })
//!         .module("health", |ns| {
//!             ns.define_default(health)?;          // health
//!             Ok(())
//!         })
//!         .filter(|path| !path.starts_with("internal")),
//! )?;
//! ```

use tracing::debug;

use crate::dispatcher::Store;
use crate::plugins::Plugin;
use crate::registry::{normalize_namespace, Namespace};
use crate::taxonomy::AppError;

type Registration = Box<dyn FnOnce(&mut Namespace<'_>) -> Result<(), AppError> + Send>;
type ModuleFilter = Box<dyn Fn(&str) -> bool + Send>;

/// Registers modules of methods, each under its own namespace
#[derive(Default)]
pub struct ModuleLoader {
    modules: Vec<(String, Registration)>,
    filter: Option<ModuleFilter>,
}

impl ModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module under `path`
    ///
    /// `./api/v1/`, `api\v1` and `api/v1` name the same namespace; `.` and
    /// the empty path are the root.
    pub fn module<F>(mut self, path: &str, register: F) -> Self
    where
        F: FnOnce(&mut Namespace<'_>) -> Result<(), AppError> + Send + 'static,
    {
        self.modules
            .push((normalize_namespace(path), Box::new(register)));
        self
    }

    /// Only load modules whose normalized path passes `filter`
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&str) -> bool + Send + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Plugin for ModuleLoader {
    type Output = Result<(), AppError>;

    /// Run every registration in insertion order, stopping at the first error
    fn install(self, store: &mut Store) -> Result<(), AppError> {
        for (path, register) in self.modules {
            if let Some(filter) = &self.filter {
                if !filter(&path) {
                    debug!(namespace = %path, "Module skipped by filter");
                    continue;
                }
            }
            let mut namespace = store.namespace(&path);
            register(&mut namespace)?;
            debug!(namespace = %path, "Module loaded");
        }
        Ok(())
    }
}

impl std::fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let paths: Vec<&str> = self.modules.iter().map(|(path, _)| path.as_str()).collect();
        f.debug_struct("ModuleLoader")
            .field("modules", &paths)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}
