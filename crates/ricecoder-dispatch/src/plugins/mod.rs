//! Store plugins
//!
//! A plugin receives the store once, may define methods or install
//! middleware, and hands back whatever it produces through
//! [`Store::plugin`]. Any `FnOnce(&mut Store) -> R` is a plugin.
//!
//! Bundled plugins:
//! - [`LoggingPlugin`]: one `tracing` span per frame with before/after events
//! - [`ModuleLoader`]: registers groups of methods under namespace paths
//! - [`ApiOverrides`]: a derived store whose top-level calls to selected
//!   methods go to replacement handlers
//!
//! # Examples
//!
//! ```ignore
//! store.plugin(LoggingPlugin::default());
//!
//! let count = store.plugin(|store: &mut Store| store.registry().len());
//!
//! let remote = store.plugin(
//!     ApiOverrides::new().intercept("api/createPost", |payload: Value, _ctx: InvocationContext| async move {
//!         client.post("/api/createPost", payload).await
//!     }),
//! );
//! ```

mod logging;
mod modules;
mod overrides;

pub use logging::{LogContext, LogPhase, LoggingMiddleware, LoggingPlugin};
pub use modules::ModuleLoader;
pub use overrides::ApiOverrides;

use crate::dispatcher::Store;

/// Something installed into a store once
pub trait Plugin {
    type Output;

    fn install(self, store: &mut Store) -> Self::Output;
}

impl<F, R> Plugin for F
where
    F: FnOnce(&mut Store) -> R,
{
    type Output = R;

    fn install(self, store: &mut Store) -> R {
        self(store)
    }
}
