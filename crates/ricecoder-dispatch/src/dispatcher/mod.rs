//! Method dispatcher
//!
//! [`Store`] ties the registry and the middleware chain together. A call to
//! [`Store::dispatch`] is the root of a dispatch tree:
//!
//! 1. a correlation id is taken from the options or generated (v4 UUID) and
//!    the sequence counter starts at 0;
//! 2. the method is resolved; unknown names fail with `notImplemented`
//!    before any middleware runs;
//! 3. the frame takes the current sequence number and the counter advances;
//! 4. the frame is appended to a copy of the parent's stack;
//! 5. the middleware snapshot and the handler are assembled into a chain and
//!    run with the payload.
//!
//! Handlers re-enter this flow through [`InvocationContext::dispatch`]; nested
//! frames share the cid, the counter and the ambient context. Whatever error
//! reaches the root is normalized with [`wrap_error`], so callers only ever
//! see an [`AppError`].
//!
//! # Examples
//!
//! ```ignore
//! let mut store = Store::new();
//! store
//!     .define("api/createPost", |payload: Value, ctx: InvocationContext| async move {
//!         ctx.dispatch("auth/requireAdmin", Value::Null).await?;
//!         ctx.dispatch("db/insertPost", payload).await
//!     })?
//!     .define("auth/requireAdmin", |_payload: Value, ctx: InvocationContext| async move {
//!         match ctx.context().get()["role"].as_str() {
//!             Some("admin") => Ok(Value::Null),
//!             _ => Err(AppError::authorization("Admins only").into()),
//!         }
//!     })?;
//!
//! let post = store
//!     .dispatch("api/createPost", json!({ "title": "Hello" }), Some(context), DispatchOptions::default())
//!     .await?;
//! ```

mod context;

pub use context::{Context, Frame, InvocationContext, Stack};

pub(crate) use context::Correlation;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, trace};

use crate::chain::{Middleware, Next};
use crate::config::StoreConfig;
use crate::plugins::{LoggingPlugin, Plugin};
use crate::registry::{Handler, MethodRegistry, Namespace};
use crate::taxonomy::{wrap_error, AppError};

/// Produces the ambient context for dispatches that do not pass one
pub type ContextProvider = Arc<dyn Fn() -> Context + Send + Sync>;

/// Per-call options for [`Store::dispatch`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Correlation id to use instead of a fresh v4 UUID, e.g. one received
    /// from another service
    pub cid: Option<String>,
}

impl DispatchOptions {
    pub fn with_cid(cid: impl Into<String>) -> Self {
        Self {
            cid: Some(cid.into()),
        }
    }
}

/// Method registry plus middleware chain
///
/// Cloning is cheap; clones share methods and middleware. Use
/// [`derive`](Store::derive) for a store with its own middleware list.
#[derive(Clone, Default)]
pub struct Store {
    registry: MethodRegistry,
    middleware: Arc<RwLock<Vec<Arc<dyn Middleware>>>>,
    default_context: Option<ContextProvider>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store and install the plugins the configuration enables
    pub fn from_config(config: &StoreConfig) -> Self {
        let mut store = Store::new();
        if config.logging.enabled {
            store.plugin(LoggingPlugin::new(config.logging.clone()));
        }
        store
    }

    /// Use `provider` for dispatches that pass no context
    pub fn with_default_context<P>(mut self, provider: P) -> Self
    where
        P: Fn() -> Context + Send + Sync + 'static,
    {
        self.default_context = Some(Arc::new(provider));
        self
    }

    /// The context a dispatch without one would get
    pub fn default_context(&self) -> Context {
        match &self.default_context {
            Some(provider) => provider(),
            None => Context::null(),
        }
    }

    /// Define a method with `null` metadata
    ///
    /// # Errors
    ///
    /// Returns a `validation` error for an invalid or duplicate name.
    pub fn define<F, Fut>(&mut self, name: &str, handler: F) -> Result<&mut Self, AppError>
    where
        F: Fn(Value, InvocationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.define_with_meta(name, handler, Value::Null)
    }

    /// Define a method with metadata passed to every invocation's context
    pub fn define_with_meta<F, Fut>(
        &mut self,
        name: &str,
        handler: F,
        meta: Value,
    ) -> Result<&mut Self, AppError>
    where
        F: Fn(Value, InvocationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.define_handler(name, handler, meta)
    }

    /// Define a method from any [`Handler`] implementation
    pub fn define_handler(
        &mut self,
        name: &str,
        handler: impl Handler + 'static,
        meta: Value,
    ) -> Result<&mut Self, AppError> {
        self.registry.define(name, Arc::new(handler), meta)?;
        Ok(self)
    }

    /// Append a middleware closure to the chain
    pub fn use_middleware<F, Fut>(&mut self, middleware: F) -> &mut Self
    where
        F: Fn(Value, InvocationContext, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.use_layer(middleware)
    }

    /// Append any [`Middleware`] implementation to the chain
    pub fn use_layer(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        let mut chain = self.middleware.write();
        chain.push(Arc::new(middleware));
        debug!(position = chain.len() - 1, "Middleware registered");
        drop(chain);
        self
    }

    /// Hand the store to a plugin and return whatever it produces
    pub fn plugin<P: Plugin>(&mut self, plugin: P) -> P::Output {
        plugin.install(self)
    }

    /// A definer that prefixes every method name with `prefix/`
    pub fn namespace(&mut self, prefix: &str) -> Namespace<'_> {
        Namespace::new(self, prefix)
    }

    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    pub fn middleware_count(&self) -> usize {
        self.middleware.read().len()
    }

    /// A store sharing this one's methods but with its own copy of the
    /// middleware list
    ///
    /// Methods defined on either store are visible to both; middleware added
    /// to the derived store is not.
    pub fn derive(&self) -> Store {
        Store {
            registry: self.registry.clone(),
            middleware: Arc::new(RwLock::new(self.middleware.read().clone())),
            default_context: self.default_context.clone(),
        }
    }

    /// Dispatch `name` as the root of a new call tree
    ///
    /// # Errors
    ///
    /// Returns the classified error raised anywhere in the tree, or an
    /// `internal` error wrapping a foreign one.
    pub async fn dispatch(
        &self,
        name: &str,
        payload: Value,
        context: Option<Context>,
        options: DispatchOptions,
    ) -> Result<Value, AppError> {
        let context = context.unwrap_or_else(|| self.default_context());
        let correlation = Arc::new(Correlation::new(options.cid));
        debug!(method = %name, cid = %correlation.cid(), "Dispatching");

        self.dispatch_frame(name.to_string(), payload, context, correlation, Stack::new())
            .await
            .map_err(wrap_error)
    }

    /// Dispatch with the default context and options
    pub async fn call(&self, name: &str, payload: Value) -> Result<Value, AppError> {
        self.dispatch(name, payload, None, DispatchOptions::default())
            .await
    }

    /// One frame of a tree: resolve, take a sequence number, extend the
    /// stack and start the chain
    ///
    /// Everything up to starting the chain happens synchronously, so
    /// siblings get sequence numbers in the order they were dispatched, not
    /// the order they are first polled.
    pub(crate) fn dispatch_frame(
        &self,
        name: String,
        payload: Value,
        context: Context,
        correlation: Arc<Correlation>,
        stack: Stack,
    ) -> BoxFuture<'static, anyhow::Result<Value>> {
        let Some(entry) = self.registry.resolve(&name) else {
            let err = AppError::not_implemented(format!("Method '{}' is not defined", name));
            return Box::pin(future::ready(Err(err.into())));
        };

        let seq = correlation.next_seq();
        let stack = stack.push(Frame {
            cid: correlation.cid().to_string(),
            seq,
            method: name.clone(),
        });
        trace!(method = %name, cid = %correlation.cid(), seq, depth = stack.len(), "Entering frame");

        let ctx = InvocationContext {
            store: self.clone(),
            method: Arc::from(name),
            context,
            correlation,
            seq,
            meta: entry.meta.clone(),
            stack,
        };
        let middleware: Arc<[Arc<dyn Middleware>]> =
            self.middleware.read().iter().cloned().collect();

        Next::entry(middleware, Arc::clone(&entry.handler), ctx).run(payload)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("registry", &self.registry)
            .field("middleware", &self.middleware_count())
            .field("default_context", &self.default_context.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_new_store_is_empty() {
        let store = Store::new();
        assert!(store.registry().is_empty());
        assert_eq!(store.middleware_count(), 0);
        assert_eq!(store.default_context().get(), Value::Null);
    }

    #[test]
    fn test_define_is_chainable() {
        let mut store = Store::new();
        store
            .define("a", |_p: Value, _c: InvocationContext| async { Ok(json!("a")) })
            .unwrap()
            .define("b/c", |_p: Value, _c: InvocationContext| async { Ok(json!("c")) })
            .unwrap();
        assert_eq!(store.registry().names(), vec!["a", "b/c"]);
    }

    #[test]
    fn test_define_rejects_duplicate_through_store() {
        let mut store = Store::new();
        store
            .define("test", |_p: Value, _c: InvocationContext| async { Ok(Value::Null) })
            .unwrap();
        let err = store
            .define("test", |_p: Value, _c: InvocationContext| async { Ok(Value::Null) })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "Method 'test' is already defined");
    }

    #[test]
    fn test_default_context_provider() {
        let shared = Context::new(json!({ "tenant": "acme" }));
        let provided = shared.clone();
        let store = Store::new().with_default_context(move || provided.clone());
        assert!(store.default_context().same_as(&shared));
    }

    #[test]
    fn test_derive_shares_methods_but_not_middleware() {
        let mut store = Store::new();
        store.use_middleware(|payload: Value, _c: InvocationContext, next: Next| async move {
            next.run(payload).await
        });

        let mut derived = store.derive();
        derived.use_middleware(|payload: Value, _c: InvocationContext, next: Next| async move {
            next.run(payload).await
        });
        store
            .define("late", |_p: Value, _c: InvocationContext| async { Ok(Value::Null) })
            .unwrap();

        assert_eq!(store.middleware_count(), 1);
        assert_eq!(derived.middleware_count(), 2);
        assert!(derived.registry().contains("late"));
    }

    #[test]
    fn test_dispatch_options_with_cid() {
        assert_eq!(DispatchOptions::with_cid("abc").cid.as_deref(), Some("abc"));
        assert!(DispatchOptions::default().cid.is_none());
    }
}
