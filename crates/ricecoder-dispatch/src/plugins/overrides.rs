//! Replacement handlers for top-level calls
//!
//! Installing [`ApiOverrides`] returns a derived store: it shares the
//! original's methods, starts from a copy of its middleware and appends one
//! more middleware. That middleware answers root calls (`seq == 0`) to the
//! listed methods with their replacement handler, e.g. a client that sends
//! the call to a remote server. Nested calls and unlisted methods go through
//! the normal chain. The original store is not changed.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::chain::{Middleware, Next};
use crate::dispatcher::{InvocationContext, Store};
use crate::plugins::Plugin;
use crate::registry::Handler;

/// Builds a derived store with method overrides
#[derive(Default)]
pub struct ApiOverrides {
    api: HashMap<String, Arc<dyn Handler>>,
}

impl ApiOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer top-level calls to `method` with `handler`
    pub fn intercept<F, Fut>(self, method: &str, handler: F) -> Self
    where
        F: Fn(Value, InvocationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.intercept_with(method, handler)
    }

    pub fn intercept_with(mut self, method: &str, handler: impl Handler + 'static) -> Self {
        self.api.insert(method.to_string(), Arc::new(handler));
        self
    }

    pub fn methods(&self) -> Vec<&str> {
        let mut methods: Vec<&str> = self.api.keys().map(String::as_str).collect();
        methods.sort_unstable();
        methods
    }
}

impl Plugin for ApiOverrides {
    type Output = Store;

    fn install(self, store: &mut Store) -> Store {
        let mut derived = store.derive();
        derived.use_layer(OverrideMiddleware { api: self.api });
        derived
    }
}

impl std::fmt::Debug for ApiOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiOverrides")
            .field("methods", &self.methods())
            .finish()
    }
}

struct OverrideMiddleware {
    api: HashMap<String, Arc<dyn Handler>>,
}

#[async_trait]
impl Middleware for OverrideMiddleware {
    async fn handle(
        &self,
        payload: Value,
        ctx: InvocationContext,
        next: Next,
    ) -> anyhow::Result<Value> {
        let replacement = match self.api.get(ctx.method()) {
            Some(handler) if ctx.seq() == 0 => Arc::clone(handler),
            _ => return next.run(payload).await,
        };

        debug!(method = %ctx.method(), cid = %ctx.cid(), "Answering call with override");
        replacement.call(payload, ctx).await
    }
}
