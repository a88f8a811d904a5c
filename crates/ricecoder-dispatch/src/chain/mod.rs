//! Middleware chain
//!
//! Every dispatch runs through the store's middleware in registration order
//! and ends at the resolved method's handler. Each middleware receives the
//! payload, the frame's [`InvocationContext`] and a [`Next`] continuation:
//!
//! ```text
//! m1 before → m2 before → handler → m2 after → m1 after
//! ```
//!
//! A middleware may
//! - pass a different payload to `next.run(..)`,
//! - post-process the value `next.run(..)` resolves to,
//! - swallow or rethrow errors coming back from `next.run(..)`,
//! - not call `next.run(..)` at all, answering the call itself.
//!
//! Each `Next` is single-use. Calling it a second time fails with an
//! `internal` classified error instead of running the rest of the chain
//! again.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{self, BoxFuture};
use serde_json::Value;
use tracing::trace;

use crate::dispatcher::InvocationContext;
use crate::error::DispatchError;
use crate::registry::Handler;
use crate::taxonomy::AppError;

/// Cross-cutting logic wrapped around every dispatch
///
/// Closures `Fn(Value, InvocationContext, Next) -> impl Future<Output =
/// anyhow::Result<Value>>` are middleware too.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(
        &self,
        payload: Value,
        ctx: InvocationContext,
        next: Next,
    ) -> anyhow::Result<Value>;
}

#[async_trait]
impl<F, Fut> Middleware for F
where
    F: Fn(Value, InvocationContext, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    async fn handle(
        &self,
        payload: Value,
        ctx: InvocationContext,
        next: Next,
    ) -> anyhow::Result<Value> {
        (self)(payload, ctx, next).await
    }
}

/// Everything one assembled chain needs, shared by all of its positions
struct Chain {
    middleware: Arc<[Arc<dyn Middleware>]>,
    terminal: Arc<dyn Handler>,
    ctx: InvocationContext,
}

impl Chain {
    async fn run_at(self: Arc<Self>, position: usize, payload: Value) -> anyhow::Result<Value> {
        match self.middleware.get(position) {
            Some(middleware) => {
                trace!(method = %self.ctx.method(), position, "Entering middleware");
                let middleware = Arc::clone(middleware);
                let ctx = self.ctx.clone();
                let next = Next::at(Arc::clone(&self), position + 1);
                middleware.handle(payload, ctx, next).await
            }
            None => {
                trace!(method = %self.ctx.method(), "Entering handler");
                self.terminal.call(payload, self.ctx.clone()).await
            }
        }
    }
}

/// Single-use continuation into the rest of the chain
///
/// States: pending until [`run`](Next::run) is first called, invoked after.
pub struct Next {
    chain: Arc<Chain>,
    position: usize,
    invoked: AtomicBool,
}

impl Next {
    /// Assemble a chain and return its entry point
    ///
    /// `middleware` is a snapshot: later registrations on the store do not
    /// affect a chain that has already been built.
    pub fn entry(
        middleware: Arc<[Arc<dyn Middleware>]>,
        terminal: Arc<dyn Handler>,
        ctx: InvocationContext,
    ) -> Next {
        let chain = Arc::new(Chain {
            middleware,
            terminal,
            ctx,
        });
        Next::at(chain, 0)
    }

    fn at(chain: Arc<Chain>, position: usize) -> Next {
        Next {
            chain,
            position,
            invoked: AtomicBool::new(false),
        }
    }

    /// Run the rest of the chain with `payload`
    ///
    /// The pending → invoked transition happens here, synchronously, so a
    /// second call fails even if the first returned future was never awaited.
    pub fn run(&self, payload: Value) -> BoxFuture<'static, anyhow::Result<Value>> {
        if self.invoked.swap(true, Ordering::AcqRel) {
            let err = AppError::internal(DispatchError::NextCalledMoreThanOnce.to_string())
                .with_source(DispatchError::NextCalledMoreThanOnce);
            return Box::pin(future::ready(Err(err.into())));
        }

        let chain = Arc::clone(&self.chain);
        Box::pin(chain.run_at(self.position, payload))
    }

    /// Whether this continuation has been used
    pub fn is_invoked(&self) -> bool {
        self.invoked.load(Ordering::Acquire)
    }

    /// Position in the chain this continuation resumes at
    pub fn position(&self) -> usize {
        self.position
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.position)
            .field("invoked", &self.is_invoked())
            .finish()
    }
}
