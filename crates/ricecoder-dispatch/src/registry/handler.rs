//! The method capability interface

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::dispatcher::InvocationContext;

/// A method body: takes the payload and this frame's invocation context
///
/// Any `Fn(Value, InvocationContext) -> impl Future<Output = anyhow::Result<Value>>`
/// closure is a handler:
///
/// ```ignore
/// store.define("db/insertPost", |payload: Value, ctx: InvocationContext| async move {
///     let id = insert(payload).await?;
///     Ok(json!({ "id": id, "cid": ctx.cid() }))
/// })?;
/// ```
///
/// Return an [`AppError`](crate::taxonomy::AppError) (through `?` or
/// `.into()`) to fail with a classified error; any other error is wrapped
/// into an `internal` one at the dispatch boundary.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, payload: Value, ctx: InvocationContext) -> anyhow::Result<Value>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Value, InvocationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    async fn call(&self, payload: Value, ctx: InvocationContext) -> anyhow::Result<Value> {
        (self)(payload, ctx).await
    }
}
