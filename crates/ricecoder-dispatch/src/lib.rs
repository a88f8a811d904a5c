//! RiceCoder Dispatch
//!
//! An in-process method dispatcher: named methods, a middleware chain around
//! every call, correlated nested calls and a closed taxonomy of classified
//! errors.
//!
//! # Overview
//!
//! Application logic is written as small async methods registered under
//! hierarchical names (`api/createPost`, `auth/requireAdmin`). Methods call
//! each other through the dispatcher instead of directly, so every call, at
//! any depth, passes through the same middleware (logging, auth, tracing)
//! and carries the same correlation id. Any error leaving a dispatch is an
//! [`AppError`] with a fixed type, severity and status code.
//!
//! # Architecture
//!
//! 1. **Method Registry** (`registry`): validates names and stores handlers
//!    with opaque metadata
//! 2. **Middleware Chain** (`chain`): composes middleware around a handler
//!    with single-use continuations
//! 3. **Dispatcher** (`dispatcher`): the [`Store`]; resolves methods, tracks
//!    cid, seq and stack, runs the chain
//! 4. **Error Taxonomy** (`taxonomy`): [`AppError`], [`ErrorKind`],
//!    [`Reason`] and [`wrap_error`]
//! 5. **Plugins** (`plugins`): logging, namespaced modules, API overrides
//! 6. **Configuration** (`config`): YAML configuration for the store
//!
//! # Quick Start
//!
//! ```ignore
//! use ricecoder_dispatch::{AppError, DispatchOptions, InvocationContext, Next, Store};
//! use serde_json::{json, Value};
//!
//! let mut store = Store::new();
//!
//! store.use_middleware(|payload: Value, ctx: InvocationContext, next: Next| async move {
//!     tracing::info!(method = %ctx.method(), seq = ctx.seq(), "call");
//!     next.run(payload).await
//! });
//!
//! store
//!     .define("api/createPost", |payload: Value, ctx: InvocationContext| async move {
//!         ctx.dispatch("auth/requireAdmin", Value::Null).await?;
//!         ctx.dispatch("db/insertPost", payload).await
//!     })?
//!     .define("auth/requireAdmin", |_payload: Value, ctx: InvocationContext| async move {
//!         if ctx.context().get()["admin"] == json!(true) {
//!             Ok(Value::Null)
//!         } else {
//!             Err(AppError::authorization("Admins only").into())
//!         }
//!     })?
//!     .define("db/insertPost", |payload: Value, _ctx: InvocationContext| async move {
//!         Ok(json!({ "id": 1, "post": payload }))
//!     })?;
//!
//! let post = store
//!     .dispatch(
//!         "api/createPost",
//!         json!({ "title": "Hello" }),
//!         Some(json!({ "admin": true }).into()),
//!         DispatchOptions::default(),
//!     )
//!     .await?;
//! ```
//!
//! # Call Trees
//!
//! A top-level [`Store::dispatch`] starts a tree. Every frame in it shares
//! the cid and a sequence counter; frames get seq `0, 1, 2, ...` in call
//! order. Each frame sees the stack of `{cid, seq, method}` frames from the
//! root down to itself; sibling branches never see each other's frames.
//!
//! # Error Handling
//!
//! Handlers and middleware return `anyhow::Result<Value>`. Raise an
//! `AppError` to fail with a classified error; anything else is wrapped into
//! an `internal` error at the top-level dispatch. The crate's own plumbing
//! errors use [`DispatchError`] and the [`Result`] alias.
//!
//! # Thread Safety
//!
//! `Store`, `InvocationContext` and `Context` are `Send + Sync` and cheap to
//! clone. Concurrent sibling dispatches within one tree get distinct seqs.

pub mod chain;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod plugins;
pub mod registry;
pub mod taxonomy;

// Re-export public types
pub use chain::{Middleware, Next};
pub use config::{LoggingConfig, StoreConfig};
pub use dispatcher::{
    Context, ContextProvider, DispatchOptions, Frame, InvocationContext, Stack, Store,
};
pub use error::{DispatchError, Result};
pub use plugins::{
    ApiOverrides, LogContext, LogPhase, LoggingMiddleware, LoggingPlugin, ModuleLoader, Plugin,
};
pub use registry::{
    is_valid_method_name, normalize_namespace, Handler, MethodEntry, MethodRegistry, Namespace,
};
pub use taxonomy::{wrap_error, AppError, ErrorJson, ErrorKind, Reason, Severity};
