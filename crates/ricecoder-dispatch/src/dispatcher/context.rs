//! Per-call state: ambient context, correlation, stack frames

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use super::Store;

/// The ambient, caller-supplied context of a dispatch tree
///
/// One object is shared by every frame of a tree. Any handler or middleware
/// may mutate it and later frames see the change. Access is lock-protected,
/// but the order of writes from concurrently running siblings is up to the
/// caller.
#[derive(Clone, Default)]
pub struct Context {
    inner: Arc<RwLock<Value>>,
}

impl Context {
    pub fn new(value: Value) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// A context holding `null`
    pub fn null() -> Self {
        Self::default()
    }

    /// A copy of the current value
    pub fn get(&self) -> Value {
        self.inner.read().clone()
    }

    /// Replace the value
    pub fn set(&self, value: Value) {
        *self.inner.write() = value;
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.inner.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Value> {
        self.inner.write()
    }

    /// Mutate the value in place and return what the closure returns
    pub fn update<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Whether both handles point at the same context object
    pub fn same_as(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<Value> for Context {
    fn from(value: Value) -> Self {
        Context::new(value)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Context").field(&*self.inner.read()).finish()
    }
}

/// One entry of the call stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub cid: String,
    pub seq: u64,
    pub method: String,
}

/// Ordered trail of frames from the root call to the current one
///
/// Immutable: [`push`](Stack::push) returns a new stack and leaves the
/// original untouched, so sibling branches never see each other's frames.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    frames: Arc<Vec<Frame>>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new stack with `frame` appended
    pub fn push(&self, frame: Frame) -> Stack {
        let mut frames = Vec::with_capacity(self.frames.len() + 1);
        frames.extend(self.frames.iter().cloned());
        frames.push(frame);
        Stack {
            frames: Arc::new(frames),
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The innermost frame
    pub fn last(&self) -> Option<&Frame> {
        self.frames.last()
    }
}

impl Serialize for Stack {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.frames.as_slice().serialize(serializer)
    }
}

/// Correlation id and sequence counter shared by a whole dispatch tree
#[derive(Debug)]
pub(crate) struct Correlation {
    cid: String,
    seq: AtomicU64,
}

impl Correlation {
    pub(crate) fn new(cid: Option<String>) -> Self {
        Self {
            cid: cid.unwrap_or_else(|| Uuid::new_v4().to_string()),
            seq: AtomicU64::new(0),
        }
    }

    pub(crate) fn cid(&self) -> &str {
        &self.cid
    }

    /// Take the current sequence number and advance the counter
    pub(crate) fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst)
    }
}

/// What a handler or middleware knows about the frame it runs in
///
/// Cheap to clone. Nested [`dispatch`](InvocationContext::dispatch) calls
/// continue the same correlation: same cid, same sequence counter, same
/// ambient context, this frame's stack as their parent stack.
#[derive(Clone)]
pub struct InvocationContext {
    pub(crate) store: Store,
    pub(crate) method: Arc<str>,
    pub(crate) context: Context,
    pub(crate) correlation: Arc<Correlation>,
    pub(crate) seq: u64,
    pub(crate) meta: Value,
    pub(crate) stack: Stack,
}

impl InvocationContext {
    /// Dispatch another method within this call tree
    ///
    /// Errors come back exactly as the nested method raised them; only the
    /// outermost `Store::dispatch` normalizes them.
    pub fn dispatch(
        &self,
        name: impl Into<String>,
        payload: Value,
    ) -> BoxFuture<'static, anyhow::Result<Value>> {
        self.store.dispatch_frame(
            name.into(),
            payload,
            self.context.clone(),
            Arc::clone(&self.correlation),
            self.stack.clone(),
        )
    }

    /// Name of the method this frame is running
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The ambient context shared by the whole tree
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn cid(&self) -> &str {
        self.correlation.cid()
    }

    /// This frame's sequence number, fixed at entry
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The method's registered metadata
    pub fn meta(&self) -> &Value {
        &self.meta
    }

    /// Frames from the root call down to and including this one
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Whether this frame is the root of its tree
    pub fn is_root(&self) -> bool {
        self.stack.len() == 1
    }
}

impl fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationContext")
            .field("method", &self.method)
            .field("cid", &self.cid())
            .field("seq", &self.seq)
            .field("meta", &self.meta)
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}
