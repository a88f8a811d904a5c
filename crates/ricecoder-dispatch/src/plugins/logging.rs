//! Per-frame logging
//!
//! Each frame runs inside a `dispatch` span carrying the app name, cid, seq,
//! method and stack depth. Handlers and later middleware log with plain
//! `tracing` macros and inherit those fields.
//!
//! Events:
//! - `before_<method>` at `info` when the frame starts
//! - `after_<method> (<ms>ms)` at `info` when it resolves
//! - `after_<method> (<ms>ms)` at `warn` for warning-severity classified
//!   errors and at `error` for everything else, with the error projection,
//!   data and original cause attached
//!
//! Two hooks see a [`LogContext`] for every event. `with_custom_data` adds
//! fields (recorded as one JSON object under `custom`), and `with_log_level`
//! replaces the level picked above whenever it returns `Some`.
//!
//! ```ignore
//! store.plugin(
//!     LoggingPlugin::new(config)
//!         .with_custom_data(|log| {
//!             let mut data = serde_json::Map::new();
//!             data.insert("tenant".into(), log.context.get()["tenant"].clone());
//!             data
//!         })
//!         .with_log_level(|log| log.method.starts_with("health/").then_some(Level::DEBUG)),
//! );
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, field, info, info_span, trace, warn, Instrument, Level};

use crate::chain::{Middleware, Next};
use crate::config::LoggingConfig;
use crate::dispatcher::{Context, InvocationContext, Stack, Store};
use crate::plugins::Plugin;
use crate::taxonomy::{AppError, Severity};

type CustomDataFn = Arc<dyn Fn(&LogContext<'_>) -> Map<String, Value> + Send + Sync>;
type LogLevelFn = Arc<dyn Fn(&LogContext<'_>) -> Option<Level> + Send + Sync>;

/// Emit a `tracing` event at a level chosen at runtime
macro_rules! event_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            Level::ERROR => error!($($arg)+),
            Level::WARN => warn!($($arg)+),
            Level::INFO => info!($($arg)+),
            Level::DEBUG => debug!($($arg)+),
            _ => trace!($($arg)+),
        }
    };
}

/// Which side of the frame an event describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogPhase {
    Before,
    After,
}

impl fmt::Display for LogPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogPhase::Before => write!(f, "before"),
            LogPhase::After => write!(f, "after"),
        }
    }
}

/// Everything known about a frame at the moment an event is logged
#[derive(Debug)]
pub struct LogContext<'a> {
    pub when: LogPhase,
    pub method: &'a str,
    pub cid: &'a str,
    pub seq: u64,
    pub meta: &'a Value,
    pub stack: &'a Stack,
    pub context: &'a Context,
    pub payload: &'a Value,
    /// Elapsed time, set on `after` events
    pub ms: Option<u64>,
    /// The failure, set on `after` events of failed frames
    pub err: Option<&'a anyhow::Error>,
}

/// Installs [`LoggingMiddleware`]
#[derive(Clone, Default)]
pub struct LoggingPlugin {
    middleware: LoggingMiddleware,
}

impl LoggingPlugin {
    pub fn new(config: LoggingConfig) -> Self {
        Self {
            middleware: LoggingMiddleware::new(config),
        }
    }

    /// Merge extra fields into every event
    pub fn with_custom_data<F>(mut self, custom_data: F) -> Self
    where
        F: Fn(&LogContext<'_>) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.middleware = self.middleware.with_custom_data(custom_data);
        self
    }

    /// Override the level of events; `None` keeps the default
    pub fn with_log_level<F>(mut self, log_level: F) -> Self
    where
        F: Fn(&LogContext<'_>) -> Option<Level> + Send + Sync + 'static,
    {
        self.middleware = self.middleware.with_log_level(log_level);
        self
    }
}

impl Plugin for LoggingPlugin {
    type Output = ();

    fn install(self, store: &mut Store) {
        store.use_layer(self.middleware);
    }
}

impl fmt::Debug for LoggingPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingPlugin")
            .field("middleware", &self.middleware)
            .finish()
    }
}

/// Wraps every frame in a span and logs its outcome
///
/// Values and errors pass through unchanged.
#[derive(Clone, Default)]
pub struct LoggingMiddleware {
    config: LoggingConfig,
    custom_data: Option<CustomDataFn>,
    log_level: Option<LogLevelFn>,
}

impl LoggingMiddleware {
    pub fn new(config: LoggingConfig) -> Self {
        Self {
            config,
            custom_data: None,
            log_level: None,
        }
    }

    pub fn with_custom_data<F>(mut self, custom_data: F) -> Self
    where
        F: Fn(&LogContext<'_>) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.custom_data = Some(Arc::new(custom_data));
        self
    }

    pub fn with_log_level<F>(mut self, log_level: F) -> Self
    where
        F: Fn(&LogContext<'_>) -> Option<Level> + Send + Sync + 'static,
    {
        self.log_level = Some(Arc::new(log_level));
        self
    }

    fn has_hooks(&self) -> bool {
        self.custom_data.is_some() || self.log_level.is_some()
    }

    fn log(&self, log: &LogContext<'_>) {
        let custom = self
            .custom_data
            .as_ref()
            .map(|custom_data| Value::Object(custom_data(log)).to_string());
        let level = self
            .log_level
            .as_ref()
            .and_then(|log_level| log_level(log))
            .unwrap_or_else(|| default_level(log.err));
        let message = match log.ms {
            Some(ms) => format!("{}_{} ({}ms)", log.when, log.method, ms),
            None => format!("{}_{}", log.when, log.method),
        };
        let payload = (self.config.include_payload && log.when == LogPhase::Before)
            .then(|| log.payload.to_string());

        let Some(err) = log.err else {
            event_at!(
                level,
                ms = log.ms,
                payload = payload.as_deref(),
                custom = custom.as_deref(),
                "{}",
                message
            );
            return;
        };

        let failure = Failure::describe(err);
        event_at!(
            level,
            ms = log.ms,
            error = %failure.info,
            data = failure.data.as_deref(),
            original_error = failure.original.as_deref(),
            custom = custom.as_deref(),
            "{}",
            message
        );
    }
}

impl fmt::Debug for LoggingMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingMiddleware")
            .field("config", &self.config)
            .field("custom_data", &self.custom_data.is_some())
            .field("log_level", &self.log_level.is_some())
            .finish()
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(
        &self,
        payload: Value,
        ctx: InvocationContext,
        next: Next,
    ) -> anyhow::Result<Value> {
        let span = info_span!(
            "dispatch",
            app = %self.config.name,
            cid = %ctx.cid(),
            seq = ctx.seq(),
            method = %ctx.method(),
            depth = ctx.stack().len(),
            stack = field::Empty,
        );
        if self.config.include_stack {
            span.record("stack", &field::debug(ctx.stack().frames()));
        }

        let start = Instant::now();

        async move {
            // The payload moves into the chain; hooks still see it afterwards
            let kept = if self.has_hooks() || self.config.include_payload {
                payload.clone()
            } else {
                Value::Null
            };

            self.log(&LogContext {
                when: LogPhase::Before,
                method: ctx.method(),
                cid: ctx.cid(),
                seq: ctx.seq(),
                meta: ctx.meta(),
                stack: ctx.stack(),
                context: ctx.context(),
                payload: &kept,
                ms: None,
                err: None,
            });

            let result = next.run(payload).await;

            self.log(&LogContext {
                when: LogPhase::After,
                method: ctx.method(),
                cid: ctx.cid(),
                seq: ctx.seq(),
                meta: ctx.meta(),
                stack: ctx.stack(),
                context: ctx.context(),
                payload: &kept,
                ms: Some(start.elapsed().as_millis() as u64),
                err: result.as_ref().err(),
            });
            result
        }
        .instrument(span)
        .await
    }
}

fn default_level(err: Option<&anyhow::Error>) -> Level {
    let Some(err) = err else {
        return Level::INFO;
    };
    match err.downcast_ref::<AppError>().map(AppError::severity) {
        Some(Severity::Warning) => Level::WARN,
        _ => Level::ERROR,
    }
}

struct Failure {
    info: String,
    data: Option<String>,
    original: Option<String>,
}

impl Failure {
    fn describe(err: &anyhow::Error) -> Self {
        let Some(classified) = err.downcast_ref::<AppError>() else {
            return Self {
                info: format!("{:#}", err),
                data: None,
                original: None,
            };
        };

        Self {
            info: serde_json::to_string(&classified.to_json()).unwrap_or_default(),
            data: classified.data().map(|data| data.to_string()),
            original: classified
                .original_error()
                .map(|original| format!("{:#}", original)),
        }
    }
}
