//! Access log middleware.
//!
//! Records one entry per request after the rest of the chain has run, so
//! the matched route and the final status are known. Entries go to a
//! configurable sink; the default emits a structured `tracing` event.
//!
//! Each entry also updates two metrics:
//!
//! - `webframe_http_requests_total` (counter; `method`, `route`, `status`)
//! - `webframe_http_request_duration_seconds` (histogram; `method`, `route`)

use std::sync::Arc;

use metrics::{counter, histogram};
use serde::Serialize;
use tracing::info;
use webframe_core::{BoxFuture, Context, Middleware, Next};

/// One access log record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessLogEntry {
    /// Request identifier.
    pub request_id: String,
    /// `Host` of the request, if known.
    pub host: Option<String>,
    /// Registered route that matched, if any.
    pub route: Option<String>,
    /// HTTP method.
    pub http_method: String,
    /// Request path.
    pub path: String,
    /// Response status code.
    pub status: u16,
    /// Time spent in the rest of the chain, in milliseconds.
    pub duration_ms: f64,
}

type LogFn = Arc<dyn Fn(&AccessLogEntry) + Send + Sync>;

/// Middleware that logs every request it wraps.
///
/// # Example
///
/// ```
/// use webframe_middleware::AccessLog;
///
/// let access_log = AccessLog::new().log_fn(|entry| {
///     println!("{}", serde_json::to_string(entry).unwrap_or_default());
/// });
/// # let _ = access_log;
/// ```
#[derive(Clone)]
pub struct AccessLog {
    log_fn: LogFn,
}

impl AccessLog {
    /// Creates an access log that emits `tracing` events.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log_fn: Arc::new(|entry| {
                info!(
                    request_id = %entry.request_id,
                    host = entry.host.as_deref(),
                    route = entry.route.as_deref(),
                    http_method = %entry.http_method,
                    path = %entry.path,
                    status = entry.status,
                    duration_ms = entry.duration_ms,
                    "access"
                );
            }),
        }
    }

    /// Replaces the sink entries are sent to.
    #[must_use]
    pub fn log_fn(mut self, f: impl Fn(&AccessLogEntry) + Send + Sync + 'static) -> Self {
        self.log_fn = Arc::new(f);
        self
    }
}

impl Default for AccessLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AccessLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessLog").finish_non_exhaustive()
    }
}

impl Middleware for AccessLog {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let started = std::time::Instant::now();
            next.run(ctx).await;
            let elapsed = started.elapsed();

            let entry = AccessLogEntry {
                request_id: ctx.request_id().to_string(),
                host: ctx.host().map(ToString::to_string),
                route: ctx.matched_route().map(ToString::to_string),
                http_method: ctx.method().to_string(),
                path: ctx.path().to_string(),
                status: ctx.resp_status().map_or(200, |s| s.as_u16()),
                duration_ms: elapsed.as_secs_f64() * 1000.0,
            };

            let route = entry.route.clone().unwrap_or_else(|| "unmatched".to_string());
            counter!(
                "webframe_http_requests_total",
                "method" => entry.http_method.clone(),
                "route" => route.clone(),
                "status" => entry.status.to_string()
            )
            .increment(1);
            histogram!(
                "webframe_http_request_duration_seconds",
                "method" => entry.http_method.clone(),
                "route" => route
            )
            .record(elapsed.as_secs_f64());

            (self.log_fn)(&entry);
        })
    }
}
