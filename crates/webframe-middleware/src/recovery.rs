//! Panic recovery middleware.
//!
//! A panic anywhere below this middleware is caught and turned into a
//! `500 Internal Server Error` response instead of tearing down the
//! connection task.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use http::StatusCode;
use tracing::error;
use webframe_core::{BoxFuture, Context, Middleware, Next};

/// Middleware that converts panics into an error response.
#[derive(Debug, Clone)]
pub struct Recovery {
    status: StatusCode,
    body: String,
}

impl Recovery {
    /// Creates a recovery middleware answering `500 Internal Server Error`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "500 internal server error".to_string(),
        }
    }

    /// Sets the body written after a panic.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the status written after a panic.
    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl Default for Recovery {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl Middleware for Recovery {
    fn name(&self) -> &'static str {
        "recovery"
    }

    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let outcome = AssertUnwindSafe(next.run(ctx)).catch_unwind().await;
            if let Err(payload) = outcome {
                error!(
                    request_id = %ctx.request_id(),
                    path = %ctx.path(),
                    panic = panic_message(payload.as_ref()),
                    "handler panicked"
                );
                ctx.resp_string(self.status, self.body.clone());
            }
        })
    }
}
