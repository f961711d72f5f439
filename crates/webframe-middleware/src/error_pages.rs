//! Error page middleware.
//!
//! Replaces the response body for selected status codes once the rest of
//! the chain has run, for instance to serve a branded 404 page.

use std::collections::HashMap;

use http::StatusCode;
use webframe_core::{BoxFuture, Context, Middleware, Next};

/// Middleware that swaps in a registered body for matching status codes.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use webframe_middleware::ErrorPages;
///
/// let pages = ErrorPages::new()
///     .register(StatusCode::NOT_FOUND, "<h1>Nothing here</h1>")
///     .register(StatusCode::INTERNAL_SERVER_ERROR, "<h1>Oops</h1>");
/// assert_eq!(pages.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ErrorPages {
    pages: HashMap<StatusCode, Vec<u8>>,
}

impl ErrorPages {
    /// Creates a middleware with no pages registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the body served for `status`, replacing an earlier one.
    #[must_use]
    pub fn register(mut self, status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(status, body.into());
        self
    }

    /// Number of registered pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns true if no page is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl Middleware for ErrorPages {
    fn name(&self) -> &'static str {
        "error_pages"
    }

    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            next.run(ctx).await;
            if let Some(page) = ctx.resp_status().and_then(|s| self.pages.get(&s)) {
                ctx.set_resp_data(page.clone());
            }
        })
    }
}
