//! Router middleware contract.
//!
//! Middleware wraps request handling: it may act on the [`Context`] before
//! and after calling [`Next::run`], or skip the call to short-circuit the
//! rest of the chain.
//!
//! A chain is a slice of middleware plus an optional [`Endpoint`], usually a
//! [`HandleFunc`]. [`Next`] holds the unvisited tail of that slice, so each
//! step is a plain slice split rather than a nest of wrapping closures.
//!
//! # Example
//!
//! ```
//! use http::Method;
//! use webframe_core::{BoxFuture, Context, Middleware, Next};
//!
//! struct Tag(&'static str);
//!
//! impl Middleware for Tag {
//!     fn name(&self) -> &'static str {
//!         "tag"
//!     }
//!
//!     fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, ()> {
//!         Box::pin(async move {
//!             let mut body = ctx.resp_data().to_vec();
//!             body.extend_from_slice(self.0.as_bytes());
//!             ctx.set_resp_data(body);
//!             next.run(ctx).await;
//!         })
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let (a, b) = (Tag("a"), Tag("b"));
//! let chain: [&dyn Middleware; 2] = [&a, &b];
//! let mut ctx = Context::new(Method::GET, "/");
//! Next::new(&chain, None).run(&mut ctx).await;
//! assert_eq!(ctx.resp_data(), b"ab");
//! # });
//! ```

use std::future::Future;
use std::pin::Pin;

use crate::context::Context;
use crate::handler::HandleFunc;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A router middleware.
///
/// Middleware MUST call `next.run()` at most once. Not calling it
/// short-circuits everything after this middleware, including the handler.
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Handles the request, continuing the chain through `next`.
    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, ()>;
}

/// The terminal step of a middleware chain.
///
/// Implemented for [`HandleFunc`]; the server implements it for its route
/// dispatcher so routing itself can sit at the end of the global chain.
pub trait Endpoint: Send + Sync {
    /// Handles the request.
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()>;
}

impl Endpoint for HandleFunc {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        (**self)(ctx)
    }
}

/// The remainder of a middleware chain.
pub struct Next<'a> {
    chain: &'a [&'a dyn Middleware],
    endpoint: Option<&'a dyn Endpoint>,
}

impl<'a> Next<'a> {
    /// Creates a continuation over `chain`, ending in `endpoint`.
    #[must_use]
    pub fn new(chain: &'a [&'a dyn Middleware], endpoint: Option<&'a dyn Endpoint>) -> Self {
        Self { chain, endpoint }
    }

    /// Number of middleware still to run.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }

    /// Runs the next middleware, or the endpoint once the chain is exhausted.
    ///
    /// This consumes `self` so the rest of the chain runs at most once.
    pub async fn run(self, ctx: &mut Context) {
        match self.chain.split_first() {
            Some((middleware, rest)) => {
                let next = Next {
                    chain: rest,
                    endpoint: self.endpoint,
                };
                middleware.handle(ctx, next).await;
            }
            None => {
                if let Some(endpoint) = self.endpoint {
                    endpoint.call(ctx).await;
                }
            }
        }
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field(
                "chain",
                &self.chain.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field("has_endpoint", &self.endpoint.is_some())
            .finish()
    }
}

/// A middleware built from a closure.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use webframe_core::FnMiddleware;
///
/// let teapot = FnMiddleware::new("teapot", |ctx, next| {
///     Box::pin(async move {
///         next.run(ctx).await;
///         ctx.set_resp_status(StatusCode::IM_A_TEAPOT);
///     })
/// });
/// # let _ = teapot;
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    /// Creates a function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, ()> {
        (self.func)(ctx, next)
    }
}

impl<F> std::fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMiddleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler_fn, HandleFunc};
    use http::{Method, StatusCode};
    use std::sync::Arc;

    struct Recorder {
        name: &'static str,
    }

    impl Middleware for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn handle<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, ()> {
            Box::pin(async move {
                push(ctx, &format!("{}>", self.name));
                next.run(ctx).await;
                push(ctx, &format!("<{}", self.name));
            })
        }
    }

    struct ShortCircuit;

    impl Middleware for ShortCircuit {
        fn name(&self) -> &'static str {
            "short-circuit"
        }

        fn handle<'a>(&'a self, ctx: &'a mut Context, _next: Next<'a>) -> BoxFuture<'a, ()> {
            Box::pin(async move {
                ctx.resp_string(StatusCode::UNAUTHORIZED, "denied");
            })
        }
    }

    fn push(ctx: &mut Context, s: &str) {
        let mut body = ctx.resp_data().to_vec();
        body.extend_from_slice(s.as_bytes());
        ctx.set_resp_data(body);
    }

    fn endpoint() -> HandleFunc {
        handler_fn(|ctx| {
            Box::pin(async move {
                push(ctx, "handler");
            })
        })
    }

    #[tokio::test]
    async fn test_chain_order() {
        let (a, b) = (Recorder { name: "a" }, Recorder { name: "b" });
        let chain: Vec<&dyn Middleware> = vec![&a, &b];
        let handler = endpoint();

        let mut ctx = Context::new(Method::GET, "/");
        Next::new(&chain, Some(&handler)).run(&mut ctx).await;

        assert_eq!(
            String::from_utf8_lossy(ctx.resp_data()),
            "a>b>handler<b<a"
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let a = Recorder { name: "a" };
        let chain: Vec<&dyn Middleware> = vec![&a, &ShortCircuit];
        let handler = endpoint();

        let mut ctx = Context::new(Method::GET, "/");
        Next::new(&chain, Some(&handler)).run(&mut ctx).await;

        assert_eq!(ctx.resp_status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(String::from_utf8_lossy(ctx.resp_data()), "denied<a");
    }

    #[tokio::test]
    async fn test_empty_chain_without_endpoint() {
        let mut ctx = Context::new(Method::GET, "/");
        Next::new(&[], None).run(&mut ctx).await;
        assert!(ctx.resp_data().is_empty());
        assert!(ctx.resp_status().is_none());
    }

    #[tokio::test]
    async fn test_fn_middleware() {
        let mw: Arc<dyn Middleware> = Arc::new(FnMiddleware::new("teapot", |ctx, next| {
            Box::pin(async move {
                next.run(ctx).await;
                ctx.set_resp_status(StatusCode::IM_A_TEAPOT);
            })
        }));
        assert_eq!(mw.name(), "teapot");

        let chain: Vec<&dyn Middleware> = vec![mw.as_ref()];
        let handler = endpoint();
        let mut ctx = Context::new(Method::GET, "/");
        let next = Next::new(&chain, Some(&handler));
        assert_eq!(next.remaining(), 1);
        next.run(&mut ctx).await;

        assert_eq!(ctx.resp_status(), Some(StatusCode::IM_A_TEAPOT));
        assert_eq!(ctx.resp_data(), b"handler");
    }
}
