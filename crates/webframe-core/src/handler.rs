//! Request handlers.
//!
//! A handler receives the request [`Context`] and writes its response into
//! it. Handlers are stored type-erased behind [`HandleFunc`] so a router can
//! hold any number of them.

use std::sync::Arc;

use crate::context::Context;
use crate::middleware::BoxFuture;

/// The unsized handler function type.
pub type HandlerFn = dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync;

/// A shared, type-erased request handler.
pub type HandleFunc = Arc<HandlerFn>;

/// Wraps a closure into a [`HandleFunc`].
///
/// The closure returns a boxed future borrowing the context, which keeps the
/// borrow visible to the compiler.
///
/// # Example
///
/// ```
/// use http::StatusCode;
/// use webframe_core::handler_fn;
///
/// let hello = handler_fn(|ctx| {
///     Box::pin(async move {
///         ctx.resp_string(StatusCode::OK, "hello");
///     })
/// });
/// # let _ = hello;
/// ```
pub fn handler_fn<F>(f: F) -> HandleFunc
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};

    #[tokio::test]
    async fn test_handler_fn_writes_response() {
        let handler = handler_fn(|ctx| {
            Box::pin(async move {
                let id = ctx.path_value("id").unwrap_or("none").to_string();
                ctx.resp_string(StatusCode::OK, id);
            })
        });

        let mut ctx = Context::new(Method::GET, "/users/1");
        ctx.set_path_params([("id", "1")].into_iter().collect());
        handler(&mut ctx).await;

        assert_eq!(ctx.resp_status(), Some(StatusCode::OK));
        assert_eq!(ctx.resp_data(), b"1");
    }
}
