//! # webframe core
//!
//! Contracts shared by the webframe server and middleware crates:
//!
//! - [`Context`] - Per-request state: the request, bound path parameters and the response being built
//! - [`RequestId`] - UUID v7 request identifier
//! - [`HandleFunc`] - Type-erased request handler
//! - [`Middleware`] / [`Next`] / [`Endpoint`] - Middleware contract, chain continuation and chain terminal
//! - [`WebError`] - Errors from the context conveniences

#![doc(html_root_url = "https://docs.rs/webframe-core/0.1.0")]

mod context;
mod error;
mod handler;
mod middleware;

pub use context::{Context, RequestId};
pub use error::{ValueSource, WebError, WebResult};
pub use handler::{handler_fn, HandleFunc, HandlerFn};
pub use middleware::{BoxFuture, Endpoint, FnMiddleware, Middleware, Next};
pub use webframe_router::Params;
