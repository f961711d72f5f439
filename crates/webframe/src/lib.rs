//! # webframe
//!
//! A minimal web framework with an embedded SQL statement builder.
//!
//! - [`router`] - Segment trie with static, parameter, regex and wildcard
//!   segments and node-scoped middleware
//! - [`core`] - Request context, handlers and the middleware contract
//! - [`middleware`] - Access log, error pages and panic recovery
//! - [`server`] - HTTP server, configuration, logging and shutdown
//! - [`orm`] - Entity models, statement builders, dialects and transactions
//!
//! ## Example
//!
//! ```rust
//! use http::{Method, StatusCode};
//! use webframe::prelude::*;
//!
//! let mut server = HttpServer::new();
//! server.use_middleware(Recovery::new());
//! server.get(
//!     "/users/:id",
//!     handler_fn(|ctx| {
//!         Box::pin(async move {
//!             let id = ctx.path_value("id").unwrap_or_default().to_string();
//!             ctx.resp_string(StatusCode::OK, id);
//!         })
//!     }),
//! );
//!
//! let m = server.router().find_route(&Method::GET, "/users/42").unwrap();
//! assert_eq!(m.params.get("id"), Some("42"));
//! ```

#![doc(html_root_url = "https://docs.rs/webframe/0.1.0")]

pub use webframe_core as core;
pub use webframe_middleware as middleware;
pub use webframe_orm as orm;
pub use webframe_router as router;
pub use webframe_server as server;

pub use webframe_orm::entity;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use webframe::prelude::*;
///
/// entity! {
///     pub struct User {
///         pub id: i64,
///     }
/// }
///
/// let db = Db::open(webframe::orm::testing::MockDriver::new());
/// let query = Selector::<User>::new(&db).build().unwrap();
/// assert_eq!(query.sql, "SELECT * FROM `user`;");
/// ```
pub mod prelude {
    pub use webframe_core::{
        handler_fn, Context, FnMiddleware, HandleFunc, Middleware, Next, WebError, WebResult,
    };

    pub use webframe_middleware::{AccessLog, ErrorPages, Recovery};

    pub use webframe_router::{RouteError, RouteResult, Router};

    pub use webframe_server::{HttpServer, ServerConfig, ServerError, ServerResult};

    // ORM names that clash with the router middleware contract are left
    // under `webframe::orm`.
    pub use webframe_orm::{
        assign, avg, col, count, entity, max, min, not, raw, sum, Db, Deleter, Entity, Inserter,
        OrmConfig, OrmError, OrmResult, QueryBuilder, Selector, Session, Tx, TxContext, Value,
    };
}
