//! Segment trie router for webframe.
//!
//! Routes are stored in one trie per HTTP method. Each trie node owns a
//! single path segment, so matching a request walks the trie one segment at
//! a time.
//!
//! # Features
//!
//! - **Static segments**: `/users/home`
//! - **Parameters**: `/users/:id` binds the segment to `id`
//! - **Regex parameters**: `/users/:id([0-9]+)` binds only when the pattern matches
//! - **Wildcards**: `/files/*` matches any segment and absorbs the rest of the path
//! - **Scoped middleware**: middleware attached to a node applies to every
//!   request that can reach it
//!
//! # Example
//!
//! ```rust
//! use webframe_router::Router;
//! use http::Method;
//!
//! let mut router: Router<&str, &str> = Router::new();
//! router.add_route(Method::GET, "/users", Some("listUsers"), vec!["auth"]).unwrap();
//! router.add_route(Method::GET, "/users/:id", Some("getUser"), vec![]).unwrap();
//! router.add_route(Method::GET, "/files/*", Some("serveFile"), vec![]).unwrap();
//!
//! let m = router.find_route(&Method::GET, "/users/123").unwrap();
//! assert_eq!(m.handler(), Some(&"getUser"));
//! assert_eq!(m.params.get("id"), Some("123"));
//! assert_eq!(m.middlewares, vec![&"auth"]);
//!
//! let m = router.find_route(&Method::GET, "/files/images/logo.png").unwrap();
//! assert_eq!(m.handler(), Some(&"serveFile"));
//! ```
//!
//! # Architecture
//!
//! ```text
//!              GET (root "/")
//!                    │
//!          ┌─────────┴─────────┐
//!          │                   │
//!       "users"             "files"
//!     [listUsers]              │
//!          │                  "*"
//!        ":id"            [serveFile]
//!      [getUser]
//! ```

mod error;
mod node;
mod params;
mod router;

pub use error::{RouteError, RouteResult};
pub use node::{Node, NodeKind};
pub use params::Params;
pub use router::Router;

/// The outcome of a successful [`Router::find_route`].
#[derive(Debug)]
pub struct RouteMatch<'a, H, M> {
    node: &'a Node<H, M>,
    /// Parameters bound along the match path.
    pub params: Params,
    /// Middleware collected by the sweep, root first.
    pub middlewares: Vec<&'a M>,
}

impl<'a, H, M> RouteMatch<'a, H, M> {
    pub(crate) fn new(node: &'a Node<H, M>, params: Params, middlewares: Vec<&'a M>) -> Self {
        Self {
            node,
            params,
            middlewares,
        }
    }

    /// The node the request resolved to.
    #[must_use]
    pub fn node(&self) -> &'a Node<H, M> {
        self.node
    }

    /// The handler at the matched node, if one was registered.
    #[must_use]
    pub fn handler(&self) -> Option<&'a H> {
        self.node.handler.as_ref()
    }

    /// The path the matched node was registered under.
    #[must_use]
    pub fn route(&self) -> Option<&'a str> {
        self.node.route.as_deref()
    }
}
