//! Per-method routing trees.
//!
//! This module provides [`Router`], which owns one trie per HTTP method,
//! validates and registers routes, and resolves requests to a node, its
//! bound parameters and the middleware collected along the way.

use std::collections::HashMap;

use http::Method;
use tracing::{debug, trace};

use crate::error::{RouteError, RouteResult};
use crate::node::{Node, NodeKind};
use crate::params::Params;
use crate::RouteMatch;

/// A set of routing tries, one per HTTP method.
///
/// Routes are registered once at startup; afterwards the router is only
/// read, so it can be shared across request tasks without locking.
///
/// # Example
///
/// ```rust
/// use webframe_router::Router;
/// use http::Method;
///
/// let mut router: Router<&str, &str> = Router::new();
/// router.add_route(Method::GET, "/users/:id", Some("getUser"), vec![]).unwrap();
/// router.add_route(Method::GET, "/users/me", Some("getMe"), vec![]).unwrap();
///
/// let m = router.find_route(&Method::GET, "/users/123").unwrap();
/// assert_eq!(m.handler(), Some(&"getUser"));
/// assert_eq!(m.params.get("id"), Some("123"));
///
/// let m = router.find_route(&Method::GET, "/users/me").unwrap();
/// assert_eq!(m.handler(), Some(&"getMe"));
/// ```
///
/// # Route Priority
///
/// At every depth a request segment descends into:
///
/// 1. **Static segments** (e.g. `/users/me`)
/// 2. **Regex segments** whose pattern matches (e.g. `/users/:id([0-9]+)`)
/// 3. **Parameter segments** (e.g. `/users/:id`)
/// 4. **Wildcard segments** (e.g. `/files/*`)
///
/// There is no backtracking: once a segment has descended into a child, a
/// later dead end is a miss.
#[derive(Debug, Clone)]
pub struct Router<H, M> {
    trees: HashMap<Method, Node<H, M>>,
    route_count: usize,
}

impl<H, M> Default for Router<H, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H, M> Router<H, M> {
    /// Creates a router with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            trees: HashMap::new(),
            route_count: 0,
        }
    }

    /// Registers `handler` and `middlewares` at `path` for `method`.
    ///
    /// A `None` handler attaches middleware only; a handler registered later
    /// at the same path is not a duplicate. Middleware from repeated
    /// registrations is appended in order.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] if the path is malformed, if a segment
    /// conflicts with one already registered at the same position, or if a
    /// handler already exists at this path.
    pub fn add_route(
        &mut self,
        method: Method,
        path: &str,
        handler: Option<H>,
        middlewares: Vec<M>,
    ) -> RouteResult<()> {
        validate_path(path)?;

        let mut node = self.trees.entry(method.clone()).or_insert_with(Node::root);
        if path != "/" {
            for segment in path[1..].split('/') {
                node = node.child_or_create(segment)?;
            }
        }

        if let Some(handler) = handler {
            if node.handler.is_some() {
                return Err(RouteError::DuplicateRoute(path.to_string()));
            }
            node.handler = Some(handler);
            self.route_count += 1;
        }
        node.middlewares.extend(middlewares);
        node.route = Some(path.to_string());

        debug!(method = %method, path, "route registered");
        Ok(())
    }

    /// Resolves a request to a node.
    ///
    /// Leading and trailing slashes of `path` are ignored. Returns `None` if
    /// the method has no routes or some segment has no viable child; a match
    /// may still have no handler when it lands on an intermediate node.
    #[must_use]
    pub fn find_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, H, M>> {
        let Some(root) = self.trees.get(method) else {
            trace!(method = %method, path, "no routes for method");
            return None;
        };

        if path == "/" {
            return Some(RouteMatch::new(
                root,
                Params::new(),
                root.middlewares.iter().collect(),
            ));
        }

        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let mut params = Params::new();
        let mut node = root;
        for segment in &segments {
            match node.child_of(segment) {
                Some(child) => {
                    if let Some(name) = child.param_name() {
                        params.insert(name, *segment);
                    }
                    node = child;
                }
                None if node.kind() == NodeKind::Wildcard => {}
                None => {
                    trace!(method = %method, path, segment = *segment, "route miss");
                    return None;
                }
            }
        }

        trace!(method = %method, path, route = node.route(), "route matched");
        Some(RouteMatch::new(
            node,
            params,
            collect_middlewares(root, &segments),
        ))
    }

    /// Number of handlers registered across all methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    /// Returns true if no handler has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }

    /// Methods that have at least one registration.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.trees.keys()
    }
}

fn validate_path(path: &str) -> RouteResult<()> {
    if path.is_empty() {
        return Err(RouteError::EmptyPath);
    }
    if !path.starts_with('/') {
        return Err(RouteError::MissingLeadingSlash(path.to_string()));
    }
    if path != "/" && path.ends_with('/') {
        return Err(RouteError::TrailingSlash(path.to_string()));
    }
    if path.contains("//") {
        return Err(RouteError::EmptySegment(path.to_string()));
    }
    Ok(())
}

/// Breadth-first sweep over every node that can accept the request
/// segments, collecting middleware depth by depth starting at the root.
fn collect_middlewares<'a, H, M>(root: &'a Node<H, M>, segments: &[&str]) -> Vec<&'a M> {
    let mut collected = Vec::new();
    let mut queue = vec![root];
    for segment in segments {
        let mut next = Vec::new();
        for node in queue {
            collected.extend(node.middlewares.iter());
            next.extend(node.children_of(segment));
        }
        queue = next;
    }
    for node in queue {
        collected.extend(node.middlewares.iter());
    }
    collected
}
