//! HTTP server.
//!
//! [`HttpServer`] owns the route table and the global middleware. A request
//! runs through the global middleware first; the last step of that chain
//! resolves the route, binds path parameters and runs the route middleware
//! collected by the router followed by the handler. The response is written
//! from the [`Context`] after the whole chain has returned.
//!
//! # Example
//!
//! ```rust,ignore
//! use http::StatusCode;
//! use webframe_core::handler_fn;
//! use webframe_server::HttpServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = HttpServer::new();
//!     server.get("/users/:id", handler_fn(|ctx| {
//!         Box::pin(async move {
//!             let id = ctx.path_value("id").unwrap_or_default().to_string();
//!             ctx.resp_string(StatusCode::OK, id);
//!         })
//!     }));
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{header, HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, trace, warn};
use webframe_core::{BoxFuture, Context, Endpoint, HandleFunc, Middleware, Next};
use webframe_router::{RouteResult, Router};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Body written when no handler matches.
pub const NOT_FOUND_BODY: &str = "404 page not found";

/// HTTP response body type.
pub type ResponseBody = Full<Bytes>;

/// HTTP response type.
pub type HttpResponse = Response<ResponseBody>;

type RouteTable = Router<HandleFunc, Arc<dyn Middleware>>;

/// The webframe HTTP server.
pub struct HttpServer {
    router: RouteTable,
    middlewares: Vec<Arc<dyn Middleware>>,
    config: ServerConfig,
}

impl HttpServer {
    /// Creates a server with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    /// Creates a server with the given configuration.
    #[must_use]
    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            router: Router::new(),
            middlewares: Vec::new(),
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the route table.
    #[must_use]
    pub fn router(&self) -> &Router<HandleFunc, Arc<dyn Middleware>> {
        &self.router
    }

    /// Appends a global middleware. Global middleware runs for every
    /// request, matched or not, in registration order.
    pub fn use_middleware(&mut self, middleware: impl Middleware) {
        self.middlewares.push(Arc::new(middleware));
    }

    /// Registers `handler` and route middleware for `method` and `path`.
    ///
    /// # Panics
    ///
    /// Panics with the router's diagnostic if the path is malformed,
    /// conflicts with an existing route or duplicates one. Use
    /// [`HttpServer::try_route`] to handle the error instead.
    pub fn route(
        &mut self,
        method: Method,
        path: &str,
        handler: HandleFunc,
        middlewares: Vec<Arc<dyn Middleware>>,
    ) {
        if let Err(e) = self.try_route(method, path, handler, middlewares) {
            panic!("{e}");
        }
    }

    /// Fallible form of [`HttpServer::route`].
    ///
    /// # Errors
    ///
    /// Returns the router's [`webframe_router::RouteError`].
    pub fn try_route(
        &mut self,
        method: Method,
        path: &str,
        handler: HandleFunc,
        middlewares: Vec<Arc<dyn Middleware>>,
    ) -> RouteResult<()> {
        self.router.add_route(method, path, Some(handler), middlewares)
    }

    /// Attaches route middleware to `path` without a handler.
    ///
    /// The middleware runs for every request whose match passes through this
    /// node. A handler may still be registered at the same path later.
    ///
    /// # Panics
    ///
    /// Panics with the router's diagnostic if the path is malformed or
    /// conflicts with an existing route. Use [`HttpServer::try_use_route`]
    /// to handle the error instead.
    pub fn use_route(&mut self, method: Method, path: &str, middlewares: Vec<Arc<dyn Middleware>>) {
        if let Err(e) = self.try_use_route(method, path, middlewares) {
            panic!("{e}");
        }
    }

    /// Fallible form of [`HttpServer::use_route`].
    ///
    /// # Errors
    ///
    /// Returns the router's [`webframe_router::RouteError`].
    pub fn try_use_route(
        &mut self,
        method: Method,
        path: &str,
        middlewares: Vec<Arc<dyn Middleware>>,
    ) -> RouteResult<()> {
        self.router.add_route(method, path, None, middlewares)
    }

    /// Registers a `GET` handler.
    ///
    /// # Panics
    ///
    /// See [`HttpServer::route`].
    pub fn get(&mut self, path: &str, handler: HandleFunc) {
        self.route(Method::GET, path, handler, Vec::new());
    }

    /// Registers a `POST` handler.
    ///
    /// # Panics
    ///
    /// See [`HttpServer::route`].
    pub fn post(&mut self, path: &str, handler: HandleFunc) {
        self.route(Method::POST, path, handler, Vec::new());
    }

    /// Runs the full chain for one request.
    pub async fn serve(&self, ctx: &mut Context) {
        let chain = as_chain(&self.middlewares);
        let dispatch = Dispatch {
            router: &self.router,
        };
        Next::new(&chain, Some(&dispatch)).run(ctx).await;
    }

    /// Runs the full chain for a buffered request and builds the response.
    pub async fn handle(&self, request: Request<Bytes>) -> Response<Bytes> {
        let mut ctx = Context::from_request(request);
        debug!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            "request"
        );
        self.serve(&mut ctx).await;
        ctx.into_response()
    }

    /// Binds the configured address and serves until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address is invalid or cannot be
    /// bound.
    pub async fn run(self) -> ServerResult<()> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address is invalid or cannot be
    /// bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> ServerResult<()> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|e| ServerError::bind(self.config.http_addr(), e))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::bind(self.config.http_addr(), e))?;
        self.serve_listener(listener, shutdown).await
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// fires, then waits up to the shutdown timeout for open connections.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the listener's address cannot be read.
    pub async fn serve_listener(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> ServerResult<()> {
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, routes = self.router.len(), "server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => match result {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();

                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream, remote_addr, shutdown).await {
                                warn!(remote_addr = %remote_addr, error = %e, "connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(e) => error!(error = %e, "failed to accept connection"),
                },
                () = shutdown.recv() => {
                    info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        let shutdown_timeout = server.config.shutdown_timeout();
        info!(
            timeout = ?shutdown_timeout,
            active = tracker.active_connections(),
            "waiting for connections to close"
        );

        tokio::select! {
            () = tracker.wait_idle() => info!("all connections closed"),
            () = tokio::time::sleep(shutdown_timeout) => warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            ),
        }

        info!("server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let server = Arc::clone(self);
        let service = service_fn(move |request: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_incoming(request).await) }
        });

        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                debug!(remote_addr = %remote_addr, "closing connection for shutdown");
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    async fn handle_incoming(&self, request: Request<Incoming>) -> HttpResponse {
        let (parts, body) = request.into_parts();
        let outcome = tokio::time::timeout(self.config.request_timeout(), async move {
            let body = body.collect().await?.to_bytes();
            Ok::<_, hyper::Error>(self.handle(Request::from_parts(parts, body)).await)
        })
        .await;

        match outcome {
            Ok(Ok(response)) => response.map(Full::new),
            Ok(Err(e)) => {
                warn!(error = %e, "failed to read request body");
                plain_response(StatusCode::BAD_REQUEST, "400 bad request")
            }
            Err(_) => {
                warn!(timeout = ?self.config.request_timeout(), "request timed out");
                plain_response(StatusCode::GATEWAY_TIMEOUT, "504 gateway timeout")
            }
        }
    }
}

impl Default for HttpServer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServer")
            .field("routes", &self.router.len())
            .field(
                "middlewares",
                &self.middlewares.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .field("config", &self.config)
            .finish()
    }
}

/// Terminal step of the global chain: resolves the route and runs its
/// middleware and handler.
struct Dispatch<'r> {
    router: &'r RouteTable,
}

impl Endpoint for Dispatch<'_> {
    fn call<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let matched = self.router.find_route(ctx.method(), ctx.path());
            let Some(mut matched) = matched.filter(|m| m.handler().is_some()) else {
                trace!(method = %ctx.method(), path = %ctx.path(), "no handler");
                ctx.resp_string(StatusCode::NOT_FOUND, NOT_FOUND_BODY);
                return;
            };

            ctx.set_path_params(std::mem::take(&mut matched.params));
            if let Some(route) = matched.route() {
                ctx.set_matched_route(route);
            }

            let chain = as_chain(matched.middlewares.iter().copied());
            let handler = matched.handler().map(|h| h as &dyn Endpoint);
            Next::new(&chain, handler).run(ctx).await;
        })
    }
}

fn as_chain<'a>(
    middlewares: impl IntoIterator<Item = &'a Arc<dyn Middleware>>,
) -> Vec<&'a dyn Middleware> {
    middlewares.into_iter().map(|m| &**m).collect()
}

fn plain_response(status: StatusCode, body: &'static str) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
