//! # webframe server
//!
//! HTTP/1.1 server for the webframe framework, built on Hyper and Tokio.
//!
//! - [`HttpServer`] - Global middleware, route registration, dispatch and the accept loop
//! - [`ServerConfig`] - Bind address, timeouts and logging, from code, TOML or environment
//! - [`logging`] - `tracing-subscriber` initialization
//! - [`ShutdownSignal`] - Graceful shutdown on request or on SIGTERM/SIGINT
//!
//! ## Example
//!
//! ```rust,ignore
//! use webframe_server::{logging, HttpServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::from_file("webframe.toml")?.with_env_prefix("WEBFRAME")?;
//!     logging::init_logging(config.log())?;
//!
//!     let mut server = HttpServer::with_config(config);
//!     server.use_middleware(webframe_middleware::AccessLog::new());
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/webframe-server/0.1.0")]

mod config;
mod error;
pub mod logging;
mod server;
pub mod shutdown;

pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_ENV_PREFIX, DEFAULT_HTTP_ADDR,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use error::{ServerError, ServerResult};
pub use logging::{init_logging, LogConfig};
pub use server::{HttpResponse, HttpServer, ResponseBody, NOT_FOUND_BODY};
pub use shutdown::{ConnectionTracker, ShutdownSignal};
