//! # webframe middleware
//!
//! Ready-made middleware for the webframe router. Each type implements
//! [`webframe_core::Middleware`] and can be installed globally on a server or
//! attached to a route.
//!
//! | Middleware      | Purpose                                               |
//! |-----------------|-------------------------------------------------------|
//! | [`AccessLog`]   | One structured log entry and request metrics per call |
//! | [`ErrorPages`]  | Replace the body of responses with chosen statuses    |
//! | [`Recovery`]    | Turn a panic below it into a 500 response             |

#![doc(html_root_url = "https://docs.rs/webframe-middleware/0.1.0")]

mod access_log;
mod error_pages;
mod recovery;

pub use access_log::{AccessLog, AccessLogEntry};
pub use error_pages::ErrorPages;
pub use recovery::Recovery;
