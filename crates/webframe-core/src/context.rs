//! Request context types.
//!
//! A [`Context`] is created for every request. It carries the request as
//! received, the path parameters bound by the router, and the response
//! being assembled. Handlers and middleware communicate only by mutating it;
//! the server writes the response out after the whole chain has returned.

use std::any::Any;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::header::{self, HeaderValue};
use http::{HeaderMap, Method, Request, Response, StatusCode, Uri};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;
use webframe_router::Params;

use crate::error::{ValueSource, WebError, WebResult};

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, so identifiers sort by arrival in logs.
///
/// # Example
///
/// ```
/// use webframe_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-request state shared by the middleware chain and the handler.
///
/// # Example
///
/// ```
/// use http::{Method, StatusCode};
/// use webframe_core::Context;
///
/// let mut ctx = Context::new(Method::GET, "/users/42?verbose=1");
/// ctx.resp_string(StatusCode::OK, "hello");
///
/// assert_eq!(ctx.path(), "/users/42");
/// assert_eq!(ctx.query_value("verbose").unwrap(), "1");
/// assert_eq!(ctx.resp_data(), b"hello");
/// ```
pub struct Context {
    request_id: RequestId,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    path_params: Params,
    matched_route: Option<String>,
    resp_status: Option<StatusCode>,
    resp_data: Vec<u8>,
    resp_headers: HeaderMap,
    user_values: HashMap<String, Box<dyn Any + Send + Sync>>,
    query_cache: Option<Vec<(String, String)>>,
    started_at: Instant,
}

impl Context {
    /// Creates a context for a request with no headers and an empty body.
    ///
    /// An unparseable `uri` falls back to `/`.
    #[must_use]
    pub fn new(method: Method, uri: &str) -> Self {
        let uri = uri.parse().unwrap_or_else(|_| Uri::from_static("/"));
        Self::from_parts(method, uri, HeaderMap::new(), Bytes::new())
    }

    /// Creates a context from a received request.
    #[must_use]
    pub fn from_request(request: Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::from_parts(parts.method, parts.uri, parts.headers, body)
    }

    fn from_parts(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            uri,
            headers,
            body,
            path_params: Params::new(),
            matched_route: None,
            resp_status: None,
            resp_data: Vec::new(),
            resp_headers: HeaderMap::new(),
            user_values: HashMap::new(),
            query_cache: None,
            started_at: Instant::now(),
        }
    }

    /// Replaces the request body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a request header.
    #[must_use]
    pub fn with_header(mut self, name: header::HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// The identifier assigned to this request.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The full request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The request path, without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The `Host` header, or the URI authority when the header is absent.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.uri.host())
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The raw request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Path parameters bound by the router.
    #[must_use]
    pub fn path_params(&self) -> &Params {
        &self.path_params
    }

    /// Replaces the bound path parameters.
    pub fn set_path_params(&mut self, params: Params) {
        self.path_params = params;
    }

    /// The registered route the request matched, once routing has run.
    #[must_use]
    pub fn matched_route(&self) -> Option<&str> {
        self.matched_route.as_deref()
    }

    /// Records the registered route the request matched.
    pub fn set_matched_route(&mut self, route: impl Into<String>) {
        self.matched_route = Some(route.into());
    }

    /// Returns the path parameter bound to `key`.
    pub fn path_value(&self, key: &str) -> WebResult<&str> {
        self.path_params
            .get(key)
            .ok_or_else(|| WebError::key_not_found(ValueSource::Path, key))
    }

    /// Returns the path parameter bound to `key`, parsed as `T`.
    pub fn path_value_as<T>(&self, key: &str) -> WebResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        parse_value(key, self.path_value(key)?)
    }

    /// Returns the first query string value for `key`.
    ///
    /// The query string is decoded once and cached for later lookups.
    pub fn query_value(&mut self, key: &str) -> WebResult<&str> {
        if self.query_cache.is_none() {
            let pairs = serde_urlencoded::from_str(self.uri.query().unwrap_or_default())?;
            self.query_cache = Some(pairs);
        }
        self.query_cache
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| WebError::key_not_found(ValueSource::Query, key))
    }

    /// Returns the first query string value for `key`, parsed as `T`.
    pub fn query_value_as<T>(&mut self, key: &str) -> WebResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self.query_value(key)?.to_string();
        parse_value(key, &value)
    }

    /// Returns the first value for `key` from an urlencoded form body.
    pub fn form_value(&self, key: &str) -> WebResult<String> {
        let body = std::str::from_utf8(&self.body).map_err(|e| WebError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(body)?;
        pairs
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .ok_or_else(|| WebError::key_not_found(ValueSource::Form, key))
    }

    /// Decodes the request body as JSON.
    pub fn bind_json<T: DeserializeOwned>(&self) -> WebResult<T> {
        if self.body.is_empty() {
            return Err(WebError::EmptyBody);
        }
        serde_json::from_slice(&self.body).map_err(WebError::Deserialization)
    }

    /// The response status, if a handler or middleware has set one.
    #[must_use]
    pub fn resp_status(&self) -> Option<StatusCode> {
        self.resp_status
    }

    /// Sets the response status.
    pub fn set_resp_status(&mut self, status: StatusCode) {
        self.resp_status = Some(status);
    }

    /// The response body assembled so far.
    #[must_use]
    pub fn resp_data(&self) -> &[u8] {
        &self.resp_data
    }

    /// Replaces the response body.
    pub fn set_resp_data(&mut self, data: impl Into<Vec<u8>>) {
        self.resp_data = data.into();
    }

    /// Response headers.
    #[must_use]
    pub fn resp_headers(&self) -> &HeaderMap {
        &self.resp_headers
    }

    /// Mutable response headers.
    pub fn resp_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.resp_headers
    }

    /// Appends a `Set-Cookie` response header.
    pub fn set_cookie(&mut self, cookie: HeaderValue) {
        self.resp_headers.append(header::SET_COOKIE, cookie);
    }

    /// Sets the status and a plain-text body.
    pub fn resp_string(&mut self, status: StatusCode, body: impl Into<String>) {
        self.resp_status = Some(status);
        self.resp_data = body.into().into_bytes();
    }

    /// Sets the status and a JSON-encoded body.
    ///
    /// On error the response is left untouched.
    pub fn resp_json<T: Serialize + ?Sized>(&mut self, status: StatusCode, value: &T) -> WebResult<()> {
        let data = serde_json::to_vec(value).map_err(WebError::Serialization)?;
        self.resp_status = Some(status);
        self.resp_data = data;
        self.resp_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(())
    }

    /// Shorthand for [`resp_json`](Self::resp_json) with `200 OK`.
    pub fn resp_json_ok<T: Serialize + ?Sized>(&mut self, value: &T) -> WebResult<()> {
        self.resp_json(StatusCode::OK, value)
    }

    /// Stores a value for later middleware or the handler to read.
    pub fn set_user_value<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.user_values.insert(key.into(), Box::new(value));
    }

    /// Returns the value stored under `key` if it has type `T`.
    #[must_use]
    pub fn user_value<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.user_values
            .get(key)
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Removes the value stored under `key` if it has type `T`.
    pub fn remove_user_value<T: Send + Sync + 'static>(&mut self, key: &str) -> Option<T> {
        if !self.user_values.get(key).is_some_and(|v| v.is::<T>()) {
            return None;
        }
        self.user_values
            .remove(key)
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    /// Consumes the context into the response to write.
    ///
    /// An unset status is written as `200 OK`.
    #[must_use]
    pub fn into_response(self) -> Response<Bytes> {
        let mut response = Response::new(Bytes::from(self.resp_data));
        *response.status_mut() = self.resp_status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.resp_headers;
        response
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.request_id)
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("path_params", &self.path_params)
            .field("matched_route", &self.matched_route)
            .field("resp_status", &self.resp_status)
            .field("resp_len", &self.resp_data.len())
            .finish_non_exhaustive()
    }
}

fn parse_value<T>(key: &str, value: &str) -> WebResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| WebError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_request_id_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn test_context_from_request() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/users?page=2")
            .header(header::HOST, "example.com")
            .body(Bytes::from_static(b"payload"))
            .unwrap();

        let ctx = Context::from_request(request);
        assert_eq!(ctx.method(), Method::POST);
        assert_eq!(ctx.path(), "/users");
        assert_eq!(ctx.host(), Some("example.com"));
        assert_eq!(ctx.body().as_ref(), b"payload");
    }

    #[test]
    fn test_path_value() {
        let mut ctx = Context::new(Method::GET, "/users/42");
        ctx.set_path_params([("id", "42")].into_iter().collect());

        assert_eq!(ctx.path_value("id").unwrap(), "42");
        assert_eq!(ctx.path_value_as::<i64>("id").unwrap(), 42);
        assert!(matches!(
            ctx.path_value("name"),
            Err(WebError::KeyNotFound {
                source_kind: ValueSource::Path,
                ..
            })
        ));
    }

    #[test]
    fn test_path_value_parse_error() {
        let mut ctx = Context::new(Method::GET, "/users/abc");
        ctx.set_path_params([("id", "abc")].into_iter().collect());

        assert!(matches!(
            ctx.path_value_as::<i64>("id"),
            Err(WebError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_query_value() {
        let mut ctx = Context::new(Method::GET, "/search?q=rust%20lang&page=3&q=second");

        assert_eq!(ctx.query_value("q").unwrap(), "rust lang");
        assert_eq!(ctx.query_value_as::<u32>("page").unwrap(), 3);
        assert!(matches!(
            ctx.query_value("missing"),
            Err(WebError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn test_query_value_without_query() {
        let mut ctx = Context::new(Method::GET, "/search");
        assert!(ctx.query_value("q").is_err());
    }

    #[test]
    fn test_form_value() {
        let ctx = Context::new(Method::POST, "/login").with_body("user=alice&pass=s3cret");
        assert_eq!(ctx.form_value("user").unwrap(), "alice");
        assert!(ctx.form_value("token").is_err());
    }

    #[test]
    fn test_bind_json() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Login {
            user: String,
        }

        let ctx = Context::new(Method::POST, "/login").with_body(r#"{"user":"alice"}"#);
        let login: Login = ctx.bind_json().unwrap();
        assert_eq!(login.user, "alice");

        let empty = Context::new(Method::POST, "/login");
        assert!(matches!(empty.bind_json::<Login>(), Err(WebError::EmptyBody)));

        let bad = Context::new(Method::POST, "/login").with_body("{");
        assert!(matches!(
            bad.bind_json::<Login>(),
            Err(WebError::Deserialization(_))
        ));
    }

    #[test]
    fn test_resp_json() {
        let mut ctx = Context::new(Method::GET, "/");
        ctx.resp_json_ok(&serde_json::json!({"ok": true})).unwrap();

        assert_eq!(ctx.resp_status(), Some(StatusCode::OK));
        assert_eq!(ctx.resp_data(), br#"{"ok":true}"#);
        assert_eq!(
            ctx.resp_headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_user_values() {
        let mut ctx = Context::new(Method::GET, "/");
        ctx.set_user_value("user_id", 7_u64);

        assert_eq!(ctx.user_value::<u64>("user_id"), Some(&7));
        assert_eq!(ctx.user_value::<String>("user_id"), None);
        assert_eq!(ctx.remove_user_value::<String>("user_id"), None);
        assert_eq!(ctx.remove_user_value::<u64>("user_id"), Some(7));
        assert_eq!(ctx.user_value::<u64>("user_id"), None);
    }

    #[test]
    fn test_into_response_defaults_to_ok() {
        let mut ctx = Context::new(Method::GET, "/");
        ctx.set_resp_data("body");
        ctx.set_cookie(HeaderValue::from_static("session=abc"));

        let response = ctx.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"body");
        assert_eq!(response.headers().get(header::SET_COOKIE).unwrap(), "session=abc");
    }
}
