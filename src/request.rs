//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use bytes::Bytes;
use http::{HeaderMap, Method, Uri, Version};
use http_body_util::BodyExt;

use crate::response::{Lifecycle, ResponseHead};

/// An incoming HTTP request with its body fully collected.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) version: Version,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) remote_addr: Option<SocketAddr>,
    pub(crate) client_ip: Option<IpAddr>,
    pub(crate) lifecycle: Lifecycle,
}

impl Request {
    pub(crate) fn from_parts(
        parts: http::request::Parts,
        body: Bytes,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body,
            params: HashMap::new(),
            remote_addr,
            client_ip: None,
            lifecycle: Lifecycle::default(),
        }
    }

    /// Reads the whole body off the connection. Route params are filled in
    /// later, once the middleware chain hands the request to the router.
    pub(crate) async fn from_hyper(
        req: hyper::Request<hyper::body::Incoming>,
        remote_addr: SocketAddr,
    ) -> Result<Self, hyper::Error> {
        let (parts, body) = req.into_parts();
        let body = body.collect().await?.to_bytes();
        Ok(Self::from_parts(parts, body, Some(remote_addr)))
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn version(&self) -> Version { self.version }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Values that are not visible ASCII
    /// are treated as missing.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The transport-level peer address of the connection.
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// The client IP as decided by the pipeline, if any middleware set one.
    pub fn client_ip(&self) -> Option<IpAddr> { self.client_ip }

    /// Records the real client IP, e.g. after resolving `x-forwarded-for`
    /// from a trusted proxy. Middleware registered later sees it.
    pub fn set_client_ip(&mut self, ip: IpAddr) {
        self.client_ip = Some(ip);
    }

    /// Registers a one-shot hook fired when the head of this exchange's
    /// response is handed to the connection. Hooks run in registration order.
    ///
    /// The hook follows the exchange: it fires for whichever response is
    /// finally sent, including one that replaced the handler's.
    pub fn on_headers(&self, hook: impl FnOnce() + Send + 'static) {
        self.lifecycle.on_headers(Box::new(hook));
    }

    /// Registers a one-shot hook fired when the exchange is over, with the
    /// head exactly as it was sent.
    pub fn on_finished(&self, hook: impl FnOnce(&ResponseHead) + Send + 'static) {
        self.lifecycle.on_finished(Box::new(hook));
    }
}

#[cfg(test)]
pub(crate) fn test_request(method: &str, uri: &str, headers: &[(&str, &str)]) -> Request {
    let mut builder = http::Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let (parts, ()) = builder.body(()).unwrap().into_parts();
    Request::from_parts(parts, Bytes::new(), Some(([127, 0, 0, 1], 40_000).into()))
}
