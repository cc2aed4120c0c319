//! The facts a token can be resolved against.

use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri, Version};

use super::timing::TimingMarks;
use crate::request::Request;
use crate::response::ResponseHead;

/// What the logger keeps of a request once it has been passed onward.
///
/// Captured when the request reaches the logger, so it also preserves the
/// peer address after the connection is gone.
#[derive(Clone, Debug)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub client_ip: Option<IpAddr>,
    pub remote_addr: Option<SocketAddr>,
}

impl RequestHead {
    pub fn capture(req: &Request) -> Self {
        Self {
            method: req.method.clone(),
            uri: req.uri.clone(),
            version: req.version,
            headers: req.headers.clone(),
            body: req.body.clone(),
            client_ip: req.client_ip,
            remote_addr: req.remote_addr,
        }
    }
}

/// One finished (or abandoned) exchange, as seen by the render routine.
///
/// `response` is `None` when the exchange ended before a response existed.
/// `now` is the moment of rendering; keeping it explicit makes a render a
/// pure function of this struct.
pub struct Exchange<'a> {
    pub request: &'a RequestHead,
    pub response: Option<&'a ResponseHead>,
    pub timing: &'a TimingMarks,
    pub now: Instant,
}
