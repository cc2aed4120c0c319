//! Outgoing HTTP response type, the per-exchange lifecycle hooks, and the
//! [`IntoResponse`] conversion trait.
//!
//! Build a [`Response`] in your handler and return it. Middleware that needs
//! to observe *when* the response actually goes out (rather than when the
//! handler returned it) registers hooks on the request, through
//! [`Request::on_headers`](crate::Request::on_headers) and
//! [`Request::on_finished`](crate::Request::on_finished):
//!
//! - a headers hook fires once, when the head is handed to the connection,
//!   before any body byte.
//! - a finished hook fires once, when the connection releases the body:
//!   after it has been written, or when the client went away.
//!
//! Hooks belong to the exchange, not to a particular [`Response`] value, so
//! they fire for whichever response reaches the connection, even one an
//! outer middleware built to replace the handler's. If the exchange ends
//! before any response reaches the connection, neither fires and the hooks
//! are dropped unrun.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use hyper::body::{Body, Frame, SizeHint};
use tracing::warn;

type HeadersHook = Box<dyn FnOnce() + Send + 'static>;
type FinishedHook = Box<dyn FnOnce(&ResponseHead) + Send + 'static>;

// ── Lifecycle ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Hooks {
    headers: Vec<HeadersHook>,
    finished: Vec<FinishedHook>,
}

/// Hooks armed for one exchange. Cloned into the request so middleware can
/// register on it; the dispatcher keeps its own handle and drains it into
/// the response that is actually sent.
#[derive(Clone, Default)]
pub(crate) struct Lifecycle(Arc<Mutex<Hooks>>);

impl Lifecycle {
    pub(crate) fn on_headers(&self, hook: HeadersHook) {
        self.hooks().headers.push(hook);
    }

    pub(crate) fn on_finished(&self, hook: FinishedHook) {
        self.hooks().finished.push(hook);
    }

    fn take(&self) -> Hooks {
        std::mem::take(&mut *self.hooks())
    }

    fn hooks(&self) -> MutexGuard<'_, Hooks> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of hooks waiting to fire.
    #[cfg(test)]
    pub(crate) fn armed(&self) -> usize {
        let hooks = self.hooks();
        hooks.headers.len() + hooks.finished.len()
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use metron::Response;
/// use http::StatusCode;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
pub struct Response {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
}

impl Response {
    /// `200 OK` — `application/json`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK` — `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self::builder().status(code).no_body()
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: HeaderMap::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn headers_mut(&mut self) -> &mut HeaderMap { &mut self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Converts into the hyper response, firing the headers hooks armed on
    /// `lifecycle` and handing its finished hooks to the body.
    ///
    /// The caller must hand the result to the connection right away: the
    /// headers hooks treat this call as "headers are being sent".
    pub(crate) fn into_inner(self, lifecycle: &Lifecycle) -> http::Response<LifecycleBody> {
        let Response { status, mut headers, body } = self;

        if allows_body(status) && !headers.contains_key(CONTENT_LENGTH) {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
        }

        let hooks = lifecycle.take();
        for hook in hooks.headers {
            hook();
        }

        let finish = (!hooks.finished.is_empty()).then(|| Finish {
            head: ResponseHead { status, headers: headers.clone() },
            hooks: hooks.finished,
        });

        let mut res = http::Response::new(LifecycleBody { inner: Full::new(body), finish });
        *res.status_mut() = status;
        *res.headers_mut() = headers;
        res
    }
}

/// 1xx, 204 and 304 responses never carry a body, so they get no
/// `content-length` either.
fn allows_body(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

// ── ResponseHead ──────────────────────────────────────────────────────────────

/// Status line and headers of a response that has been sent.
#[derive(Clone, Debug)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: HeaderMap,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    /// Appends a header. A name or value that is not valid HTTP is dropped
    /// with a warning rather than failing the whole response.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => warn!(header = name, "dropping invalid response header"),
        }
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.finish("application/json", body.into())
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish("text/plain; charset=utf-8", Bytes::from(body.into()))
    }

    /// Terminate with no body (e.g. `204 No Content`).
    pub fn no_body(self) -> Response {
        self.build(Bytes::new())
    }

    fn finish(mut self, content_type: &'static str, body: Bytes) -> Response {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.build(body)
    }

    fn build(self, body: Bytes) -> Response {
        Response { status: self.status, headers: self.headers, body }
    }
}

// ── LifecycleBody ─────────────────────────────────────────────────────────────

struct Finish {
    head: ResponseHead,
    hooks: Vec<FinishedHook>,
}

/// Response body handed to hyper. Fires the finished hooks when hyper drops
/// it, which happens once the last frame is written or the connection dies.
pub(crate) struct LifecycleBody {
    inner: Full<Bytes>,
    finish: Option<Finish>,
}

impl Body for LifecycleBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
        Pin::new(&mut self.get_mut().inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for LifecycleBody {
    fn drop(&mut self) {
        if let Some(Finish { head, hooks }) = self.finish.take() {
            for hook in hooks {
                hook(&head);
            }
        }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a [`StatusCode`] directly from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn send(res: Response) -> http::Response<LifecycleBody> {
        res.into_inner(&Lifecycle::default())
    }

    #[test]
    fn content_length_is_filled_from_the_body() {
        let res = send(Response::text("hello"));
        assert_eq!(res.headers()[CONTENT_LENGTH], "5");
    }

    #[test]
    fn explicit_content_length_is_kept() {
        let res = send(Response::builder().header("Content-Length", "99").no_body());
        assert_eq!(res.headers()[CONTENT_LENGTH], "99");
    }

    #[test]
    fn no_content_gets_no_length() {
        let res = send(Response::status(StatusCode::NO_CONTENT));
        assert!(!res.headers().contains_key(CONTENT_LENGTH));
    }

    #[test]
    fn invalid_headers_are_dropped() {
        let res = Response::builder().header("bad header", "x").header("ok", "y").no_body();
        assert_eq!(res.headers().len(), 1);
        assert_eq!(res.headers()["ok"], "y");
    }

    #[test]
    fn hooks_fire_once_in_lifecycle_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let lifecycle = Lifecycle::default();

        let log = Arc::clone(&events);
        lifecycle.on_headers(Box::new(move || log.lock().unwrap().push("headers".to_owned())));
        let log = Arc::clone(&events);
        lifecycle.on_finished(Box::new(move |head: &ResponseHead| {
            log.lock().unwrap().push(format!("finished {}", head.status.as_u16()));
        }));
        assert_eq!(lifecycle.armed(), 2);

        let inner = Response::builder().status(StatusCode::CREATED).text("hi").into_inner(&lifecycle);
        assert_eq!(*events.lock().unwrap(), ["headers"]);
        assert_eq!(lifecycle.armed(), 0);

        drop(inner);
        assert_eq!(*events.lock().unwrap(), ["headers", "finished 201"]);
    }

    #[test]
    fn finished_hook_sees_the_sent_headers() {
        let seen = Arc::new(Mutex::new(None));
        let lifecycle = Lifecycle::default();
        let slot = Arc::clone(&seen);
        lifecycle.on_finished(Box::new(move |head: &ResponseHead| {
            *slot.lock().unwrap() = head.headers.get(CONTENT_LENGTH).cloned();
        }));

        drop(Response::json(br#"{"a":1}"#.to_vec()).into_inner(&lifecycle));
        assert_eq!(seen.lock().unwrap().as_ref().unwrap(), "7");
    }

    #[test]
    fn hooks_follow_the_exchange_not_the_response() {
        let seen = Arc::new(Mutex::new(None));
        let lifecycle = Lifecycle::default();
        let slot = Arc::clone(&seen);
        lifecycle.on_finished(Box::new(move |head: &ResponseHead| {
            *slot.lock().unwrap() = Some(head.status);
        }));

        drop(Response::text("from the handler"));
        let replacement = Response::status(StatusCode::SERVICE_UNAVAILABLE);
        drop(replacement.into_inner(&lifecycle));

        assert_eq!(*seen.lock().unwrap(), Some(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn body_streams_the_payload() {
        let body = send(Response::text("payload")).into_body();
        let bytes = http_body_util::BodyExt::collect(body).await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"payload");
    }
}
