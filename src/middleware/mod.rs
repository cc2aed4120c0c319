//! Middleware layer.
//!
//! Middleware intercepts a request before the handler sees it and the
//! response after the handler produced it. It is the place for cross-cutting
//! concerns such as access logging or client-IP resolution.
//!
//! Each middleware receives the request and a [`Next`] continuation. Calling
//! [`Next::run`] passes control onward: to the next middleware, or to the
//! routed handler once the chain is exhausted. Middleware runs in the order
//! it was registered with [`Router::layer`](crate::Router::layer), so the
//! first one registered is the outermost.
//!
//! ```rust,no_run
//! use metron::middleware::{self, Next};
//! use metron::{Request, Router};
//!
//! let app = Router::new().layer(middleware::from_fn(|mut req: Request, next: Next| async move {
//!     if let Some(ip) = req.header("x-real-ip").and_then(|v| v.parse().ok()) {
//!         req.set_client_ip(ip);
//!     }
//!     next.run(req).await
//! }));
//! ```
//!
//! Built-in middleware:
//! - [`logger`] — renders one access-log line per exchange from a token template

use std::future::Future;
use std::sync::Arc;

use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::LifecycleBody;
use crate::router::Router;

pub mod logger;

pub use logger::Logger;

/// A request/response interceptor.
pub trait Middleware: Send + Sync + 'static {
    /// Handles one request. Must call `next.run(req)` to continue the
    /// pipeline, or return a response of its own to short-circuit it.
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

/// The continuation handed to every middleware.
pub struct Next {
    router: Arc<Router>,
    index: usize,
}

impl Next {
    /// Starts the pipeline of `router` from its outermost middleware.
    pub(crate) fn new(router: Arc<Router>) -> Self {
        Self { router, index: 0 }
    }

    /// Passes the request to the rest of the pipeline.
    pub fn run(self, req: Request) -> BoxFuture {
        match self.router.middleware(self.index) {
            Some(middleware) => {
                let next = Next { router: Arc::clone(&self.router), index: self.index + 1 };
                middleware.call(req, next)
            }
            None => self.router.route(req),
        }
    }
}

/// Runs `req` through the whole pipeline of `router` and converts whichever
/// response comes out for the connection, firing the hooks armed on the
/// exchange. Hooks survive any middleware that swaps the response.
pub(crate) async fn respond(router: Arc<Router>, req: Request) -> http::Response<LifecycleBody> {
    let lifecycle = req.lifecycle.clone();
    Next::new(router).run(req).await.into_inner(&lifecycle)
}

/// Adapts an async closure into a [`Middleware`].
pub fn from_fn<F, Fut>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = crate::Response> + Send + 'static,
{
    FromFn(f)
}

/// Middleware built by [`from_fn`].
pub struct FromFn<F>(F);

impl<F, Fut> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = crate::Response> + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        Box::pin((self.0)(req, next))
    }
}
