//! # metron
//!
//! Access logging for HTTP services, measured where it matters: from the
//! moment a request reaches the logger to the moment its response head goes
//! out, rendered from a one-line token template.
//!
//! ```text
//! :method :url :status :res[content-length] - :response-time ms
//! GET /users/42 200 27 - 0.412 ms
//! ```
//!
//! metron ships the small hyper-based framework the logger plugs into:
//!
//! - Radix-tree routing — O(path-length) lookup via [`matchit`]
//! - Middleware chain — `Router::layer`, outermost first
//! - Exchange lifecycle hooks, armed on the request — headers sent, exchange finished
//! - Graceful shutdown — SIGTERM / Ctrl-C, drains in-flight requests
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::{Method, StatusCode};
//! use metron::middleware::Logger;
//! use metron::{Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .layer(Logger::new())
//!         .on(Method::GET,  "/users/{id}", get_user)
//!         .on(Method::POST, "/users",      create_user);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return Response::status(StatusCode::BAD_REQUEST);
//!     }
//!     Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .json(req.body().to_vec())
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use error::Error;
pub use handler::{BoxFuture, Handler};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder, ResponseHead};
pub use router::Router;
pub use server::Server;
