//! Minimal metron example — JSON endpoints behind the access logger.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl http://localhost:3000/favicon.ico      # not logged
//!
//! Each request prints one access-log line on stdout, and the resolved
//! fields are traced by the callback.

use http::{Method, StatusCode};
use metron::middleware::Logger;
use metron::{Request, Response, Router, Server};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let logger = Logger::builder()
        .format(":remote-addr :method :url HTTP/:http-version :status :res[content-length] - :response-time ms (:total-time ms total)")
        .callback(|fields| tracing::debug!(?fields, "access log fields"))
        .build();

    let app = Router::new()
        .layer(logger)
        .on(Method::GET,  "/users/{id}", get_user)
        .on(Method::POST, "/users",      create_user);

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

// POST /users → 201 with the body echoed back
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }

    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(req.body().to_vec())
}
