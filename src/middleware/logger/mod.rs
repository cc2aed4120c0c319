//! Access-log middleware.
//!
//! [`Logger`] times every exchange and, once it is over, renders one line
//! from a token [`Template`] and writes it to a [`Sink`]:
//!
//! ```text
//! GET /users/42 200 27 - 0.412 ms
//! ```
//!
//! The start mark is taken when the request reaches the logger. The
//! response-time mark is taken when the response head is handed to the
//! connection. The line is rendered when the connection releases the
//! response, so `:total-time` covers the whole exchange. If the exchange is
//! dropped before any response exists (client gone mid-handler), the line
//! is still rendered exactly once, with the response fields empty.
//!
//! The hooks are armed on the request, so the line describes the response
//! that was actually sent, even when an outer middleware replaced the
//! handler's. A line is only written if the host fires the exchange's
//! finished hooks; the bundled [`Server`](crate::Server) always does.
//!
//! ```rust,no_run
//! use std::io;
//! use metron::middleware::Logger;
//! use metron::Router;
//!
//! let logger = Logger::builder()
//!     .format(":remote-addr :method :url :status :response-time ms :req[x-request-id]")
//!     .skip("/healthz")
//!     .output(io::stderr())
//!     .callback(|fields| {
//!         if fields[":status"].starts_with('5') {
//!             // alerting, sampling, …
//!         }
//!     })
//!     .build();
//!
//! let app = Router::new().layer(logger);
//! ```

mod exchange;
mod format;
mod sink;
mod timing;
mod token;

use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

pub use exchange::{Exchange, RequestHead};
pub use format::{Fields, Rendered, Template};
pub use sink::Sink;
pub use timing::{TimingMarks, format_millis};
pub use token::Token;

use super::{Middleware, Next};
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::ResponseHead;

/// Format used when none is configured.
pub const DEFAULT_FORMAT: &str = ":method :url :status :res[content-length] - :response-time ms";

/// Paths skipped when no blacklist is configured.
pub const DEFAULT_BLACKLIST: &[&str] = &["/favicon.ico"];

/// Receives the resolved fields of every logged exchange.
pub type Callback = Arc<dyn Fn(&Fields) + Send + Sync>;

/// Access-log middleware. Cheap to clone; clones share configuration.
#[derive(Clone)]
pub struct Logger {
    config: Arc<Config>,
}

struct Config {
    template: Template,
    blacklist: HashSet<String>,
    output: Box<dyn Sink>,
    callback: Option<Callback>,
}

impl Logger {
    /// Default format and blacklist, written to stdout.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> LoggerBuilder {
        LoggerBuilder {
            format: DEFAULT_FORMAT.to_owned(),
            blacklist: DEFAULT_BLACKLIST.iter().map(|p| (*p).to_owned()).collect(),
            output: Box::new(io::stdout()),
            callback: None,
        }
    }

    pub fn template(&self) -> &Template {
        &self.config.template
    }

    /// Whether requests for `path` bypass the logger. Matching is exact and
    /// ignores the query string.
    pub fn skips(&self, path: &str) -> bool {
        self.config.blacklist.contains(path)
    }
}

impl Default for Logger {
    fn default() -> Self { Self::new() }
}

impl Middleware for Logger {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        // Skipped requests still continue down the pipeline.
        if self.skips(req.path()) {
            debug!(path = req.path(), "access log skipped");
            return next.run(req);
        }

        let timing = Arc::new(TimingMarks::start());
        let pending = Pending(Some(Exchanged {
            config: Arc::clone(&self.config),
            request: RequestHead::capture(&req),
            timing: Arc::clone(&timing),
        }));

        // If the exchange ends before a response is sent, the hooks are
        // dropped unrun and `pending` renders the line without a response.
        req.on_headers(move || timing.mark_headers_sent());
        req.on_finished(move |head| pending.finish(Some(head)));

        next.run(req)
    }
}

// ── Render routine ────────────────────────────────────────────────────────────

struct Exchanged {
    config: Arc<Config>,
    request: RequestHead,
    timing: Arc<TimingMarks>,
}

impl Exchanged {
    fn emit(self, response: Option<&ResponseHead>) {
        self.config.emit(&Exchange {
            request: &self.request,
            response,
            timing: &self.timing,
            now: Instant::now(),
        });
    }
}

/// An exchange whose line has not been written yet. Writes it exactly once:
/// through [`finish`](Pending::finish), or on drop if that never happens.
struct Pending(Option<Exchanged>);

impl Pending {
    fn finish(mut self, response: Option<&ResponseHead>) {
        if let Some(ex) = self.0.take() {
            ex.emit(response);
        }
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        if let Some(ex) = self.0.take() {
            debug!(method = %ex.request.method, uri = %ex.request.uri, "exchange ended without a response");
            ex.emit(None);
        }
    }
}

impl Config {
    fn emit(&self, exchange: &Exchange<'_>) {
        let Rendered { mut line, fields } = self.template.render(exchange);

        if let Some(callback) = &self.callback {
            callback(&fields);
        }

        line.push('\n');
        if let Err(e) = self.output.write_line(&line) {
            warn!(error = %e, "failed to write access log line");
        }
    }
}

// ── LoggerBuilder ─────────────────────────────────────────────────────────────

/// Fluent builder for [`Logger`]. Obtain via [`Logger::builder()`].
pub struct LoggerBuilder {
    format: String,
    blacklist: HashSet<String>,
    output: Box<dyn Sink>,
    callback: Option<Callback>,
}

impl LoggerBuilder {
    /// Sets the line format. See [`Token`] for the vocabulary; words that
    /// are not tokens are copied verbatim.
    pub fn format(mut self, format: &str) -> Self {
        self.format = format.to_owned();
        self
    }

    /// Replaces the set of skipped paths, defaults included.
    pub fn blacklist<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Adds one skipped path.
    pub fn skip(mut self, path: impl Into<String>) -> Self {
        self.blacklist.insert(path.into());
        self
    }

    pub fn output(mut self, sink: impl Sink) -> Self {
        self.output = Box::new(sink);
        self
    }

    /// Called with the resolved fields before each line is written.
    pub fn callback(mut self, callback: impl Fn(&Fields) + Send + Sync + 'static) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> Logger {
        Logger {
            config: Arc::new(Config {
                template: Template::parse(&self.format),
                blacklist: self.blacklist,
                output: self.output,
                callback: self.callback,
            }),
        }
    }
}
