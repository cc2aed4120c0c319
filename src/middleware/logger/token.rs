//! The token vocabulary and how each token resolves.
//!
//! | Token | Value |
//! |---|---|
//! | `:url` | path and query as received |
//! | `:method` | request method |
//! | `:status` | response status code |
//! | `:response-time` | ms from arrival until the response head was sent |
//! | `:total-time` | ms from arrival until the line is rendered |
//! | `:http-version` | `1.1`, `2.0`, … |
//! | `:referrer` | `referer` header, or `referrer` |
//! | `:remote-addr` | client IP set by the pipeline, else the peer IP |
//! | `:user-agent` | `user-agent` header |
//! | `:req[key]` | request header `key`, else the request property `key` |
//! | `:res[key]` | response header `key` |
//!
//! Repeated headers are joined with `,`. Resolution never fails: anything
//! that cannot be resolved is `None` and is rendered as an empty string.

use http::{HeaderMap, Version};

use super::exchange::{Exchange, RequestHead};
use super::timing::format_millis;

/// A resolvable token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Url,
    Method,
    Status,
    ResponseTime,
    TotalTime,
    HttpVersion,
    Referrer,
    RemoteAddr,
    UserAgent,
    /// Request header or property; the key is lowercase.
    Req(String),
    /// Response header; the key is lowercase.
    Res(String),
}

impl Token {
    /// Looks up a token by name (without the leading `:`). The sub-key is
    /// required by `req`/`res` and ignored by every other token.
    pub fn parse(name: &str, key: Option<&str>) -> Option<Self> {
        let token = match name {
            "url"           => Self::Url,
            "method"        => Self::Method,
            "status"        => Self::Status,
            "response-time" => Self::ResponseTime,
            "total-time"    => Self::TotalTime,
            "http-version"  => Self::HttpVersion,
            "referrer"      => Self::Referrer,
            "remote-addr"   => Self::RemoteAddr,
            "user-agent"    => Self::UserAgent,
            "req"           => Self::Req(key?.to_ascii_lowercase()),
            "res"           => Self::Res(key?.to_ascii_lowercase()),
            _               => return None,
        };
        Some(token)
    }

    pub fn resolve(&self, exchange: &Exchange<'_>) -> Option<String> {
        let req = exchange.request;
        match self {
            Self::Url => Some(original_url(req)),
            Self::Method => Some(req.method.to_string()),
            Self::Status => exchange.response.map(|res| res.status.as_u16().to_string()),
            Self::ResponseTime => exchange.timing.response_time().map(format_millis),
            Self::TotalTime => Some(format_millis(exchange.timing.total_time(exchange.now))),
            Self::HttpVersion => http_version(req.version).map(str::to_owned),
            Self::Referrer => header(&req.headers, "referer")
                .or_else(|| header(&req.headers, "referrer")),
            Self::RemoteAddr => req.client_ip
                .or_else(|| req.remote_addr.map(|addr| addr.ip()))
                .map(|ip| ip.to_string()),
            Self::UserAgent => header(&req.headers, "user-agent"),
            Self::Req(key) => header(&req.headers, key).or_else(|| property(req, key)),
            Self::Res(key) => exchange.response.and_then(|res| header(&res.headers, key)),
        }
    }
}

/// All values of header `name`, comma-joined.
fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    let values: Vec<_> = headers.get_all(name).iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()))
        .collect();
    (!values.is_empty()).then(|| values.join(","))
}

/// Request properties reachable through `:req[key]` when no header matches.
fn property(req: &RequestHead, key: &str) -> Option<String> {
    match key {
        "method" => Some(req.method.to_string()),
        "url" | "originalurl" => Some(original_url(req)),
        "path" => Some(req.uri.path().to_owned()),
        "query" => req.uri.query().map(str::to_owned),
        "version" | "httpversion" => http_version(req.version).map(str::to_owned),
        "ip" => req.client_ip.map(|ip| ip.to_string()),
        "body" => Some(String::from_utf8_lossy(&req.body).into_owned()),
        _ => None,
    }
}

fn original_url(req: &RequestHead) -> String {
    req.uri.path_and_query()
        .map_or_else(|| req.uri.path().to_owned(), |pq| pq.as_str().to_owned())
}

fn http_version(version: Version) -> Option<&'static str> {
    match version {
        Version::HTTP_09 => Some("0.9"),
        Version::HTTP_10 => Some("1.0"),
        Version::HTTP_11 => Some("1.1"),
        Version::HTTP_2  => Some("2.0"),
        Version::HTTP_3  => Some("3.0"),
        _                => None,
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use http::{HeaderValue, StatusCode};

    use super::*;
    use crate::middleware::logger::timing::TimingMarks;
    use crate::request::test_request;
    use crate::response::ResponseHead;

    fn head(uri: &str, headers: &[(&str, &str)]) -> RequestHead {
        RequestHead::capture(&test_request("GET", uri, headers))
    }

    fn resolve(token: &Token, req: &RequestHead, res: Option<&ResponseHead>) -> Option<String> {
        let start = Instant::now();
        let timing = TimingMarks::from_instants(start, Some(start + Duration::from_micros(1_500)));
        token.resolve(&Exchange { request: req, response: res, timing: &timing, now: start })
    }

    fn response(headers: &[(&'static str, &'static str)]) -> ResponseHead {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(*name, HeaderValue::from_static(*value));
        }
        ResponseHead { status: StatusCode::CREATED, headers: map }
    }

    #[test]
    fn unknown_names_have_no_token() {
        assert_eq!(Token::parse("bogus", None), None);
        assert_eq!(Token::parse("req", None), None);
        assert_eq!(Token::parse("method", Some("ignored")), Some(Token::Method));
        assert_eq!(Token::parse("res", Some("Content-Type")), Some(Token::Res("content-type".into())));
    }

    #[test]
    fn request_line_tokens() {
        let req = head("/users/7?full=1", &[]);
        assert_eq!(resolve(&Token::Url, &req, None).as_deref(), Some("/users/7?full=1"));
        assert_eq!(resolve(&Token::Method, &req, None).as_deref(), Some("GET"));
        assert_eq!(resolve(&Token::HttpVersion, &req, None).as_deref(), Some("1.1"));
    }

    #[test]
    fn status_needs_a_response() {
        let req = head("/", &[]);
        assert_eq!(resolve(&Token::Status, &req, None), None);
        assert_eq!(resolve(&Token::Status, &req, Some(&response(&[]))).as_deref(), Some("201"));
    }

    #[test]
    fn timing_tokens() {
        let req = head("/", &[]);
        assert_eq!(resolve(&Token::ResponseTime, &req, None).as_deref(), Some("1.500"));
        assert_eq!(resolve(&Token::TotalTime, &req, None).as_deref(), Some("0.000"));
    }

    #[test]
    fn referrer_accepts_both_spellings() {
        let req = head("/", &[("Referrer", "https://b.example")]);
        assert_eq!(resolve(&Token::Referrer, &req, None).as_deref(), Some("https://b.example"));

        let req = head("/", &[("Referer", "https://a.example"), ("Referrer", "https://b.example")]);
        assert_eq!(resolve(&Token::Referrer, &req, None).as_deref(), Some("https://a.example"));
    }

    #[test]
    fn remote_addr_prefers_the_pipeline_ip() {
        let mut req = head("/", &[]);
        assert_eq!(resolve(&Token::RemoteAddr, &req, None).as_deref(), Some("127.0.0.1"));

        req.client_ip = Some([203, 0, 113, 5].into());
        assert_eq!(resolve(&Token::RemoteAddr, &req, None).as_deref(), Some("203.0.113.5"));

        req.client_ip = None;
        req.remote_addr = None;
        assert_eq!(resolve(&Token::RemoteAddr, &req, None), None);
    }

    #[test]
    fn sub_keys_resolve_the_same_regardless_of_case() {
        let req = head("/", &[("X-Trace-ID", "t-1")]);
        let lower = Token::parse("req", Some("x-trace-id")).unwrap();
        let mixed = Token::parse("req", Some("X-TRACE-id")).unwrap();
        assert_eq!(resolve(&lower, &req, None).as_deref(), Some("t-1"));
        assert_eq!(resolve(&mixed, &req, None).as_deref(), Some("t-1"));
    }

    #[test]
    fn req_falls_back_to_request_properties() {
        let mut req = head("/search?q=rust", &[]);
        req.body = bytes::Bytes::from_static(b"{\"a\":1}");
        let token = |key: &str| Token::parse("req", Some(key)).unwrap();

        assert_eq!(resolve(&token("query"), &req, None).as_deref(), Some("q=rust"));
        assert_eq!(resolve(&token("path"), &req, None).as_deref(), Some("/search"));
        assert_eq!(resolve(&token("body"), &req, None).as_deref(), Some("{\"a\":1}"));
        assert_eq!(resolve(&token("nothing"), &req, None), None);
    }

    #[test]
    fn req_headers_win_over_properties() {
        let req = head("/", &[("path", "from-header")]);
        let token = Token::parse("req", Some("path")).unwrap();
        assert_eq!(resolve(&token, &req, None).as_deref(), Some("from-header"));
    }

    #[test]
    fn repeated_headers_are_comma_joined() {
        let res = response(&[("set-cookie", "a=1"), ("set-cookie", "b=2")]);
        let token = Token::parse("res", Some("Set-Cookie")).unwrap();
        assert_eq!(resolve(&token, &head("/", &[]), Some(&res)).as_deref(), Some("a=1,b=2"));
    }

    #[test]
    fn missing_response_header_is_none() {
        let token = Token::parse("res", Some("content-length")).unwrap();
        assert_eq!(resolve(&token, &head("/", &[]), Some(&response(&[]))), None);
        assert_eq!(resolve(&token, &head("/", &[]), None), None);
    }
}
