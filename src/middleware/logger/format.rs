//! Format templates: parsing once, rendering per exchange.
//!
//! A format string is cut into whitespace-separated words. A word that is
//! exactly `:<name>` or `:<name>[<key>]`, where `<name>` is two or more
//! ASCII word characters or hyphens naming a known [`Token`], becomes a
//! token segment. Everything else, whitespace included, is literal text and
//! is copied to the output untouched. Parsing never fails.
//!
//! Rendering walks the segments in order and substitutes each token in
//! place, so the same token may appear any number of times.

use std::collections::BTreeMap;

use super::exchange::Exchange;
use super::token::Token;

/// Resolved values of one exchange, keyed by the token segment exactly as
/// written in the format (`":res[Content-Length]"`, `":method"`).
pub type Fields = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Token { text: String, token: Token },
}

/// A parsed format string.
#[derive(Clone, Debug)]
pub struct Template {
    segments: Vec<Segment>,
}

/// The output of one render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rendered {
    /// The formatted line, without a trailing newline.
    pub line: String,
    pub fields: Fields,
}

impl Template {
    pub fn parse(format: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();

        for word in words(format) {
            match parse_token(word) {
                Some(token) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Token { text: word.to_owned(), token });
                }
                None => literal.push_str(word),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    /// The token segments, in template order, as written.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Token { text, .. } => Some(text.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn render(&self, exchange: &Exchange<'_>) -> Rendered {
        let mut line = String::new();
        let mut fields = Fields::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => line.push_str(text),
                Segment::Token { text, token } => {
                    let value = token.resolve(exchange).unwrap_or_default();
                    line.push_str(&value);
                    fields.insert(text.clone(), value);
                }
            }
        }

        Rendered { line, fields }
    }
}

/// Splits into alternating runs of whitespace and non-whitespace, keeping
/// both so the template can be reassembled byte for byte.
fn words(format: &str) -> impl Iterator<Item = &str> {
    let mut rest = format;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let blank = first.is_whitespace();
        let end = rest
            .find(|c: char| c.is_whitespace() != blank)
            .unwrap_or(rest.len());
        let (word, tail) = rest.split_at(end);
        rest = tail;
        Some(word)
    })
}

fn parse_token(word: &str) -> Option<Token> {
    let body = word.strip_prefix(':')?;
    let (name, key) = match body.split_once('[') {
        Some((name, tail)) => {
            let key = tail.strip_suffix(']')?;
            if key.is_empty() || key.contains(['[', ']']) {
                return None;
            }
            (name, Some(key))
        }
        None => (body, None),
    };

    let valid_name = name.len() >= 2
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if !valid_name {
        return None;
    }
    Token::parse(name, key)
}
