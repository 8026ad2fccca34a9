//! # Response Envelope
//!
//! An explicit response envelope, used when a handler wants full control over
//! the wire response. Once constructed it is immutable; the executor passes
//! it through untouched, body included.
//!
//! The body distinguishes literal text from structured JSON so that content a
//! handler already rendered (a CSV string, an empty string) is never
//! re-encoded on its way out.

use serde_json::Value;
use std::collections::HashMap;

/// A response body.
///
/// `Text("")` is a valid, distinct body: an empty string is preserved
/// exactly, never collapsed into `Empty`.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    /// Literal text, emitted as-is (never re-stringified or escaped).
    Text(String),
    /// Structured content, rendered as JSON by the transport.
    Json(Value),
}

impl Body {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

/// An explicit `(status, headers, body)` response triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    code: u16,
    headers: HashMap<String, String>,
    body: Body,
}

impl Response {
    pub fn new(code: u16, headers: HashMap<String, String>, body: Body) -> Self {
        Self {
            code,
            headers,
            body,
        }
    }

    /// A JSON response with the content type already set.
    pub fn json(code: u16, value: Value) -> Self {
        let headers = HashMap::from([("content-type".to_string(), "application/json".to_string())]);
        Self::new(code, headers, Body::Json(value))
    }

    /// A bodyless response.
    pub fn empty(code: u16) -> Self {
        Self::new(code, HashMap::new(), Body::Empty)
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn into_parts(self) -> (u16, HashMap<String, String>, Body) {
        (self.code, self.headers, self.body)
    }
}
