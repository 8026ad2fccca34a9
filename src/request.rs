//! # Request Descriptor
//!
//! The view of an intercepted request that handlers (and per-request
//! `include` functions) receive. The transport layer that intercepts real
//! HTTP calls is expected to have already matched the route and extracted
//! the path parameters; this type only carries the result.

use serde::Serialize;
use std::collections::HashMap;

/// An intercepted request, as seen by route handlers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Request {
    /// HTTP method, uppercase ("GET", "POST", ...).
    pub method: String,
    /// The requested url, as registered ("/users/:id" matched as "/users/1"
    /// arrives here as "/users/1").
    pub url: String,
    /// Route parameters extracted by the router (":id" -> "1").
    pub params: HashMap<String, String>,
    /// Decoded query string parameters.
    pub query_params: HashMap<String, String>,
    /// Raw request body, if any.
    pub body: Option<String>,
}

impl Request {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new("PUT", url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new("DELETE", url)
    }

    /// Adds a route parameter, chainable for test setup.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Adds a query string parameter, chainable for test setup.
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(name.into(), value.into());
        self
    }

    /// Sets the raw request body, chainable for test setup.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }
}
