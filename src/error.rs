//! # Server Errors
//!
//! This module defines the common error types used throughout the mock server.
//! By centralizing error definitions, we ensure consistent error handling across
//! the store, the serializer layer, and the route handler executor.
//!
//! Handler code itself deals in boxed errors ([`HandlerError`]): anything a
//! handler returns via `?` (a [`ServerError`] from the store, a
//! `serde_json::Error`, a hand-rolled error) is boxed at that seam and later
//! formatted into the error response body by the executor.

use crate::handler::HandlerValue;

/// Errors that can occur within the mock server itself.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// An explicitly named serializer was requested but never registered.
    /// This is a configuration error and is never converted into an HTTP
    /// response.
    #[error("tried to use the serializer named '{0}', but that serializer doesn't exist")]
    SerializerNotFound(String),
    /// A resource type was addressed that was never registered with the schema.
    #[error("the resource type '{0}' has not been registered with the schema")]
    UnknownResourceType(String),
    /// A record lookup by id came up empty where a record was required.
    #[error("no record of type '{kind}' with the id '{id}'")]
    RecordNotFound { kind: String, id: String },
    /// A relationship was addressed by a name the model type does not declare.
    #[error("the model type '{kind}' has no association named '{name}'")]
    UnknownAssociation { kind: String, name: String },
    /// Attributes passed to a create or update were not a JSON object.
    #[error("expected a JSON object of attributes, got: {0}")]
    InvalidAttributes(String),
    /// The raw request body could not be parsed as JSON.
    #[error("the request body is not valid JSON: {0}")]
    InvalidRequestBody(#[from] serde_json::Error),
    /// A shorthand needed a route parameter the request does not carry.
    #[error("the route parameter '{0}' is missing from the request")]
    MissingRouteParam(String),
}

/// The error type produced by user handler code.
///
/// Boxed so handlers can bubble up whatever error type they like with `?`.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// What a route handler evaluates to: a legal return shape, or an error that
/// the executor reports as an error response.
pub type HandlerResult = Result<HandlerValue, HandlerError>;
