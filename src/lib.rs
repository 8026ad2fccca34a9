//! # Mirage
//!
//! An in-process mock API server core. It intercepts nothing by itself;
//! given a registered route handler, a request view, and a handle to an
//! in-memory relational store, it executes the handler and converts whatever
//! comes back into a well-formed `(status, headers, body)` response —
//! shaping serializable content through a configurable, per-type
//! serialization layer. A client application can be developed and tested
//! against it without a real backend.
//!
//! ## Architecture Overview
//!
//! The pipeline has four stages, resolved in order for every request:
//!
//! 1. **Route Handler Executor** ([`RouteHandlerExecutor`]) — dispatches the
//!    registered handler (function, static payload, or shorthand), applies
//!    optional artificial latency, and awaits asynchronous results.
//! 2. **Response Normalizer** — interprets the handler's polymorphic return
//!    shape ([`HandlerValue`]): explicit [`Response`] envelopes pass through
//!    untouched, models and collections are serialized, plain values pass
//!    through as-is, no value at all becomes a 204, and errors become
//!    deterministic error responses.
//! 3. **Serializer Registry** ([`SerializerRegistry`]) — resolves which
//!    serializer applies: the value's type, else `"application"`, else
//!    built-in defaults. Explicitly named serializers must exist.
//! 4. **Serializer** ([`Serializer`]) — projects the value honoring
//!    `attrs` / `root` / `embed` / `include`, embedding relationships
//!    recursively with cycle protection.
//!
//! The in-memory store ([`Schema`], [`Model`], [`Collection`]) plays the
//! part of the backing database: records live arena-style keyed by
//! `(type, id)`, with belongs-to / has-many associations between types.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use mirage::{
//!     HandlerResult, Request, ResourceDef, RouteHandler, RouteHandlerExecutor, Schema,
//!     SerializerRegistry,
//! };
//! use serde_json::json;
//!
//! async fn list_users(schema: Schema, _request: Request) -> HandlerResult {
//!     Ok(schema.resource("users")?.all().into())
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     // 1. Define the store
//!     let schema = Schema::new();
//!     schema.register(ResourceDef::new("user"));
//!     schema
//!         .resource("users")
//!         .unwrap()
//!         .create(json!({ "name": "Sam" }))
//!         .unwrap();
//!
//!     // 2. Build the pipeline
//!     let registry = Arc::new(SerializerRegistry::new());
//!     let executor = RouteHandlerExecutor::new(registry);
//!     let handler = RouteHandler::function(list_users);
//!
//!     // 3. Execute a request
//!     let response = executor
//!         .execute(&handler, &schema, &Request::get("/users"))
//!         .await;
//!
//!     assert_eq!(response.code(), 200);
//!     assert_eq!(
//!         response.body().as_json(),
//!         Some(&json!({ "users": [{ "id": "1", "name": "Sam" }] }))
//!     );
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! Everything runs on a cooperative schedule. Each request suspends exactly
//! once — while awaiting its handler's future — and many requests may be
//! interleaved there. The store is the only shared state; each of its
//! operations acquires and releases its lock synchronously, so no mutation
//! is ever half-applied across a suspension point. Responses settle in
//! whatever order the handlers do; there is no cross-request ordering
//! guarantee.
//!
//! ## Observability
//!
//! The crate emits structured `tracing` events throughout; call
//! [`logging::setup_tracing`] (or install your own subscriber) to see them,
//! and flip [`RouteHandlerExecutor::with_logging`] on for a line per handled
//! request.

pub mod collection;
pub mod error;
pub mod executor;
pub mod handler;
pub mod logging;
pub mod model;
pub mod registry;
pub mod request;
pub mod response;
pub mod schema;
pub mod serializer;

// Re-export core types for convenience
pub use collection::Collection;
pub use error::{HandlerError, HandlerResult, ServerError};
pub use executor::RouteHandlerExecutor;
pub use handler::{HandlerValue, RouteHandler, Shorthand};
pub use model::Model;
pub use registry::{SerializerRegistry, APPLICATION_SERIALIZER};
pub use request::Request;
pub use response::{Body, Response};
pub use schema::{Association, AssociationKind, ResourceDef, ResourceSet, Schema};
pub use serializer::{Serializable, Serializer, SerializerConfig};
