//! # Route Handlers
//!
//! What gets registered for a route: user logic, a canned payload, or a
//! shorthand. The three forms are a closed tagged variant fixed at
//! registration time, so the executor dispatches on the discriminant
//! without probing shapes on every call.
//!
//! A handler's return value is equally polymorphic — model, collection,
//! plain JSON, explicit response envelope, or nothing at all — and is
//! likewise a closed enum ([`HandlerValue`]) with `From` conversions for the
//! common cases, so handler bodies read as `Ok(something.into())`.

use crate::collection::Collection;
use crate::error::HandlerResult;
use crate::model::Model;
use crate::request::Request;
use crate::response::Response;
use crate::schema::Schema;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// The boxed future a function handler evaluates to.
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

type HandlerFn = Arc<dyn Fn(Schema, Request) -> HandlerFuture + Send + Sync>;

/// Every shape a route handler may legally return.
#[derive(Debug)]
pub enum HandlerValue {
    /// A single record; serialized, wire status 200.
    Model(Model),
    /// An ordered set of records; serialized, wire status 200.
    Collection(Collection),
    /// Plain data, already "serialized"; passed through, wire status 200.
    Json(Value),
    /// Full control over the response triple; passed through untouched.
    Response(Response),
    /// No content; wire status 204.
    Nothing,
}

impl From<Model> for HandlerValue {
    fn from(model: Model) -> Self {
        HandlerValue::Model(model)
    }
}

impl From<Collection> for HandlerValue {
    fn from(collection: Collection) -> Self {
        HandlerValue::Collection(collection)
    }
}

impl From<Value> for HandlerValue {
    fn from(value: Value) -> Self {
        HandlerValue::Json(value)
    }
}

impl From<Response> for HandlerValue {
    fn from(response: Response) -> Self {
        HandlerValue::Response(response)
    }
}

impl From<()> for HandlerValue {
    fn from(_: ()) -> Self {
        HandlerValue::Nothing
    }
}

/// `Some` serializes as the model, `None` becomes a JSON null body. Whether
/// a missing record should instead be a 404 is the handler's decision.
impl From<Option<Model>> for HandlerValue {
    fn from(model: Option<Model>) -> Self {
        match model {
            Some(model) => HandlerValue::Model(model),
            None => HandlerValue::Json(Value::Null),
        }
    }
}

/// Canned handlers for the common resource routes, addressed by the plural
/// type name the route serves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Shorthand {
    /// Respond with every record of the type.
    All(String),
    /// Respond with the record whose id is the `:id` route parameter; a
    /// missing record surfaces as a handler error.
    Find(String),
    /// Create a record from the JSON request body (unwrapping a
    /// singular-type root key when present) and respond 201 with it.
    Create(String),
}

/// A registered route handler.
#[derive(Clone)]
pub enum RouteHandler {
    /// User logic, invoked with the store handle and the request view.
    Function(HandlerFn),
    /// A canned payload, returned as-is on every call.
    Static(Value),
    Shorthand(Shorthand),
}

impl RouteHandler {
    /// Wraps an async function or closure as a route handler.
    ///
    /// ```
    /// use mirage::{HandlerResult, Request, RouteHandler, Schema};
    ///
    /// async fn list_users(schema: Schema, _request: Request) -> HandlerResult {
    ///     Ok(schema.resource("users")?.all().into())
    /// }
    ///
    /// let handler = RouteHandler::function(list_users);
    /// ```
    pub fn function<F, Fut>(handler: F) -> Self
    where
        F: Fn(Schema, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        RouteHandler::Function(Arc::new(move |schema, request| {
            Box::pin(handler(schema, request))
        }))
    }
}

impl std::fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteHandler::Function(_) => f.write_str("Function(..)"),
            RouteHandler::Static(value) => f.debug_tuple("Static").field(value).finish(),
            RouteHandler::Shorthand(shorthand) => {
                f.debug_tuple("Shorthand").field(shorthand).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conversions_pick_the_right_variant() {
        assert!(matches!(
            HandlerValue::from(json!({ "a": 1 })),
            HandlerValue::Json(_)
        ));
        assert!(matches!(HandlerValue::from(()), HandlerValue::Nothing));
        assert!(matches!(
            HandlerValue::from(Option::<Model>::None),
            HandlerValue::Json(Value::Null)
        ));
    }
}
