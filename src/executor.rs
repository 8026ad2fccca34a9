//! # Route Handler Executor
//!
//! Runs a registered [`RouteHandler`] against the schema and a request, then
//! normalizes whatever came back into the final response triple.
//!
//! Execution has exactly one suspension point per request: awaiting the
//! handler's future. Many requests may be in flight at once on the
//! cooperative scheduler; each carries its own state, nothing is shared
//! across them except the store. An optional artificial latency is applied
//! before dispatch — a scheduling delay, not a cancellable operation.
//!
//! Handler errors (synchronous returns and rejected futures alike) are never
//! dropped: they are formatted into a deterministic error body naming the
//! method, the url, and the original error text.
//!
//! The executor also exposes [`serialize`](RouteHandlerExecutor::serialize)
//! standalone, for callers that already hold a model or collection and want
//! its serialized form without a round trip. It applies the same registry
//! resolution as the in-request path, including the hard error for
//! explicitly named, unregistered serializers.

use crate::error::{HandlerResult, ServerError};
use crate::handler::{HandlerValue, RouteHandler, Shorthand};
use crate::registry::SerializerRegistry;
use crate::request::Request;
use crate::response::{Body, Response};
use crate::schema::Schema;
use crate::serializer::Serializable;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Executes route handlers and turns their results into responses.
#[derive(Clone, Debug)]
pub struct RouteHandlerExecutor {
    registry: Arc<SerializerRegistry>,
    timing: Option<Duration>,
    logging: bool,
}

impl RouteHandlerExecutor {
    pub fn new(registry: Arc<SerializerRegistry>) -> Self {
        Self {
            registry,
            timing: None,
            logging: false,
        }
    }

    /// Artificial latency applied before each dispatch, to mimic a real
    /// backend's response time.
    pub fn with_timing(mut self, delay: Duration) -> Self {
        self.timing = Some(delay);
        self
    }

    /// Emit a structured log line per handled request.
    pub fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    /// Runs `handler` for `request` and returns the final response.
    ///
    /// Never fails: handler errors become error responses.
    pub async fn execute(
        &self,
        handler: &RouteHandler,
        schema: &Schema,
        request: &Request,
    ) -> Response {
        if let Some(delay) = self.timing {
            tokio::time::sleep(delay).await;
        }

        let result = match handler {
            RouteHandler::Function(run) => run(schema.clone(), request.clone()).await,
            RouteHandler::Static(payload) => Ok(HandlerValue::Json(payload.clone())),
            RouteHandler::Shorthand(shorthand) => self.run_shorthand(shorthand, schema, request),
        };

        let response = self.normalize(result, request);
        if self.logging {
            info!(
                method = %request.method,
                url = %request.url,
                status = response.code(),
                "handled request"
            );
            debug!(body = ?response.body(), "response body");
        }
        response
    }

    /// Serializes a model, collection, or plain value directly, outside any
    /// HTTP round trip.
    ///
    /// With a `serializer_name`, resolution is by exact registered name and
    /// a miss is an error; without one, resolution goes by the value's type
    /// with the usual silent fallback.
    pub fn serialize(
        &self,
        value: impl Into<Serializable>,
        serializer_name: Option<&str>,
        request: &Request,
    ) -> Result<Value, ServerError> {
        let value = value.into();
        let serializer = match serializer_name {
            Some(name) => self.registry.resolve_named(name)?,
            None => self.registry.resolve(value.type_name()),
        };
        Ok(serializer.serialize(&value, &self.registry, request))
    }

    /// Interprets a handler result as a `(status, headers, body)` triple.
    fn normalize(&self, result: HandlerResult, request: &Request) -> Response {
        match result {
            Err(error) => {
                warn!(method = %request.method, url = %request.url, %error, "handler failed");
                let message = format!(
                    "Mirage: Your {} handler for the url {} threw an error: {}",
                    request.method, request.url, error
                );
                Response::new(500, HashMap::new(), Body::Text(message))
            }
            // An explicit envelope is final: status, headers and body pass
            // through, the body is never re-serialized.
            Ok(HandlerValue::Response(response)) => response,
            Ok(HandlerValue::Model(model)) => {
                let value = Serializable::Model(model);
                let serializer = self.registry.resolve(value.type_name());
                Response::json(200, serializer.serialize(&value, &self.registry, request))
            }
            Ok(HandlerValue::Collection(collection)) => {
                let value = Serializable::Collection(collection);
                let serializer = self.registry.resolve(value.type_name());
                Response::json(200, serializer.serialize(&value, &self.registry, request))
            }
            // A bare string is already a wire body; re-encoding it as JSON
            // would quote it.
            Ok(HandlerValue::Json(Value::String(text))) => {
                Response::new(200, HashMap::new(), Body::Text(text))
            }
            Ok(HandlerValue::Json(value)) => Response::json(200, value),
            Ok(HandlerValue::Nothing) => Response::empty(204),
        }
    }

    fn run_shorthand(
        &self,
        shorthand: &Shorthand,
        schema: &Schema,
        request: &Request,
    ) -> HandlerResult {
        match shorthand {
            Shorthand::All(plural) => Ok(schema.resource(plural)?.all().into()),
            Shorthand::Find(plural) => {
                let id = request
                    .param("id")
                    .ok_or_else(|| ServerError::MissingRouteParam("id".to_string()))?;
                let resource = schema.resource(plural)?;
                let model = resource.find(id).ok_or_else(|| ServerError::RecordNotFound {
                    kind: resource.type_name().to_string(),
                    id: id.to_string(),
                })?;
                Ok(model.into())
            }
            Shorthand::Create(plural) => {
                let resource = schema.resource(plural)?;
                let raw = request.body.as_deref().unwrap_or("{}");
                let payload: Value = serde_json::from_str(raw).map_err(ServerError::from)?;
                let attrs = unwrap_root(payload, resource.type_name());
                let model = resource.create(attrs)?;
                let body = self.serialize(model, None, request)?;
                Ok(Response::json(201, body).into())
            }
        }
    }
}

/// Strips a `{ "<singular>": { ... } }` root wrapper off a create payload;
/// an unwrapped object of attributes is accepted as-is.
fn unwrap_root(payload: Value, singular: &str) -> Value {
    if let Value::Object(map) = &payload {
        if map.len() == 1 {
            if let Some(inner) = map.get(singular) {
                if inner.is_object() {
                    return inner.clone();
                }
            }
        }
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ResourceDef;
    use serde_json::json;

    fn executor() -> RouteHandlerExecutor {
        RouteHandlerExecutor::new(Arc::new(SerializerRegistry::new()))
    }

    fn user_schema() -> Schema {
        let schema = Schema::new();
        schema.register(ResourceDef::new("user"));
        schema
    }

    #[test]
    fn no_return_normalizes_to_204_with_empty_body() {
        let response = executor().normalize(Ok(HandlerValue::Nothing), &Request::get("/users"));

        assert_eq!(response.code(), 204);
        assert!(response.body().is_empty());
    }

    #[test]
    fn string_results_become_literal_text_bodies() {
        let response = executor().normalize(
            Ok(HandlerValue::Json(json!("firstname,lastname"))),
            &Request::get("/users.csv"),
        );

        assert_eq!(response.code(), 200);
        assert_eq!(response.body().as_text(), Some("firstname,lastname"));
    }

    #[test]
    fn handler_errors_name_the_method_url_and_cause() {
        let response = executor().normalize(Err("I goofed".into()), &Request::get("/users"));

        assert_eq!(response.code(), 500);
        assert_eq!(
            response.body().as_text(),
            Some("Mirage: Your GET handler for the url /users threw an error: I goofed")
        );
    }

    #[test]
    fn explicit_envelopes_pass_through_untouched() {
        let envelope = Response::new(
            418,
            HashMap::from([("x-flavor".to_string(), "oolong".to_string())]),
            Body::Text("short and stout".to_string()),
        );

        let response = executor().normalize(
            Ok(HandlerValue::Response(envelope.clone())),
            &Request::get("/teapot"),
        );

        assert_eq!(response, envelope);
    }

    #[tokio::test]
    async fn all_shorthand_serializes_every_record() {
        let schema = user_schema();
        let users = schema.resource("users").unwrap();
        users.create(json!({ "name": "Sam" })).unwrap();
        users.create(json!({ "name": "Ganondorf" })).unwrap();
        let handler = RouteHandler::Shorthand(Shorthand::All("users".to_string()));

        let response = executor()
            .execute(&handler, &schema, &Request::get("/users"))
            .await;

        assert_eq!(response.code(), 200);
        assert_eq!(
            response.body().as_json(),
            Some(&json!({
                "users": [
                    { "id": "1", "name": "Sam" },
                    { "id": "2", "name": "Ganondorf" }
                ]
            }))
        );
    }

    #[tokio::test]
    async fn find_shorthand_reports_missing_records_as_handler_errors() {
        let schema = user_schema();
        let handler = RouteHandler::Shorthand(Shorthand::Find("users".to_string()));
        let request = Request::get("/users/9").with_param("id", "9");

        let response = executor().execute(&handler, &schema, &request).await;

        assert_eq!(response.code(), 500);
        assert_eq!(
            response.body().as_text(),
            Some(
                "Mirage: Your GET handler for the url /users/9 threw an error: \
                 no record of type 'user' with the id '9'"
            )
        );
    }

    #[tokio::test]
    async fn create_shorthand_unwraps_the_root_key_and_replies_201() {
        let schema = user_schema();
        let handler = RouteHandler::Shorthand(Shorthand::Create("users".to_string()));
        let request = Request::post("/users").with_body(r#"{ "user": { "name": "Sam" } }"#);

        let response = executor().execute(&handler, &schema, &request).await;

        assert_eq!(response.code(), 201);
        assert_eq!(
            response.body().as_json(),
            Some(&json!({ "user": { "id": "1", "name": "Sam" } }))
        );
        assert!(schema.resource("users").unwrap().find("1").is_some());
    }

    #[tokio::test]
    async fn static_payloads_are_returned_on_every_call() {
        let schema = user_schema();
        let handler = RouteHandler::Static(json!({ "ok": true }));
        let request = Request::get("/health");

        let first = executor().execute(&handler, &schema, &request).await;
        let second = executor().execute(&handler, &schema, &request).await;

        assert_eq!(first.body().as_json(), Some(&json!({ "ok": true })));
        assert_eq!(first.body(), second.body());
    }

    #[tokio::test]
    async fn timing_delays_dispatch() {
        let schema = user_schema();
        let handler = RouteHandler::Static(json!({}));
        let executor = executor().with_timing(Duration::from_millis(40));

        let started = tokio::time::Instant::now();
        executor
            .execute(&handler, &schema, &Request::get("/slow"))
            .await;

        assert!(started.elapsed() >= Duration::from_millis(40));
    }
}
