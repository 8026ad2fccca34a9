//! # Serializer Registry
//!
//! Maps serializer names to their configurations and resolves which one
//! applies to a value. Built once at server construction, passed by
//! reference to everything that resolves serializers, and read-only from
//! then on — there is no ambient global registry.
//!
//! Resolution is deliberately asymmetric:
//!
//! - by **type name**, missing definitions fall back silently (type →
//!   `"application"` → built-in defaults), because an unconfigured type is
//!   normal;
//! - by **explicit name**, a miss is a hard [`ServerError::SerializerNotFound`]
//!   and never substitutes, because asking for a serializer that was never
//!   registered is a configuration bug.

use crate::error::ServerError;
use crate::serializer::{Serializer, SerializerConfig};
use std::collections::HashMap;
use std::sync::Arc;

/// The fallback key consulted when a type has no serializer of its own.
pub const APPLICATION_SERIALIZER: &str = "application";

/// Process-scoped mapping from serializer name to configuration.
pub struct SerializerRegistry {
    configs: HashMap<String, Arc<SerializerConfig>>,
    fallback: Arc<SerializerConfig>,
}

impl SerializerRegistry {
    /// An empty registry: every type resolves to the built-in defaults.
    pub fn new() -> Self {
        Self {
            configs: HashMap::new(),
            fallback: Arc::new(SerializerConfig::default()),
        }
    }

    /// Registers a configuration under a name — a type name ("author"), the
    /// `"application"` fallback, or a standalone name handlers can request
    /// explicitly ("sparse-user").
    pub fn register(&mut self, name: impl Into<String>, config: SerializerConfig) {
        self.configs.insert(name.into(), Arc::new(config));
    }

    /// Resolves the serializer for a value of the given type. Falls back to
    /// the `"application"` definition, then to built-in defaults; never
    /// fails.
    pub fn resolve(&self, type_name: Option<&str>) -> Serializer {
        let config = type_name
            .and_then(|name| self.configs.get(name))
            .or_else(|| self.configs.get(APPLICATION_SERIALIZER))
            .unwrap_or(&self.fallback);
        Serializer::from_config(Arc::clone(config))
    }

    /// Resolves a serializer by its exact registered name. A miss is an
    /// error, never a silent substitute.
    pub fn resolve_named(&self, name: &str) -> Result<Serializer, ServerError> {
        self.configs
            .get(name)
            .map(|config| Serializer::from_config(Arc::clone(config)))
            .ok_or_else(|| ServerError::SerializerNotFound(name.to_string()))
    }
}

impl Default for SerializerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializerRegistry")
            .field("names", &self.configs.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Request;
    use crate::schema::{ResourceDef, Schema};
    use serde_json::json;

    #[test]
    fn type_resolution_falls_back_to_application_then_defaults() {
        let schema = Schema::new();
        schema.register(ResourceDef::new("post"));
        let post = schema
            .resource("posts")
            .unwrap()
            .create(json!({ "title": "Lorem" }))
            .unwrap();
        let request = Request::get("/posts/1");

        // Built-in defaults: root wrapping on.
        let bare = SerializerRegistry::new();
        assert_eq!(
            bare.resolve(Some("post"))
                .serialize(&post.clone().into(), &bare, &request),
            json!({ "post": { "id": "1", "title": "Lorem" } })
        );

        // An application definition overrides the defaults for every type.
        let mut with_application = SerializerRegistry::new();
        with_application.register(APPLICATION_SERIALIZER, SerializerConfig::new().root(false));
        assert_eq!(
            with_application
                .resolve(Some("post"))
                .serialize(&post.into(), &with_application, &request),
            json!({ "id": "1", "title": "Lorem" })
        );
    }

    #[test]
    fn named_resolution_never_falls_back() {
        let registry = SerializerRegistry::new();

        let err = registry.resolve_named("sparse-user").unwrap_err();

        assert!(err.to_string().contains("serializer doesn't exist"));
        assert!(err.to_string().contains("sparse-user"));
    }
}
