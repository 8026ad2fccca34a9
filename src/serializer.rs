//! # Serializer
//!
//! Transforms a model or collection into a plain JSON structure, honoring the
//! per-type configuration: attribute whitelisting (`attrs`), root-key
//! wrapping (`root`), relationship inclusion (`include`) and inline embedding
//! versus id references (`embed`).
//!
//! Anything that is not a model or collection passes through unchanged — the
//! serializer recognizes "not one of ours" and never wraps or mutates foreign
//! data.
//!
//! Embedding descends through the relationship graph, resolving each related
//! type's own serializer from the registry as it goes. The graph may be
//! cyclic; a per-call set of `(type, id)` pairs along the current descent
//! path detects re-entry, and the cyclic edge degrades to an id reference
//! instead of recursing.

use crate::collection::Collection;
use crate::model::Model;
use crate::registry::SerializerRegistry;
use crate::request::Request;
use crate::schema::{pluralize, FkValue};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

/// A per-request relationship inclusion rule.
///
/// A static include list is just a constant function, so both forms share
/// one code path.
pub type IncludeFn = Arc<dyn Fn(&Request) -> Vec<String> + Send + Sync>;

/// Per-model-type serializer configuration.
///
/// The defaults mirror what an unconfigured server does: every attribute,
/// root wrapping on, relationships referenced by id and only when included.
#[derive(Clone)]
pub struct SerializerConfig {
    attrs: Option<Vec<String>>,
    root: bool,
    embed: bool,
    include: Option<IncludeFn>,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            attrs: None,
            root: true,
            embed: false,
            include: None,
        }
    }
}

impl SerializerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts serialization to these attributes, in this order. `id` is
    /// always emitted first whether or not it is listed.
    pub fn attrs<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs = Some(attrs.into_iter().map(Into::into).collect());
        self
    }

    /// Whether to wrap the payload under the singular/plural type key.
    pub fn root(mut self, root: bool) -> Self {
        self.root = root;
        self
    }

    /// Whether included relationships are inlined or referenced by id.
    pub fn embed(mut self, embed: bool) -> Self {
        self.embed = embed;
        self
    }

    /// Always include these relationships.
    pub fn include<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        self.include_fn(move |_| names.clone())
    }

    /// Decide which relationships to include per request (evaluated on every
    /// serialization, never cached across requests).
    pub fn include_fn<F>(mut self, decide: F) -> Self
    where
        F: Fn(&Request) -> Vec<String> + Send + Sync + 'static,
    {
        self.include = Some(Arc::new(decide));
        self
    }
}

impl std::fmt::Debug for SerializerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializerConfig")
            .field("attrs", &self.attrs)
            .field("root", &self.root)
            .field("embed", &self.embed)
            .field("include", &self.include.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// A value the serialization pipeline accepts.
#[derive(Clone, Debug)]
pub enum Serializable {
    Model(Model),
    Collection(Collection),
    /// Foreign data: passed through unchanged.
    Json(Value),
}

impl Serializable {
    /// The type name serializer resolution goes by, when there is one.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Serializable::Model(model) => Some(model.type_name()),
            Serializable::Collection(collection) => Some(collection.type_name()),
            Serializable::Json(_) => None,
        }
    }
}

impl From<Model> for Serializable {
    fn from(model: Model) -> Self {
        Serializable::Model(model)
    }
}

impl From<Collection> for Serializable {
    fn from(collection: Collection) -> Self {
        Serializable::Collection(collection)
    }
}

impl From<Value> for Serializable {
    fn from(value: Value) -> Self {
        Serializable::Json(value)
    }
}

/// A serializer bound to one resolved configuration.
///
/// Construction is cheap (an `Arc` clone) and touches no shared state;
/// instances may be held onto and reused freely.
#[derive(Clone, Debug)]
pub struct Serializer {
    config: Arc<SerializerConfig>,
}

/// State carried through one top-level `serialize` call.
struct SerializeCx<'a> {
    registry: &'a SerializerRegistry,
    request: &'a Request,
    /// `(type, id)` pairs on the current descent path.
    visited: HashSet<(String, String)>,
}

impl Serializer {
    pub(crate) fn from_config(config: Arc<SerializerConfig>) -> Self {
        Self { config }
    }

    /// Serializes `value` into a plain JSON structure.
    ///
    /// Models and collections are projected per this serializer's
    /// configuration; plain JSON input is returned unchanged.
    pub fn serialize(
        &self,
        value: &Serializable,
        registry: &SerializerRegistry,
        request: &Request,
    ) -> Value {
        let mut cx = SerializeCx {
            registry,
            request,
            visited: HashSet::new(),
        };
        match value {
            Serializable::Json(json) => json.clone(),
            Serializable::Model(model) => {
                let projected = Value::Object(self.project_model(model, &mut cx));
                if self.config.root {
                    let mut wrapped = Map::new();
                    wrapped.insert(model.type_name().to_string(), projected);
                    Value::Object(wrapped)
                } else {
                    projected
                }
            }
            Serializable::Collection(collection) => {
                let members: Vec<Value> = collection
                    .models()
                    .iter()
                    .map(|model| Value::Object(self.project_model(model, &mut cx)))
                    .collect();
                if self.config.root {
                    let mut wrapped = Map::new();
                    wrapped.insert(pluralize(collection.type_name()), Value::Array(members));
                    Value::Object(wrapped)
                } else {
                    Value::Array(members)
                }
            }
        }
    }

    /// Projects one model into a JSON object, without the root wrapper.
    fn project_model(&self, model: &Model, cx: &mut SerializeCx<'_>) -> Map<String, Value> {
        let key = (model.type_name().to_string(), model.id().to_string());
        cx.visited.insert(key.clone());

        let mut out = Map::new();
        out.insert("id".to_string(), Value::String(model.id().to_string()));
        match &self.config.attrs {
            Some(names) => {
                for name in names {
                    if name == "id" {
                        continue;
                    }
                    if let Some(value) = model.attr(name) {
                        out.insert(name.clone(), value);
                    }
                }
            }
            None => {
                for (name, value) in model.attrs() {
                    out.insert(name, value);
                }
            }
        }

        let includes = match &self.config.include {
            Some(decide) => decide(cx.request),
            None => Vec::new(),
        };
        for name in includes {
            self.emit_relationship(model, &name, &mut out, cx);
        }

        cx.visited.remove(&key);
        out
    }

    fn emit_relationship(
        &self,
        model: &Model,
        name: &str,
        out: &mut Map<String, Value>,
        cx: &mut SerializeCx<'_>,
    ) {
        let Some(assoc) = model.association(name) else {
            warn!(
                kind = model.type_name(),
                relationship = name,
                "included relationship is not declared on the model type, skipping"
            );
            return;
        };
        let Some(fk) = model.fk(name) else {
            return;
        };

        if !self.config.embed {
            out.insert(assoc.fk_key(), fk_json(&fk));
            return;
        }

        match &fk {
            FkValue::One(None) => {
                out.insert(assoc.name.clone(), Value::Null);
            }
            FkValue::One(Some(id)) => {
                let visiting = (assoc.target.clone(), id.clone());
                if cx.visited.contains(&visiting) || !model.schema().record_exists(&assoc.target, id)
                {
                    out.insert(assoc.fk_key(), fk_json(&fk));
                } else {
                    let related = related_model(model, &assoc.target, id);
                    let child = cx.registry.resolve(Some(&assoc.target));
                    out.insert(
                        assoc.name.clone(),
                        Value::Object(child.project_model(&related, cx)),
                    );
                }
            }
            FkValue::Many(ids) => {
                let cyclic = ids
                    .iter()
                    .any(|id| cx.visited.contains(&(assoc.target.clone(), id.clone())));
                if cyclic {
                    out.insert(assoc.fk_key(), fk_json(&fk));
                    return;
                }
                let child = cx.registry.resolve(Some(&assoc.target));
                let members: Vec<Value> = ids
                    .iter()
                    .filter(|id| model.schema().record_exists(&assoc.target, id))
                    .map(|id| {
                        let related = related_model(model, &assoc.target, id);
                        Value::Object(child.project_model(&related, cx))
                    })
                    .collect();
                out.insert(assoc.name.clone(), Value::Array(members));
            }
        }
    }
}

fn related_model(model: &Model, target: &str, id: &str) -> Model {
    Model::new(model.schema().clone(), target, id)
}

fn fk_json(fk: &FkValue) -> Value {
    match fk {
        FkValue::One(Some(id)) => Value::String(id.clone()),
        FkValue::One(None) => Value::Null,
        FkValue::Many(ids) => Value::Array(ids.iter().cloned().map(Value::String).collect()),
    }
}
