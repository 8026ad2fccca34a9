//! # In-Memory Schema
//!
//! The relational-style store handlers run against. The schema owns every
//! record, arena-style, keyed by `(type, id)`; [`Model`](crate::Model) and
//! [`Collection`](crate::Collection) are views into it, never owners.
//!
//! # Concurrency Note
//! `Schema` is a cheap-clone handle around an `Arc<Mutex<..>>`. Every store
//! operation takes the lock, mutates, and releases it before returning, so no
//! mutation is ever in progress across a handler's suspension point. That is
//! all the protection cooperative scheduling needs; there are no locks held
//! across `.await`.
//!
//! Ids are strings, assigned from a per-type counter starting at 1. Records
//! keep their attributes (insertion-ordered) apart from their foreign keys,
//! so relationship state never leaks into attribute projection.

use crate::collection::Collection;
use crate::error::ServerError;
use crate::model::Model;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// How a declared relationship references the other side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssociationKind {
    /// Single owned reference to another record, held as one foreign id.
    BelongsTo,
    /// Ordered set of references, held as a list of foreign ids.
    HasMany,
}

/// A declared relationship on a model type.
#[derive(Clone, Debug)]
pub struct Association {
    /// The name handlers and serializers address it by ("author", "posts").
    pub name: String,
    pub kind: AssociationKind,
    /// Singular type name of the other side.
    pub target: String,
}

impl Association {
    /// The attribute key this relationship's ids are exposed under when the
    /// serializer references instead of embeds ("author" -> "author_id",
    /// "posts" -> "post_ids").
    pub(crate) fn fk_key(&self) -> String {
        match self.kind {
            AssociationKind::BelongsTo => format!("{}_id", self.name),
            AssociationKind::HasMany => format!("{}_ids", singularize(&self.name)),
        }
    }
}

/// Foreign-key state of one relationship on one record.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum FkValue {
    One(Option<String>),
    Many(Vec<String>),
}

/// Declaration of a model type: its singular name plus its relationships.
#[derive(Clone, Debug)]
pub struct ResourceDef {
    name: String,
    associations: Vec<Association>,
}

impl ResourceDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            associations: Vec::new(),
        }
    }

    /// Declares a belongs-to relationship; the target type is the
    /// association name itself ("author" points at the "author" type).
    pub fn belongs_to(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let target = name.clone();
        self.associations.push(Association {
            name,
            kind: AssociationKind::BelongsTo,
            target,
        });
        self
    }

    /// Declares a has-many relationship; the target type is the singular of
    /// the association name ("posts" points at the "post" type).
    pub fn has_many(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let target = singularize(&name);
        self.associations.push(Association {
            name,
            kind: AssociationKind::HasMany,
            target,
        });
        self
    }
}

struct Record {
    id: String,
    attrs: Map<String, Value>,
    fks: HashMap<String, FkValue>,
}

struct ResourceType {
    associations: Vec<Association>,
    next_id: u64,
    records: Vec<Record>,
}

#[derive(Default)]
struct SchemaInner {
    types: HashMap<String, ResourceType>,
}

/// Handle to the in-memory store. Cloning shares the same data.
#[derive(Clone, Default)]
pub struct Schema {
    inner: Arc<Mutex<SchemaInner>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a model type. Registering the same name twice replaces the
    /// earlier definition and drops its records.
    pub fn register(&self, def: ResourceDef) {
        let mut inner = self.lock();
        debug!(kind = %def.name, "registered resource type");
        inner.types.insert(
            def.name,
            ResourceType {
                associations: def.associations,
                next_id: 1,
                records: Vec::new(),
            },
        );
    }

    /// Per-type access, addressed by the plural name the routes use
    /// (`schema.resource("users")`).
    pub fn resource(&self, plural: &str) -> Result<ResourceSet, ServerError> {
        let singular = singularize(plural);
        let inner = self.lock();
        if inner.types.contains_key(&singular) {
            Ok(ResourceSet {
                schema: self.clone(),
                type_name: singular,
            })
        } else {
            Err(ServerError::UnknownResourceType(plural.to_string()))
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchemaInner> {
        self.inner.lock().expect("schema store lock poisoned")
    }

    pub(crate) fn create_record(&self, kind: &str, attrs: Value) -> Result<Model, ServerError> {
        let incoming = into_attr_map(attrs)?;
        let mut inner = self.lock();
        let ty = inner
            .types
            .get_mut(kind)
            .ok_or_else(|| ServerError::UnknownResourceType(kind.to_string()))?;

        let id = match incoming.get("id").and_then(value_as_id) {
            Some(explicit) => {
                if let Ok(numeric) = explicit.parse::<u64>() {
                    ty.next_id = ty.next_id.max(numeric + 1);
                }
                explicit
            }
            None => {
                let id = ty.next_id.to_string();
                ty.next_id += 1;
                id
            }
        };

        let mut fks: HashMap<String, FkValue> = ty
            .associations
            .iter()
            .map(|assoc| {
                let empty = match assoc.kind {
                    AssociationKind::BelongsTo => FkValue::One(None),
                    AssociationKind::HasMany => FkValue::Many(Vec::new()),
                };
                (assoc.name.clone(), empty)
            })
            .collect();

        let mut stored = Map::new();
        for (key, value) in incoming {
            if key == "id" {
                continue;
            }
            match ty.associations.iter().find(|assoc| assoc.fk_key() == key) {
                Some(assoc) => {
                    fks.insert(assoc.name.clone(), parse_fk(assoc.kind, &value));
                }
                None => {
                    stored.insert(key, value);
                }
            }
        }

        debug!(kind, %id, total = ty.records.len() + 1, "created record");
        ty.records.push(Record {
            id: id.clone(),
            attrs: stored,
            fks,
        });
        Ok(Model::new(self.clone(), kind, id))
    }

    pub(crate) fn update_record(
        &self,
        kind: &str,
        id: &str,
        attrs: Value,
    ) -> Result<(), ServerError> {
        let incoming = into_attr_map(attrs)?;
        let mut inner = self.lock();
        let ty = inner
            .types
            .get_mut(kind)
            .ok_or_else(|| ServerError::UnknownResourceType(kind.to_string()))?;
        let associations = ty.associations.clone();
        let record = ty
            .records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| ServerError::RecordNotFound {
                kind: kind.to_string(),
                id: id.to_string(),
            })?;

        for (key, value) in incoming {
            if key == "id" {
                continue;
            }
            match associations.iter().find(|assoc| assoc.fk_key() == key) {
                Some(assoc) => {
                    record.fks.insert(assoc.name.clone(), parse_fk(assoc.kind, &value));
                }
                None => {
                    record.attrs.insert(key, value);
                }
            }
        }
        debug!(kind, %id, "updated record");
        Ok(())
    }

    /// Removes a record and scrubs every foreign key that pointed at it, so
    /// deletion is always explicit and complete.
    pub(crate) fn destroy_record(&self, kind: &str, id: &str) -> Result<(), ServerError> {
        let mut inner = self.lock();
        {
            let ty = inner
                .types
                .get_mut(kind)
                .ok_or_else(|| ServerError::UnknownResourceType(kind.to_string()))?;
            let position = ty
                .records
                .iter()
                .position(|record| record.id == id)
                .ok_or_else(|| ServerError::RecordNotFound {
                    kind: kind.to_string(),
                    id: id.to_string(),
                })?;
            ty.records.remove(position);
        }

        for ty in inner.types.values_mut() {
            let pointing: Vec<String> = ty
                .associations
                .iter()
                .filter(|assoc| assoc.target == kind)
                .map(|assoc| assoc.name.clone())
                .collect();
            for name in pointing {
                for record in &mut ty.records {
                    match record.fks.get_mut(&name) {
                        Some(FkValue::One(slot)) if slot.as_deref() == Some(id) => *slot = None,
                        Some(FkValue::Many(ids)) => ids.retain(|fk| fk != id),
                        _ => {}
                    }
                }
            }
        }
        debug!(kind, %id, "destroyed record");
        Ok(())
    }

    /// Creates a record on the other side of `association` and wires the
    /// foreign keys on both sides (the inverse association is matched by
    /// target type, when the other side declares one).
    pub(crate) fn create_related(
        &self,
        kind: &str,
        id: &str,
        association: &str,
        attrs: Value,
    ) -> Result<Model, ServerError> {
        let assoc = self.association_of(kind, association).ok_or_else(|| {
            ServerError::UnknownAssociation {
                kind: kind.to_string(),
                name: association.to_string(),
            }
        })?;
        let child = self.create_record(&assoc.target, attrs)?;

        let mut inner = self.lock();
        if let Some(record) = record_mut(&mut inner, kind, id) {
            match record.fks.get_mut(&assoc.name) {
                Some(FkValue::One(slot)) => *slot = Some(child.id().to_string()),
                Some(FkValue::Many(ids)) => ids.push(child.id().to_string()),
                None => {}
            }
        }

        let inverse = inner
            .types
            .get(&assoc.target)
            .and_then(|ty| ty.associations.iter().find(|a| a.target == kind).cloned());
        if let Some(inverse) = inverse {
            if let Some(record) = record_mut(&mut inner, &assoc.target, child.id()) {
                match record.fks.get_mut(&inverse.name) {
                    Some(FkValue::One(slot)) => *slot = Some(id.to_string()),
                    Some(FkValue::Many(ids)) => ids.push(id.to_string()),
                    None => {}
                }
            }
        }
        Ok(child)
    }

    pub(crate) fn record_exists(&self, kind: &str, id: &str) -> bool {
        let inner = self.lock();
        inner
            .types
            .get(kind)
            .is_some_and(|ty| ty.records.iter().any(|record| record.id == id))
    }

    pub(crate) fn attr_of(&self, kind: &str, id: &str, name: &str) -> Option<Value> {
        let inner = self.lock();
        let ty = inner.types.get(kind)?;
        let record = ty.records.iter().find(|record| record.id == id)?;
        record.attrs.get(name).cloned()
    }

    pub(crate) fn attrs_of(&self, kind: &str, id: &str) -> Map<String, Value> {
        let inner = self.lock();
        inner
            .types
            .get(kind)
            .and_then(|ty| ty.records.iter().find(|record| record.id == id))
            .map(|record| record.attrs.clone())
            .unwrap_or_default()
    }

    pub(crate) fn fk_of(&self, kind: &str, id: &str, association: &str) -> Option<FkValue> {
        let inner = self.lock();
        let ty = inner.types.get(kind)?;
        let record = ty.records.iter().find(|record| record.id == id)?;
        record.fks.get(association).cloned()
    }

    pub(crate) fn association_of(&self, kind: &str, name: &str) -> Option<Association> {
        let inner = self.lock();
        inner
            .types
            .get(kind)?
            .associations
            .iter()
            .find(|assoc| assoc.name == name)
            .cloned()
    }

    pub(crate) fn ids_of(&self, kind: &str) -> Vec<String> {
        let inner = self.lock();
        inner
            .types
            .get(kind)
            .map(|ty| ty.records.iter().map(|record| record.id.clone()).collect())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        let mut map = f.debug_map();
        for (name, ty) in &inner.types {
            map.entry(name, &ty.records.len());
        }
        map.finish()
    }
}

fn record_mut<'a>(inner: &'a mut SchemaInner, kind: &str, id: &str) -> Option<&'a mut Record> {
    inner
        .types
        .get_mut(kind)?
        .records
        .iter_mut()
        .find(|record| record.id == id)
}

fn into_attr_map(attrs: Value) -> Result<Map<String, Value>, ServerError> {
    match attrs {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ServerError::InvalidAttributes(other.to_string())),
    }
}

fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn parse_fk(kind: AssociationKind, value: &Value) -> FkValue {
    match kind {
        AssociationKind::BelongsTo => FkValue::One(value_as_id(value)),
        AssociationKind::HasMany => match value {
            Value::Array(items) => FkValue::Many(items.iter().filter_map(value_as_id).collect()),
            _ => FkValue::Many(Vec::new()),
        },
    }
}

/// Per-type store access, the `schema.resource("users")` surface handlers
/// consume.
#[derive(Clone, Debug)]
pub struct ResourceSet {
    schema: Schema,
    type_name: String,
}

impl ResourceSet {
    /// All records of this type, in creation order.
    pub fn all(&self) -> Collection {
        let models = self
            .schema
            .ids_of(&self.type_name)
            .into_iter()
            .map(|id| Model::new(self.schema.clone(), self.type_name.clone(), id))
            .collect();
        Collection::new(self.type_name.clone(), models)
    }

    pub fn find(&self, id: &str) -> Option<Model> {
        self.schema
            .record_exists(&self.type_name, id)
            .then(|| Model::new(self.schema.clone(), self.type_name.clone(), id))
    }

    pub fn first(&self) -> Option<Model> {
        self.schema
            .ids_of(&self.type_name)
            .into_iter()
            .next()
            .map(|id| Model::new(self.schema.clone(), self.type_name.clone(), id))
    }

    /// Creates a record from a JSON object of attributes. An explicit `id`
    /// attribute overrides the assigned id; keys matching a declared
    /// relationship's foreign-key name ("author_id", "post_ids") set the
    /// relationship instead of an attribute.
    pub fn create(&self, attrs: Value) -> Result<Model, ServerError> {
        self.schema.create_record(&self.type_name, attrs)
    }

    /// The singular type name this set is a view of.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// Naive English pluralization, enough for resource naming.
pub(crate) fn pluralize(word: &str) -> String {
    if word.ends_with('s')
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        format!("{word}es")
    } else if ends_in_consonant_y(word) {
        format!("{}ies", &word[..word.len() - 1])
    } else {
        format!("{word}s")
    }
}

/// Inverse of [`pluralize`] for the same naive rules.
pub(crate) fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    if let Some(stem) = word.strip_suffix("es") {
        if stem.ends_with('s')
            || stem.ends_with('x')
            || stem.ends_with('z')
            || stem.ends_with("ch")
            || stem.ends_with("sh")
        {
            return stem.to_string();
        }
    }
    if let Some(stem) = word.strip_suffix('s') {
        if !stem.ends_with('s') && !stem.is_empty() {
            return stem.to_string();
        }
    }
    word.to_string()
}

fn ends_in_consonant_y(word: &str) -> bool {
    let mut chars = word.chars().rev();
    match (chars.next(), chars.next()) {
        (Some('y'), Some(prev)) => !matches!(prev, 'a' | 'e' | 'i' | 'o' | 'u'),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema_with_users() -> Schema {
        let schema = Schema::new();
        schema.register(ResourceDef::new("user"));
        schema
    }

    #[test]
    fn assigns_sequential_string_ids_starting_at_one() {
        let schema = schema_with_users();
        let users = schema.resource("users").unwrap();

        let first = users.create(json!({ "name": "Sam" })).unwrap();
        let second = users.create(json!({ "name": "Ganondorf" })).unwrap();

        assert_eq!(first.id(), "1");
        assert_eq!(second.id(), "2");
    }

    #[test]
    fn explicit_id_wins_and_bumps_the_counter() {
        let schema = schema_with_users();
        let users = schema.resource("users").unwrap();

        let custom = users.create(json!({ "id": "7", "name": "Link" })).unwrap();
        let next = users.create(json!({ "name": "Zelda" })).unwrap();

        assert_eq!(custom.id(), "7");
        assert_eq!(next.id(), "8");
    }

    #[test]
    fn unknown_resource_type_is_an_error() {
        let schema = schema_with_users();

        let err = schema.resource("widgets").unwrap_err();
        assert!(err.to_string().contains("widgets"));
    }

    #[test]
    fn all_preserves_creation_order() {
        let schema = schema_with_users();
        let users = schema.resource("users").unwrap();
        users.create(json!({ "name": "a" })).unwrap();
        users.create(json!({ "name": "b" })).unwrap();
        users.create(json!({ "name": "c" })).unwrap();

        let names: Vec<String> = users
            .all()
            .models()
            .iter()
            .map(|user| user.attr("name").unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn create_related_wires_both_sides() {
        let schema = Schema::new();
        schema.register(ResourceDef::new("author").has_many("posts"));
        schema.register(ResourceDef::new("post").belongs_to("author"));

        let author = schema
            .resource("authors")
            .unwrap()
            .create(json!({ "first": "Link" }))
            .unwrap();
        let post = author
            .create_related("posts", json!({ "title": "Lorem ipsum" }))
            .unwrap();

        assert_eq!(post.type_name(), "post");
        assert_eq!(
            schema.fk_of("author", "1", "posts"),
            Some(FkValue::Many(vec!["1".to_string()]))
        );
        assert_eq!(
            schema.fk_of("post", "1", "author"),
            Some(FkValue::One(Some("1".to_string())))
        );
    }

    #[test]
    fn fk_shaped_attrs_set_the_relationship_not_an_attribute() {
        let schema = Schema::new();
        schema.register(ResourceDef::new("author").has_many("posts"));
        schema.register(ResourceDef::new("post").belongs_to("author"));
        schema
            .resource("authors")
            .unwrap()
            .create(json!({ "first": "Link" }))
            .unwrap();

        let post = schema
            .resource("posts")
            .unwrap()
            .create(json!({ "title": "Lorem", "author_id": "1" }))
            .unwrap();

        assert_eq!(post.attr("author_id"), None);
        assert_eq!(
            schema.fk_of("post", "1", "author"),
            Some(FkValue::One(Some("1".to_string())))
        );
    }

    #[test]
    fn destroy_scrubs_foreign_keys() {
        let schema = Schema::new();
        schema.register(ResourceDef::new("author").has_many("posts"));
        schema.register(ResourceDef::new("post").belongs_to("author"));
        let author = schema
            .resource("authors")
            .unwrap()
            .create(json!({}))
            .unwrap();
        let post = author.create_related("posts", json!({})).unwrap();

        post.destroy().unwrap();

        assert_eq!(schema.fk_of("author", "1", "posts"), Some(FkValue::Many(vec![])));
        assert!(schema.resource("posts").unwrap().find("1").is_none());
    }

    #[test]
    fn inflection_round_trips() {
        for (singular, plural) in [
            ("user", "users"),
            ("comment", "comments"),
            ("party", "parties"),
            ("box", "boxes"),
            ("status", "statuses"),
        ] {
            assert_eq!(pluralize(singular), plural);
            assert_eq!(singularize(plural), singular);
        }
    }
}
