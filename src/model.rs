//! # Model
//!
//! A live view of one record in the schema. A `Model` is `(schema handle,
//! type name, id)`; attribute reads and writes always go through the store,
//! so two views of the same record never disagree.

use crate::error::ServerError;
use crate::schema::{Association, FkValue, Schema};
use serde_json::{Map, Value};

/// A single identified entity instance in the in-memory store.
#[derive(Clone)]
pub struct Model {
    schema: Schema,
    type_name: String,
    id: String,
}

impl Model {
    pub(crate) fn new(schema: Schema, type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            schema,
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    /// The record id. Always a string, whatever it was created from.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The singular type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Reads one attribute.
    pub fn attr(&self, name: &str) -> Option<Value> {
        self.schema.attr_of(&self.type_name, &self.id, name)
    }

    /// Snapshot of all attributes, in insertion order. Foreign keys are not
    /// attributes and do not appear here.
    pub fn attrs(&self) -> Map<String, Value> {
        self.schema.attrs_of(&self.type_name, &self.id)
    }

    /// Merges a JSON object of attributes into the record. Keys matching a
    /// relationship's foreign-key name set the relationship instead.
    pub fn update(&self, attrs: Value) -> Result<(), ServerError> {
        self.schema.update_record(&self.type_name, &self.id, attrs)
    }

    /// Removes the record and scrubs foreign keys pointing at it.
    pub fn destroy(self) -> Result<(), ServerError> {
        self.schema.destroy_record(&self.type_name, &self.id)
    }

    /// Creates a record on the other side of the named association and wires
    /// the foreign keys of both sides.
    pub fn create_related(&self, association: &str, attrs: Value) -> Result<Model, ServerError> {
        self.schema
            .create_related(&self.type_name, &self.id, association, attrs)
    }

    pub(crate) fn association(&self, name: &str) -> Option<Association> {
        self.schema.association_of(&self.type_name, name)
    }

    pub(crate) fn fk(&self, association: &str) -> Option<FkValue> {
        self.schema.fk_of(&self.type_name, &self.id, association)
    }

    pub(crate) fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("type_name", &self.type_name)
            .field("id", &self.id)
            .finish()
    }
}

/// Two models are the same record if they agree on type and id.
impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.id == other.id
    }
}
