//! # Collection
//!
//! An ordered, homogeneous grouping of models of one type. A collection is a
//! view: the records stay owned by the schema. Store queries return
//! collections, and handlers can also build one ad hoc from models they
//! already hold (a filtered subset, say) — both serialize identically.

use crate::model::Model;

/// An ordered, homogeneous sequence of [`Model`]s of one named type.
#[derive(Clone, Debug, PartialEq)]
pub struct Collection {
    type_name: String,
    models: Vec<Model>,
}

impl Collection {
    /// Groups already-obtained models under a singular type name.
    pub fn new(type_name: impl Into<String>, models: Vec<Model>) -> Self {
        Self {
            type_name: type_name.into(),
            models,
        }
    }

    /// The singular type name shared by every member.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl IntoIterator for Collection {
    type Item = Model;
    type IntoIter = std::vec::IntoIter<Model>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.into_iter()
    }
}
