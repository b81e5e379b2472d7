//! The flat document shape stored in the index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field name carrying the document identifier (the object's pid).
pub const ID_FIELD: &str = "id";

/// A denormalized index document: field name → ordered values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexDocument {
    fields: BTreeMap<String, Vec<String>>,
}

impl IndexDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// A document with only its `id` set.
    pub fn with_id(id: impl Into<String>) -> Self {
        let mut doc = Self::new();
        doc.set(ID_FIELD, vec![id.into()]);
        doc
    }

    pub fn id(&self) -> Option<&str> {
        self.first(ID_FIELD)
    }

    /// All values of a field.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// First value of a field.
    pub fn first(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|v| v.first()).map(String::as_str)
    }

    /// Append one value to a field.
    pub fn push(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(field.into()).or_default().push(value.into());
    }

    /// Replace every value of a field.
    pub fn set(&mut self, field: impl Into<String>, values: Vec<String>) {
        self.fields.insert(field.into(), values);
    }

    pub fn remove(&mut self, field: &str) -> Option<Vec<String>> {
        self.fields.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keep only the listed fields.
    pub fn project(&self, field_list: &[String]) -> Self {
        let fields = self
            .fields
            .iter()
            .filter(|(k, _)| field_list.iter().any(|f| f == *k || f == "*"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self { fields }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for IndexDocument {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut doc = Self::new();
        for (k, v) in iter {
            doc.push(k, v);
        }
        doc
    }
}
