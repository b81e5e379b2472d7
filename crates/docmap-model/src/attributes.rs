//! Model attributes delegated to structured datastream fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Delegate
// ---------------------------------------------------------------------------

/// Binds a model attribute to one field of a structured datastream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegate {
    pub attribute: String,
    /// Name of the structured datastream holding the value.
    #[serde(rename = "to")]
    pub datastream: String,
    /// Field name inside the datastream; defaults to the attribute name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default)]
    pub multiple: bool,
}

impl Delegate {
    pub fn new(attribute: impl Into<String>, datastream: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            datastream: datastream.into(),
            field: None,
            multiple: false,
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn field_name(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.attribute)
    }
}

// ---------------------------------------------------------------------------
// AttributeValue
// ---------------------------------------------------------------------------

/// Value of a delegated attribute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Single(Option<String>),
    Multiple(Vec<String>),
}

impl AttributeValue {
    /// Shape `values` for a single- or multi-valued attribute.
    pub fn from_values(values: &[String], multiple: bool) -> Self {
        if multiple {
            Self::Multiple(values.to_vec())
        } else {
            Self::Single(values.first().cloned())
        }
    }

    pub fn into_values(self) -> Vec<String> {
        match self {
            Self::Single(value) => value.into_iter().collect(),
            Self::Multiple(values) => values,
        }
    }

    /// `true` for a missing value, an empty list, or only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Single(value) => value.as_deref().map_or(true, |v| v.trim().is_empty()),
            Self::Multiple(values) => values.iter().all(|v| v.trim().is_empty()),
        }
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(value) => value.as_deref(),
            Self::Multiple(values) => values.first().map(String::as_str),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Single(Some(value.to_string()))
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Single(Some(value))
    }
}

impl From<Option<String>> for AttributeValue {
    fn from(value: Option<String>) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for AttributeValue {
    fn from(values: Vec<String>) -> Self {
        Self::Multiple(values)
    }
}

impl From<Vec<&str>> for AttributeValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Multiple(values.into_iter().map(str::to_string).collect())
    }
}

// ---------------------------------------------------------------------------
// ChangeSet
// ---------------------------------------------------------------------------

/// Old and new value of one changed attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeChange {
    pub old: AttributeValue,
    pub new: AttributeValue,
}

/// Attribute changes since the last save.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: BTreeMap<String, AttributeChange>,
}

impl ChangeSet {
    /// Record an assignment. The first recorded `old` is kept, and a value
    /// set back to it drops the entry.
    pub fn record(&mut self, attribute: &str, old: AttributeValue, new: AttributeValue) {
        let original = match self.changes.remove(attribute) {
            Some(change) => change.old,
            None => old,
        };
        if original != new {
            self.changes
                .insert(attribute.to_string(), AttributeChange { old: original, new });
        }
    }

    pub fn get(&self, attribute: &str) -> Option<&AttributeChange> {
        self.changes.get(attribute)
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.changes.contains_key(attribute)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeChange)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}
