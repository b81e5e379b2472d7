//! Finder conditions and the query strings built from them.

use docmap_index::{term_clause, MATCH_ALL};
use docmap_types::{ModelName, Pid};

use crate::indexing::IndexFields;
use crate::registry::ModelRegistry;

/// Value side of one condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConditionValue {
    One(String),
    /// Every listed value must match: one clause per value, all ANDed.
    All(Vec<String>),
}

impl ConditionValue {
    fn values(&self) -> &[String] {
        match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::All(values) => values,
        }
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<String> for ConditionValue {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<Vec<&str>> for ConditionValue {
    fn from(values: Vec<&str>) -> Self {
        Self::All(values.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for ConditionValue {
    fn from(values: Vec<String>) -> Self {
        Self::All(values)
    }
}

/// Field → value conditions, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Conditions {
    pairs: Vec<(String, ConditionValue)>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<ConditionValue>) -> Self {
        self.pairs.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// One quoted clause per value.
    pub fn clauses(&self) -> Vec<String> {
        self.pairs
            .iter()
            .flat_map(|(field, value)| value.values().iter().map(move |v| term_clause(field, v)))
            .collect()
    }
}

impl<K: Into<String>, V: Into<ConditionValue>> FromIterator<(K, V)> for Conditions {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::new(), |conditions, (k, v)| conditions.with(k, v))
    }
}

/// What a finder call looks up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Pid(Pid),
    All,
    Conditions(Conditions),
}

/// Conditions for [`DocMap::find_with_conditions`](crate::DocMap::find_with_conditions).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
    Conditions(Conditions),
    /// A query string used as given.
    Raw(String),
}

/// Builds query strings for one model.
#[derive(Clone, Copy, Debug)]
pub struct QueryBuilder<'a> {
    registry: &'a ModelRegistry,
    fields: &'a IndexFields,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(registry: &'a ModelRegistry, fields: &'a IndexFields) -> Self {
        Self { registry, fields }
    }

    /// `_query_:"{!raw f=has_model_ssim}info:fedora/afmodel:<Model>"`, or
    /// `None` for the root model.
    pub fn model_clause(&self, model: &ModelName) -> Option<String> {
        if self.registry.is_root(model) {
            return None;
        }
        Some(format!(
            "_query_:\"{{!raw f={}}}{}\"",
            self.fields.has_model,
            model.to_uri()
        ))
    }

    /// Model clause ANDed with one clause per condition value.
    pub fn conditions_query(&self, model: &ModelName, conditions: &Conditions) -> String {
        let clauses: Vec<String> = self
            .model_clause(model)
            .into_iter()
            .chain(conditions.clauses())
            .collect();
        if clauses.is_empty() {
            MATCH_ALL.to_string()
        } else {
            clauses.join(" AND ")
        }
    }

    /// Model clause ANDed with a parenthesized raw query. On the root
    /// model the raw query is used unchanged.
    pub fn raw_query(&self, model: &ModelName, raw: Option<&str>) -> String {
        let raw = raw.map(str::trim).filter(|r| !r.is_empty());
        match (self.model_clause(model), raw) {
            (Some(clause), Some(raw)) => format!("{clause} AND ({raw})"),
            (Some(clause), None) => clause,
            (None, Some(raw)) => raw.to_string(),
            (None, None) => MATCH_ALL.to_string(),
        }
    }

    pub fn filter_query(&self, model: &ModelName, filter: &Filter) -> String {
        match filter {
            Filter::Conditions(conditions) => self.conditions_query(model, conditions),
            Filter::Raw(raw) => self.raw_query(model, Some(raw)),
        }
    }
}
