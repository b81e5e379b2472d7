//! The live digital object: a pid, a model, and its datastreams.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use docmap_types::{ModelName, Pid, Term, Triple};

use crate::attributes::{AttributeValue, ChangeSet, Delegate};
use crate::datastream::Datastream;
use crate::error::{ModelError, ModelResult};
use crate::registry::{ModelRegistry, RELS_EXT};
use crate::validation::ValidationErrors;

/// Predicate of model assertions in `RELS-EXT`.
pub const HAS_MODEL: &str = "info:fedora/fedora-system:def/model#hasModel";

/// A digital object materialized against its model's declarations.
///
/// Every datastream the model declares is present, whether or not the
/// repository holds it. Objects are mutated through `&mut` by one caller at a
/// time and persisted with [`DocMap::save`](crate::DocMap::save).
pub struct DigitalObject {
    pid: Option<Pid>,
    model: ModelName,
    registry: Arc<ModelRegistry>,
    datastreams: BTreeMap<String, Datastream>,
    new: bool,
    created: Option<DateTime<Utc>>,
    modified: Option<DateTime<Utc>>,
    changes: ChangeSet,
    previous_changes: ChangeSet,
}

impl DigitalObject {
    pub(crate) fn from_parts(
        registry: Arc<ModelRegistry>,
        model: ModelName,
        pid: Option<Pid>,
        datastreams: BTreeMap<String, Datastream>,
    ) -> Self {
        Self {
            pid,
            model,
            registry,
            datastreams,
            new: true,
            created: None,
            modified: None,
            changes: ChangeSet::default(),
            previous_changes: ChangeSet::default(),
        }
    }

    pub fn pid(&self) -> Option<&Pid> {
        self.pid.as_ref()
    }

    pub fn model(&self) -> &ModelName {
        &self.model
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// `true` until the object exists in the repository.
    pub fn is_new(&self) -> bool {
        self.new
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }

    // -----------------------------------------------------------------------
    // Datastreams
    // -----------------------------------------------------------------------

    pub fn datastreams(&self) -> &BTreeMap<String, Datastream> {
        &self.datastreams
    }

    pub fn datastream(&self, name: &str) -> ModelResult<&Datastream> {
        self.datastreams
            .get(name)
            .ok_or_else(|| ModelError::UnknownDatastream(name.to_string()))
    }

    pub fn datastream_mut(&mut self, name: &str) -> ModelResult<&mut Datastream> {
        self.datastreams
            .get_mut(name)
            .ok_or_else(|| ModelError::UnknownDatastream(name.to_string()))
    }

    /// Add an undeclared datastream. Replaces an untouched, never-saved
    /// datastream of the same name; anything else is a conflict.
    pub fn add_datastream(&mut self, datastream: Datastream) -> ModelResult<()> {
        if let Some(existing) = self.datastreams.get(datastream.name()) {
            if !existing.is_new() || existing.is_changed() {
                return Err(ModelError::DuplicateDatastream(datastream.name().to_string()));
            }
        }
        self.datastreams.insert(datastream.name().to_string(), datastream);
        Ok(())
    }

    /// Names of the datastreams the next save will write.
    pub fn save_set(&self) -> Vec<String> {
        self.datastreams
            .values()
            .filter(|ds| ds.is_changed() || (ds.is_new() && ds.is_attached()))
            .map(|ds| ds.name().to_string())
            .collect()
    }

    /// Whether any datastream differs from its persisted state.
    pub fn is_changed(&self) -> bool {
        self.datastreams.values().any(Datastream::is_changed)
    }

    // -----------------------------------------------------------------------
    // Relationships
    // -----------------------------------------------------------------------

    /// The `RELS-EXT` graph.
    pub fn relationships(&self) -> ModelResult<&[Triple]> {
        self.datastream(RELS_EXT)?.graph()
    }

    /// Model URIs asserted in `RELS-EXT`, in graph order.
    pub fn model_assertions(&self) -> Vec<String> {
        self.relationships()
            .map(|graph| {
                graph
                    .iter()
                    .filter(|t| t.predicate == HAS_MODEL)
                    .filter_map(|t| match &t.object {
                        Term::Uri(uri) => Some(uri.clone()),
                        Term::Literal(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Ensure `RELS-EXT` asserts this object's model. Existing assertions
    /// are kept.
    pub(crate) fn assert_model(&mut self) -> ModelResult<()> {
        let pid = self.pid.clone().ok_or(ModelError::NotPersisted)?;
        let triple = Triple::new(pid.to_uri(), HAS_MODEL, Term::Uri(self.model.to_uri()));
        let rels = self.datastream_mut(RELS_EXT)?;
        let mut graph = rels.graph()?.to_vec();
        if !graph.contains(&triple) {
            graph.push(triple);
            rels.set_graph(graph)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Delegated attributes
    // -----------------------------------------------------------------------

    fn delegate_for(&self, attribute: &str) -> ModelResult<Delegate> {
        self.registry
            .delegate(&self.model, attribute)?
            .cloned()
            .ok_or_else(|| ModelError::UnknownAttribute {
                model: self.model.to_string(),
                attribute: attribute.to_string(),
            })
    }

    pub fn get_attribute(&self, attribute: &str) -> ModelResult<AttributeValue> {
        let delegate = self.delegate_for(attribute)?;
        let values = self.datastream(&delegate.datastream)?.field(delegate.field_name())?;
        Ok(AttributeValue::from_values(values, delegate.multiple))
    }

    pub fn set_attribute(&mut self, attribute: &str, value: impl Into<AttributeValue>) -> ModelResult<()> {
        let delegate = self.delegate_for(attribute)?;
        let old = self.get_attribute(attribute)?;
        let values = value.into().into_values();
        let new = AttributeValue::from_values(&values, delegate.multiple);
        let stored = if delegate.multiple {
            values
        } else {
            values.into_iter().take(1).collect()
        };
        self.datastream_mut(&delegate.datastream)?
            .set_field(delegate.field_name(), stored)?;
        self.changes.record(attribute, old, new);
        Ok(())
    }

    pub fn set_attributes<I, K, V>(&mut self, attributes: I) -> ModelResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<AttributeValue>,
    {
        for (attribute, value) in attributes {
            self.set_attribute(attribute.as_ref(), value)?;
        }
        Ok(())
    }

    /// Every delegated attribute and its current value.
    pub fn attributes(&self) -> ModelResult<BTreeMap<String, AttributeValue>> {
        self.registry
            .delegates(&self.model)?
            .iter()
            .map(|d| Ok((d.attribute.clone(), self.get_attribute(&d.attribute)?)))
            .collect()
    }

    /// Attribute changes since the last save.
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn attribute_changed(&self, attribute: &str) -> bool {
        self.changes.contains(attribute)
    }

    /// The changes the last successful save persisted.
    pub fn previous_changes(&self) -> &ChangeSet {
        &self.previous_changes
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Run every rule of the model and its ancestors.
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        for rule in self.registry.rules(&self.model).unwrap_or_default() {
            rule.validate(self, &mut errors);
        }
        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Whether a presence rule applies to `attribute`.
    pub fn is_required(&self, attribute: &str) -> bool {
        self.registry.is_required(&self.model, attribute).unwrap_or(false)
    }

    // -----------------------------------------------------------------------
    // Lifecycle hooks used by the materializer and persistence
    // -----------------------------------------------------------------------

    pub(crate) fn datastreams_mut(&mut self) -> &mut BTreeMap<String, Datastream> {
        &mut self.datastreams
    }

    pub(crate) fn set_model(&mut self, model: ModelName) {
        self.model = model;
    }

    pub(crate) fn assign_pid(&mut self, pid: Pid) {
        self.pid = Some(pid);
    }

    /// Record that the object exists in the repository.
    pub(crate) fn mark_persisted(&mut self, created: DateTime<Utc>, modified: DateTime<Utc>) {
        self.new = false;
        self.created = Some(created);
        self.modified = Some(modified);
    }

    pub(crate) fn touch(&mut self, modified: DateTime<Utc>) {
        self.modified = Some(modified);
    }

    pub(crate) fn commit_changes(&mut self) {
        self.previous_changes = std::mem::take(&mut self.changes);
    }
}

impl fmt::Debug for DigitalObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigitalObject")
            .field("pid", &self.pid)
            .field("model", &self.model)
            .field("new", &self.new)
            .field("datastreams", &self.datastreams.keys().collect::<Vec<_>>())
            .finish()
    }
}
