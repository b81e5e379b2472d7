//! Builds live [`DigitalObject`]s from repository records and model
//! declarations.
//!
//! Two paths share one reconciliation rule:
//!
//! - New object: every declared datastream is created from its spec.
//! - Migration: datastreams the record holds keep their persisted label,
//!   versionable flag, and MIME type, and are decoded with the declared kind
//!   when the name is declared. Undeclared record datastreams keep a kind
//!   inferred from their MIME type, or stay opaque content when their bytes
//!   do not decode as that kind. Declared names the record lacks are
//!   created from their spec.
//!
//! Either way every declared name is present on the result.

use std::collections::BTreeMap;
use std::sync::Arc;

use docmap_repo::{DatastreamRecord, ObjectRecord};
use docmap_types::{DatastreamKind, ModelName, Pid};
use tracing::debug;

use crate::datastream::Datastream;
use crate::error::{ModelError, ModelResult};
use crate::object::DigitalObject;
use crate::registry::ModelRegistry;
use crate::spec::DatastreamSpec;

/// Materializes objects against one registry.
#[derive(Clone, Debug)]
pub struct Materializer {
    registry: Arc<ModelRegistry>,
}

impl Materializer {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// A new object of `model`; every declared datastream is `new`.
    pub fn new_object(&self, model: &ModelName, pid: Option<Pid>) -> ModelResult<DigitalObject> {
        let specs = self.registry.resolve(model)?;
        let mut datastreams = BTreeMap::new();
        add_missing(&mut datastreams, specs);
        Ok(DigitalObject::from_parts(
            Arc::clone(&self.registry),
            model.clone(),
            pid,
            datastreams,
        ))
    }

    /// Materialize `model` from a persisted record, or a new object when
    /// there is no record.
    pub fn materialize(&self, model: &ModelName, record: Option<&ObjectRecord>) -> ModelResult<DigitalObject> {
        let Some(record) = record else {
            return self.new_object(model, None);
        };
        let specs = self.registry.resolve(model)?;

        let mut datastreams = BTreeMap::new();
        for (name, ds_record) in &record.datastreams {
            let ds = match specs.iter().find(|s| &s.name == name) {
                Some(spec) => Datastream::from_record(ds_record, spec.kind, spec.fields.clone())?,
                None => undeclared(ds_record)?,
            };
            datastreams.insert(name.clone(), ds);
        }
        add_missing(&mut datastreams, specs);

        let mut obj = DigitalObject::from_parts(
            Arc::clone(&self.registry),
            model.clone(),
            Some(record.pid.clone()),
            datastreams,
        );
        obj.mark_persisted(record.created, record.modified);
        debug!(pid = %record.pid, model = %model, datastreams = record.datastreams.len(), "materialized object");
        Ok(obj)
    }

    /// The most specific registered model asserted in the object's
    /// `RELS-EXT` that is `requested` or descends from it.
    pub fn cast_target(&self, obj: &DigitalObject, requested: &ModelName) -> ModelName {
        let mut best = requested;
        for uri in obj.model_assertions() {
            let Some(candidate) = self.registry.model_for_uri(&uri) else {
                continue;
            };
            if self.registry.is_a(candidate, best) {
                best = candidate;
            } else if !self.registry.is_a(best, candidate) {
                debug!(asserted = %candidate, chosen = %best, "ignoring unrelated model assertion");
            }
        }
        best.clone()
    }

    /// Re-shape an object as `target`: declared datastreams it lacks are
    /// added, and present ones are re-decoded with the declared kind.
    pub fn cast(&self, mut obj: DigitalObject, target: &ModelName) -> ModelResult<DigitalObject> {
        if obj.model() == target {
            return Ok(obj);
        }
        let specs = self.registry.resolve(target)?;
        let datastreams = obj.datastreams_mut();
        for spec in specs {
            if let Some(ds) = datastreams.get_mut(&spec.name) {
                ds.rebind(spec.kind, spec.fields.clone())?;
            }
        }
        add_missing(datastreams, specs);
        debug!(from = %obj.model(), to = %target, "cast object");
        obj.set_model(target.clone());
        Ok(obj)
    }
}

/// An undeclared persisted datastream, decoded by the kind its mime type
/// suggests. Bytes that do not decode that way are kept as opaque content.
fn undeclared(record: &DatastreamRecord) -> ModelResult<Datastream> {
    let kind = DatastreamKind::from_mime_type(&record.profile.mime_type);
    match Datastream::from_record(record, kind, Vec::new()) {
        Err(ModelError::Decode { datastream, reason }) if kind != DatastreamKind::Content => {
            debug!(datastream = %datastream, %reason, "keeping undeclared datastream as content");
            Datastream::from_record(record, DatastreamKind::Content, Vec::new())
        }
        other => other,
    }
}

fn add_missing(datastreams: &mut BTreeMap<String, Datastream>, specs: &[DatastreamSpec]) {
    for spec in specs {
        datastreams
            .entry(spec.name.clone())
            .or_insert_with(|| Datastream::from_spec(spec));
    }
}
