//! Objects viewed through the index, without a repository round-trip.
//!
//! An [`IndexedObject`] is built from one index document. It starts
//! unfrozen so callers can adjust hydrated fields, and must be frozen before
//! it exposes repository access; once frozen it is read-only.
//! [`ObjectView`] tags whether a finder result is such a proxy or a fully
//! materialized [`DigitalObject`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use docmap_index::{FieldNamer, IndexDocument, IndexRole};
use docmap_repo::RepositoryClient;
use docmap_types::{DatastreamKind, ModelName, Pid};
use tracing::debug;

use crate::codec::FieldMap;
use crate::datastream::Datastream;
use crate::docmap::DocMap;
use crate::error::{ModelError, ModelResult};
use crate::indexing::{structured_key, IndexFields, ObjectProfile, FIELD_SEPARATOR};
use crate::object::DigitalObject;
use crate::registry::ModelRegistry;

/// Lifecycle of an [`IndexedObject`]: editable while unfrozen, read-only with
/// repository access once frozen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProxyState {
    Unfrozen,
    Frozen,
}

/// An object hydrated from one index document instead of the repository.
pub struct IndexedObject {
    pid: Option<Pid>,
    model: ModelName,
    document: IndexDocument,
    datastreams: BTreeMap<String, Datastream>,
    state: ProxyState,
    repository: Arc<dyn RepositoryClient>,
}

impl IndexedObject {
    /// Build a proxy of `model` from an index document and its profile.
    pub fn new(
        document: IndexDocument,
        profile: &ObjectProfile,
        model: &ModelName,
        registry: &ModelRegistry,
        namer: &dyn FieldNamer,
        repository: Arc<dyn RepositoryClient>,
    ) -> ModelResult<Self> {
        let pid = document.id().map(Pid::new).transpose()?;
        let specs = registry.resolve(model)?;
        let mut datastreams = BTreeMap::new();

        for (name, summary) in &profile.datastreams {
            let ds = match specs.iter().find(|s| &s.name == name) {
                Some(spec) => Datastream::from_profile(
                    name.clone(),
                    spec.kind,
                    summary.label.clone().unwrap_or_else(|| spec.effective_label().to_string()),
                    summary
                        .mime_type
                        .clone()
                        .unwrap_or_else(|| spec.kind.default_mime_type().to_string()),
                    summary.versionable.unwrap_or(spec.versionable),
                )
                .with_schema(spec.fields.clone()),
                None => {
                    // Undeclared XML datastreams become generic structured
                    // placeholders.
                    let kind = if summary.is_xml() {
                        DatastreamKind::Structured
                    } else {
                        summary.effective_kind()
                    };
                    Datastream::from_profile(
                        name.clone(),
                        kind,
                        summary.label.clone().unwrap_or_default(),
                        summary
                            .mime_type
                            .clone()
                            .unwrap_or_else(|| kind.default_mime_type().to_string()),
                        summary.versionable.unwrap_or(true),
                    )
                }
            };
            datastreams.insert(name.clone(), ds);
        }
        for spec in specs {
            datastreams
                .entry(spec.name.clone())
                .or_insert_with(|| Datastream::from_spec(spec));
        }
        for ds in datastreams.values_mut() {
            if ds.kind() == DatastreamKind::Structured {
                let fields = hydrate(&document, ds, namer);
                ds.hydrate_fields(fields);
            }
        }

        Ok(Self {
            pid,
            model: model.clone(),
            document,
            datastreams,
            state: ProxyState::Unfrozen,
            repository,
        })
    }

    /// Build a proxy from a document alone, reading the profile and model
    /// from its system fields. A more specific indexed model wins over the
    /// hint.
    pub fn from_document(
        document: IndexDocument,
        hint: Option<&ModelName>,
        registry: &ModelRegistry,
        namer: &dyn FieldNamer,
        repository: Arc<dyn RepositoryClient>,
    ) -> ModelResult<Self> {
        let fields = IndexFields::new(namer);
        let profile = document
            .first(&fields.profile)
            .map(ObjectProfile::from_json)
            .transpose()?
            .unwrap_or_default();
        let indexed = document
            .first(&fields.model)
            .and_then(|name| registry.model(name).ok());
        let model = match (hint, indexed) {
            (Some(hint), Some(indexed)) if registry.is_a(indexed, hint) => indexed,
            (Some(hint), _) => hint,
            (None, Some(indexed)) => indexed,
            (None, None) => registry.root(),
        }
        .clone();
        Self::new(document, &profile, &model, registry, namer, repository)
    }

    pub fn pid(&self) -> Option<&Pid> {
        self.pid.as_ref()
    }

    pub fn model(&self) -> &ModelName {
        &self.model
    }

    pub fn document(&self) -> &IndexDocument {
        &self.document
    }

    pub fn datastreams(&self) -> &BTreeMap<String, Datastream> {
        &self.datastreams
    }

    pub fn datastream(&self, name: &str) -> ModelResult<&Datastream> {
        self.datastreams
            .get(name)
            .ok_or_else(|| ModelError::UnknownDatastream(name.to_string()))
    }

    pub fn field(&self, datastream: &str, field: &str) -> ModelResult<&[String]> {
        self.datastream(datastream)?.field(field)
    }

    /// Overwrite a hydrated field. Only allowed before freezing.
    pub fn set_field(&mut self, datastream: &str, field: &str, values: Vec<String>) -> ModelResult<()> {
        if self.is_frozen() {
            return Err(ModelError::Frozen);
        }
        self.datastreams
            .get_mut(datastream)
            .ok_or_else(|| ModelError::UnknownDatastream(datastream.to_string()))?
            .set_field(field, values)
    }

    pub fn freeze(&mut self) {
        self.state = ProxyState::Frozen;
    }

    pub fn state(&self) -> ProxyState {
        self.state
    }

    pub fn is_frozen(&self) -> bool {
        self.state == ProxyState::Frozen
    }

    /// Repository handle; `None` until frozen.
    pub fn repository(&self) -> Option<&Arc<dyn RepositoryClient>> {
        self.is_frozen().then_some(&self.repository)
    }

    /// Proxies always describe persisted objects.
    pub fn new_record(&self) -> bool {
        false
    }
}

impl fmt::Debug for IndexedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedObject")
            .field("pid", &self.pid)
            .field("model", &self.model)
            .field("state", &self.state)
            .field("datastreams", &self.datastreams.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Structured field values stored in the index for one datastream.
fn hydrate(document: &IndexDocument, ds: &Datastream, namer: &dyn FieldNamer) -> FieldMap {
    let mut fields = FieldMap::new();
    if ds.schema().is_empty() {
        let prefix = format!("{}{FIELD_SEPARATOR}", ds.name());
        for (name, values) in document.fields() {
            let Some(field) = name.strip_prefix(&prefix).and_then(|rest| rest.rsplit_once('_')) else {
                continue;
            };
            fields.insert(field.0.to_string(), values.to_vec());
        }
    } else {
        for descriptor in ds.schema() {
            let name = namer.name(
                &structured_key(ds.name(), &descriptor.name),
                IndexRole::StoredSearchable,
                descriptor.field_type,
            );
            if let Some(values) = document.get(&name) {
                fields.insert(descriptor.name.clone(), values.to_vec());
            }
        }
    }
    fields
}

// ---------------------------------------------------------------------------
// ObjectView
// ---------------------------------------------------------------------------

/// A finder result: an index-backed proxy or a materialized object.
#[derive(Debug)]
pub enum ObjectView {
    Proxy(IndexedObject),
    Materialized(DigitalObject),
}

impl ObjectView {
    pub fn pid(&self) -> Option<&Pid> {
        match self {
            Self::Proxy(proxy) => proxy.pid(),
            Self::Materialized(obj) => obj.pid(),
        }
    }

    pub fn model(&self) -> &ModelName {
        match self {
            Self::Proxy(proxy) => proxy.model(),
            Self::Materialized(obj) => obj.model(),
        }
    }

    pub fn datastream(&self, name: &str) -> ModelResult<&Datastream> {
        match self {
            Self::Proxy(proxy) => proxy.datastream(name),
            Self::Materialized(obj) => obj.datastream(name),
        }
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, Self::Proxy(_))
    }

    pub fn as_materialized(&self) -> Option<&DigitalObject> {
        match self {
            Self::Materialized(obj) => Some(obj),
            Self::Proxy(_) => None,
        }
    }

    /// Promote to a materialized object. A proxy must be frozen; its
    /// object is fetched through its repository handle.
    pub fn materialize(self, docmap: &DocMap) -> ModelResult<DigitalObject> {
        match self {
            Self::Materialized(obj) => Ok(obj),
            Self::Proxy(proxy) => {
                let repository = proxy.repository().ok_or(ModelError::NotFrozen)?;
                let pid = proxy.pid().ok_or(ModelError::NotPersisted)?;
                let record = repository.fetch(pid)?;
                debug!(pid = %pid, model = %proxy.model(), "promoting index proxy");
                docmap.materializer().materialize(proxy.model(), Some(&record))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::registry;
    use docmap_index::SolrizerNamer;
    use docmap_repo::InMemoryRepository;

    fn proxy(doc: IndexDocument, model: &str) -> IndexedObject {
        let registry = registry();
        let model = registry.model(model).unwrap().clone();
        IndexedObject::from_document(doc, Some(&model), &registry, &SolrizerNamer, Arc::new(InMemoryRepository::new()))
            .unwrap()
    }

    fn profiled(profile: &str) -> IndexDocument {
        let mut doc = IndexDocument::with_id("changeme:30");
        doc.push("object_profile_ssm", profile);
        doc
    }

    #[test]
    fn empty_document_yields_declared_datastreams() {
        let obj = proxy(IndexDocument::new(), "SpecModel::Basic");
        assert!(obj.pid().is_none());
        assert!(!obj.new_record());
        let foo = obj.datastream("foo").unwrap();
        assert_eq!(foo.label(), "Foo Data");
        assert!(foo.field("title").unwrap().is_empty());
        assert!(obj.datastream("RELS-EXT").is_ok());
    }

    #[test]
    fn undeclared_xml_datastream_gets_placeholder() {
        let obj = proxy(
            profiled(r#"{"datastreams":{"properties":{"dsMIME":"text/xml"}}}"#),
            "SpecModel::Basic",
        );
        let properties = obj.datastream("properties").unwrap();
        assert_eq!(properties.kind(), DatastreamKind::Structured);
        assert!(!properties.is_new());
    }

    #[test]
    fn profile_attributes_win_over_spec_defaults() {
        let obj = proxy(
            profiled(r#"{"datastreams":{"foo":{"dsLabel":"Indexed","dsVersionable":false}}}"#),
            "SpecModel::Basic",
        );
        let foo = obj.datastream("foo").unwrap();
        assert_eq!(foo.label(), "Indexed");
        assert!(!foo.versionable());
        assert_eq!(foo.mime_type(), "text/xml");
    }

    #[test]
    fn structured_fields_are_hydrated() {
        let mut doc = profiled(r#"{"datastreams":{"extra":{"dsMIME":"text/xml"}}}"#);
        doc.push("foo__title_tesim", "Hydra for Dummies");
        doc.push("extra__dc_subject_tesim", "Repositories");
        let obj = proxy(doc, "SpecModel::Basic");
        assert_eq!(obj.field("foo", "title").unwrap(), ["Hydra for Dummies"]);
        assert_eq!(obj.field("extra", "dc_subject").unwrap(), ["Repositories"]);
        assert!(!obj.datastream("foo").unwrap().is_changed());
    }

    #[test]
    fn freezing_gates_mutation_and_repository_access() {
        let mut obj = proxy(IndexDocument::with_id("changeme:30"), "SpecModel::Basic");
        assert_eq!(obj.state(), ProxyState::Unfrozen);
        assert!(obj.repository().is_none());
        obj.set_field("foo", "title", vec!["Draft".into()]).unwrap();

        obj.freeze();
        assert!(obj.is_frozen());
        assert!(obj.repository().is_some());
        assert!(matches!(
            obj.set_field("foo", "title", vec!["Final".into()]),
            Err(ModelError::Frozen)
        ));
        assert_eq!(obj.field("foo", "title").unwrap(), ["Draft"]);
    }

    #[test]
    fn indexed_model_refines_hint() {
        let mut doc = IndexDocument::with_id("changeme:31");
        doc.push("active_fedora_model_ssi", "SpecModel::Sub");
        assert_eq!(proxy(doc.clone(), "SpecModel::Basic").model().as_str(), "SpecModel::Sub");
        assert_eq!(proxy(doc, "HasFile").model().as_str(), "HasFile");
    }
}
