//! Flattening objects into index documents.
//!
//! Each saved object is mirrored as one [`IndexDocument`] carrying its
//! model assertions, timestamps, a JSON profile of every datastream, and
//! one stored-searchable field per structured field value
//! (`someData__fubar_tesim`).

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use docmap_index::{FieldNamer, IndexDocument, IndexRole};
use docmap_types::{DatastreamKind, FieldType};
use serde::{Deserialize, Serialize};

use crate::datastream::Datastream;
use crate::error::{ModelError, ModelResult};
use crate::object::DigitalObject;

/// Separator between datastream and field in structured field keys.
pub const FIELD_SEPARATOR: &str = "__";

/// Physical names of the system fields, resolved once from a namer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexFields {
    pub has_model: String,
    pub model: String,
    pub created: String,
    pub modified: String,
    pub profile: String,
}

impl IndexFields {
    pub fn new(namer: &dyn FieldNamer) -> Self {
        Self {
            has_model: namer.name("has_model", IndexRole::Symbol, FieldType::String),
            model: namer.name("active_fedora_model", IndexRole::StoredSortable, FieldType::String),
            created: namer.name("system_create", IndexRole::StoredSortable, FieldType::Date),
            modified: namer.name("system_modified", IndexRole::StoredSortable, FieldType::Date),
            profile: namer.name("object_profile", IndexRole::Displayable, FieldType::String),
        }
    }
}

/// Index key of one structured field before the role suffix.
pub fn structured_key(datastream: &str, field: &str) -> String {
    format!("{datastream}{FIELD_SEPARATOR}{field}")
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// ObjectProfile
// ---------------------------------------------------------------------------

/// Profile of one datastream as mirrored in the index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastreamSummary {
    #[serde(rename = "dsLabel", default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "dsMIME", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(rename = "dsVersionable", default, skip_serializing_if = "Option::is_none")]
    pub versionable: Option<bool>,
    #[serde(rename = "dsChecksum", default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(rename = "dsSize", default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DatastreamKind>,
}

impl DatastreamSummary {
    pub fn from_datastream(ds: &Datastream) -> Self {
        Self {
            label: Some(ds.label().to_string()),
            mime_type: Some(ds.mime_type().to_string()),
            versionable: Some(ds.versionable()),
            checksum: ds.checksum().map(str::to_string),
            size: Some(ds.size()),
            kind: Some(ds.kind()),
        }
    }

    /// Recorded kind, else inferred from the MIME type.
    pub fn effective_kind(&self) -> DatastreamKind {
        self.kind.unwrap_or_else(|| {
            self.mime_type
                .as_deref()
                .map(DatastreamKind::from_mime_type)
                .unwrap_or(DatastreamKind::Content)
        })
    }

    pub fn is_xml(&self) -> bool {
        self.effective_kind().is_xml()
    }
}

/// Datastream profiles of one object, keyed by datastream name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectProfile {
    #[serde(default)]
    pub datastreams: BTreeMap<String, DatastreamSummary>,
}

impl ObjectProfile {
    /// Profiles of the datastreams that exist in the repository.
    pub fn from_object(obj: &DigitalObject) -> Self {
        let datastreams = obj
            .datastreams()
            .values()
            .filter(|ds| !ds.is_new())
            .map(|ds| (ds.name().to_string(), DatastreamSummary::from_datastream(ds)))
            .collect();
        Self { datastreams }
    }

    pub fn from_json(json: &str) -> ModelResult<Self> {
        serde_json::from_str(json).map_err(|e| ModelError::Serialization(e.to_string()))
    }

    pub fn to_json(&self) -> ModelResult<String> {
        serde_json::to_string(self).map_err(|e| ModelError::Serialization(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Document building
// ---------------------------------------------------------------------------

/// Flatten a persisted object into its index document.
pub fn to_index_document(obj: &DigitalObject, namer: &dyn FieldNamer) -> ModelResult<IndexDocument> {
    let pid = obj.pid().ok_or(ModelError::NotPersisted)?;
    let fields = IndexFields::new(namer);
    let mut doc = IndexDocument::with_id(pid.as_str());

    let mut models = obj.model_assertions();
    if models.is_empty() {
        models.push(obj.model().to_uri());
    }
    doc.set(fields.has_model.clone(), models);
    doc.push(fields.model.clone(), obj.model().as_str());
    if let Some(created) = obj.created() {
        doc.push(fields.created.clone(), format_timestamp(created));
    }
    if let Some(modified) = obj.modified() {
        doc.push(fields.modified.clone(), format_timestamp(modified));
    }
    doc.push(fields.profile.clone(), ObjectProfile::from_object(obj).to_json()?);

    for ds in obj.datastreams().values() {
        let Ok(values) = ds.fields() else {
            continue;
        };
        for (field, values) in values {
            let name = namer.name(
                &structured_key(ds.name(), field),
                IndexRole::StoredSearchable,
                ds.field_type(field),
            );
            for value in values {
                doc.push(name.clone(), value.clone());
            }
        }
    }
    Ok(doc)
}
