//! A named, typed sub-resource of a digital object.
//!
//! A [`Datastream`] owns its decoded payload and tracks three flags:
//!
//! - `new`: not yet persisted; cleared by the first successful save.
//! - `changed`: the serialized payload or an attribute differs from the last
//!   persisted snapshot. Assigning a value equal to the persisted one leaves
//!   the datastream clean.
//! - `attached`: part of the owning object's save set. Datastreams declared
//!   with `autocreate = false` start unattached and attach on first
//!   assignment.

use chrono::{DateTime, Utc};
use docmap_repo::{DatastreamRecord, DatastreamWrite, RepositoryClient};
use docmap_types::{DatastreamKind, FieldDescriptor, FieldType, Pid, Triple};
use tracing::debug;

use crate::codec::{decode_fields, encode_fields, is_field_name, FieldMap};
use crate::error::{ModelError, ModelResult};
use crate::spec::DatastreamSpec;

/// Decoded payload of a datastream, one variant per kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Bytes(Vec<u8>),
    Fields(FieldMap),
    Graph(Vec<Triple>),
}

impl Payload {
    fn empty(kind: DatastreamKind) -> Self {
        match kind {
            DatastreamKind::Content => Self::Bytes(Vec::new()),
            DatastreamKind::Structured => Self::Fields(FieldMap::new()),
            DatastreamKind::Rdf => Self::Graph(Vec::new()),
        }
    }

    fn decode(kind: DatastreamKind, bytes: &[u8]) -> Result<Self, String> {
        match kind {
            DatastreamKind::Content => Ok(Self::Bytes(bytes.to_vec())),
            DatastreamKind::Structured => decode_fields(bytes).map(Self::Fields),
            DatastreamKind::Rdf => {
                let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
                Triple::parse_all(text).map(Self::Graph).map_err(|e| e.to_string())
            }
        }
    }

    fn encode(&self) -> Vec<u8> {
        match self {
            Self::Bytes(bytes) => bytes.clone(),
            Self::Fields(fields) => encode_fields(fields),
            Self::Graph(triples) => Triple::serialize_all(triples).into_bytes(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Snapshot {
    digest: [u8; 32],
    label: String,
    versionable: bool,
    mime_type: String,
}

/// A named datastream of an object: its typed payload plus the profile and
/// dirty state tracked against the last persisted version.
#[derive(Clone, Debug)]
pub struct Datastream {
    name: String,
    kind: DatastreamKind,
    label: String,
    versionable: bool,
    mime_type: String,
    schema: Vec<FieldDescriptor>,
    payload: Payload,
    checksum: Option<String>,
    size: u64,
    created: Option<DateTime<Utc>>,
    persisted: Snapshot,
    new: bool,
    changed: bool,
    attached: bool,
}

impl Datastream {
    /// A new, attached datastream with the kind's defaults.
    pub fn new(name: impl Into<String>, kind: DatastreamKind) -> Self {
        let mut ds = Self {
            name: name.into(),
            kind,
            label: kind.default_label().to_string(),
            versionable: true,
            mime_type: kind.default_mime_type().to_string(),
            schema: Vec::new(),
            payload: Payload::empty(kind),
            checksum: None,
            size: 0,
            created: None,
            persisted: Snapshot {
                digest: [0; 32],
                label: String::new(),
                versionable: true,
                mime_type: String::new(),
            },
            new: true,
            changed: false,
            attached: true,
        };
        ds.rebaseline();
        ds
    }

    /// Attach a field schema. Only declared fields are accepted afterwards.
    pub fn with_schema(mut self, schema: Vec<FieldDescriptor>) -> Self {
        self.schema = schema;
        self
    }

    /// A new datastream shaped by its declaration.
    pub(crate) fn from_spec(spec: &DatastreamSpec) -> Self {
        let mut ds = Self::new(spec.name.clone(), spec.kind).with_schema(spec.fields.clone());
        ds.label = spec.effective_label().to_string();
        ds.versionable = spec.versionable;
        ds.attached = spec.autocreate;
        ds.rebaseline();
        ds
    }

    /// A persisted datastream decoded as `kind`. The record's attributes win
    /// over any declared defaults.
    pub(crate) fn from_record(
        record: &DatastreamRecord,
        kind: DatastreamKind,
        schema: Vec<FieldDescriptor>,
    ) -> ModelResult<Self> {
        let payload = Payload::decode(kind, &record.content).map_err(|reason| ModelError::Decode {
            datastream: record.name.clone(),
            reason,
        })?;
        let mut ds = Self::new(record.name.clone(), kind).with_schema(schema);
        ds.payload = payload;
        ds.label = record.profile.label.clone();
        ds.versionable = record.profile.versionable;
        ds.mime_type = record.profile.mime_type.clone();
        ds.checksum = Some(record.profile.checksum.clone());
        ds.size = record.profile.size;
        ds.created = Some(record.profile.created);
        ds.new = false;
        ds.rebaseline();
        Ok(ds)
    }

    /// A persisted datastream known only by its profile attributes.
    pub(crate) fn from_profile(
        name: impl Into<String>,
        kind: DatastreamKind,
        label: impl Into<String>,
        mime_type: impl Into<String>,
        versionable: bool,
    ) -> Self {
        let mut ds = Self::new(name, kind);
        ds.label = label.into();
        ds.mime_type = mime_type.into();
        ds.versionable = versionable;
        ds.new = false;
        ds.rebaseline();
        ds
    }

    /// Replace the structured payload without marking the datastream dirty.
    pub(crate) fn hydrate_fields(&mut self, fields: FieldMap) {
        self.payload = Payload::Fields(fields);
        self.rebaseline();
    }

    /// Re-decode the current payload under a different kind and schema.
    pub(crate) fn rebind(&mut self, kind: DatastreamKind, schema: Vec<FieldDescriptor>) -> ModelResult<()> {
        self.schema = schema;
        if kind == self.kind {
            return Ok(());
        }
        let clean = !self.changed;
        self.payload = Payload::decode(kind, &self.payload.encode()).map_err(|reason| ModelError::Decode {
            datastream: self.name.clone(),
            reason,
        })?;
        self.kind = kind;
        if clean {
            self.rebaseline();
        } else {
            self.refresh();
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DatastreamKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn versionable(&self) -> bool {
        self.versionable
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn schema(&self) -> &[FieldDescriptor] {
        &self.schema
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Repository checksum of the last persisted payload.
    pub fn checksum(&self) -> Option<&str> {
        self.checksum.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    pub fn is_new(&self) -> bool {
        self.new
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Serialized payload as it would be written to the repository.
    pub fn content(&self) -> Vec<u8> {
        self.payload.encode()
    }

    /// Replace the payload from its serialized form.
    pub fn set_content(&mut self, content: impl Into<Vec<u8>>) -> ModelResult<()> {
        let content = content.into();
        self.payload = Payload::decode(self.kind, &content).map_err(|reason| ModelError::Decode {
            datastream: self.name.clone(),
            reason,
        })?;
        self.touch();
        Ok(())
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
        self.touch();
    }

    pub fn set_versionable(&mut self, versionable: bool) {
        self.versionable = versionable;
        self.touch();
    }

    pub fn set_mime_type(&mut self, mime_type: impl Into<String>) {
        self.mime_type = mime_type.into();
        self.touch();
    }

    /// Values of one structured field; empty when unset.
    pub fn field(&self, name: &str) -> ModelResult<&[String]> {
        self.check_field(name)?;
        let fields = self.fields()?;
        Ok(fields.get(name).map(Vec::as_slice).unwrap_or(&[]))
    }

    pub fn fields(&self) -> ModelResult<&FieldMap> {
        match &self.payload {
            Payload::Fields(fields) => Ok(fields),
            _ => Err(self.kind_mismatch(DatastreamKind::Structured)),
        }
    }

    /// Replace every value of one structured field. An empty list unsets it.
    pub fn set_field(&mut self, name: &str, values: Vec<String>) -> ModelResult<()> {
        self.check_field(name)?;
        let fields = self.fields_mut()?;
        if values.is_empty() {
            fields.remove(name);
        } else {
            fields.insert(name.to_string(), values);
        }
        self.touch();
        Ok(())
    }

    pub fn set_fields(&mut self, fields: FieldMap) -> ModelResult<()> {
        for name in fields.keys() {
            self.check_field(name)?;
        }
        *self.fields_mut()? = fields.into_iter().filter(|(_, v)| !v.is_empty()).collect();
        self.touch();
        Ok(())
    }

    /// Declared type of a structured field; undeclared fields are strings.
    pub fn field_type(&self, name: &str) -> FieldType {
        self.schema
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.field_type)
            .unwrap_or_default()
    }

    pub fn graph(&self) -> ModelResult<&[Triple]> {
        match &self.payload {
            Payload::Graph(triples) => Ok(triples),
            _ => Err(self.kind_mismatch(DatastreamKind::Rdf)),
        }
    }

    pub fn set_graph(&mut self, triples: Vec<Triple>) -> ModelResult<()> {
        match &mut self.payload {
            Payload::Graph(graph) => *graph = triples,
            _ => return Err(self.kind_mismatch(DatastreamKind::Rdf)),
        }
        self.touch();
        Ok(())
    }

    /// Persist to the repository if new or changed.
    ///
    /// Returns `false` when there was nothing to write. On failure every
    /// flag is left as it was.
    pub fn save(&mut self, repository: &dyn RepositoryClient, pid: &Pid) -> ModelResult<bool> {
        if !(self.new || self.changed) {
            return Ok(false);
        }
        let content = self.content();
        let write = DatastreamWrite::new(self.label.clone(), self.mime_type.clone(), content)
            .versionable(self.versionable);
        let profile = repository.write_datastream(pid, &self.name, &write)?;

        self.label = profile.label;
        self.mime_type = profile.mime_type;
        self.versionable = profile.versionable;
        self.checksum = Some(profile.checksum);
        self.size = profile.size;
        self.created = Some(profile.created);
        self.new = false;
        self.attached = true;
        self.rebaseline();
        debug!(pid = %pid, datastream = %self.name, size = self.size, "datastream saved");
        Ok(true)
    }

    fn fields_mut(&mut self) -> ModelResult<&mut FieldMap> {
        let mismatch = self.kind_mismatch(DatastreamKind::Structured);
        match &mut self.payload {
            Payload::Fields(fields) => Ok(fields),
            _ => Err(mismatch),
        }
    }

    fn check_field(&self, name: &str) -> ModelResult<()> {
        if !is_field_name(name) {
            return Err(ModelError::InvalidFieldName(name.to_string()));
        }
        // Schema-less structured datastreams accept any field.
        if !self.schema.is_empty() && !self.schema.iter().any(|f| f.name == name) {
            return Err(ModelError::UnknownField {
                datastream: self.name.clone(),
                field: name.to_string(),
            });
        }
        Ok(())
    }

    fn kind_mismatch(&self, expected: DatastreamKind) -> ModelError {
        ModelError::KindMismatch {
            datastream: self.name.clone(),
            expected,
            actual: self.kind,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            digest: *blake3::hash(&self.payload.encode()).as_bytes(),
            label: self.label.clone(),
            versionable: self.versionable,
            mime_type: self.mime_type.clone(),
        }
    }

    fn touch(&mut self) {
        self.attached = true;
        self.refresh();
    }

    fn refresh(&mut self) {
        self.changed = self.snapshot() != self.persisted;
    }

    fn rebaseline(&mut self) {
        self.persisted = self.snapshot();
        self.changed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmap_repo::{InMemoryRepository, RepoError, RepoResult};
    use docmap_types::Term;

    fn repo_with_object() -> (InMemoryRepository, Pid) {
        let repo = InMemoryRepository::new();
        let pid = Pid::new("changeme:1").unwrap();
        repo.create(&pid).unwrap();
        (repo, pid)
    }

    fn descriptive() -> Datastream {
        Datastream::from_spec(
            &DatastreamSpec::structured("descMetadata")
                .field("title", FieldType::String)
                .field("pages", FieldType::Integer),
        )
    }

    // ---- flags ----

    #[test]
    fn new_datastream_is_new_and_clean() {
        let ds = Datastream::new("file_ds", DatastreamKind::Content);
        assert!(ds.is_new());
        assert!(!ds.is_changed());
        assert!(ds.is_attached());
        assert_eq!(ds.label(), "File Datastream");
        assert_eq!(ds.mime_type(), "application/octet-stream");
    }

    #[test]
    fn assigning_equal_content_stays_clean() {
        let mut ds = Datastream::new("file_ds", DatastreamKind::Content);
        ds.set_content(b"".to_vec()).unwrap();
        assert!(!ds.is_changed());
        ds.set_content(b"hello".to_vec()).unwrap();
        assert!(ds.is_changed());
        ds.set_content(b"".to_vec()).unwrap();
        assert!(!ds.is_changed());
    }

    #[test]
    fn attribute_changes_mark_dirty() {
        let mut ds = Datastream::new("file_ds", DatastreamKind::Content);
        ds.set_versionable(false);
        assert!(ds.is_changed());
        ds.set_versionable(true);
        assert!(!ds.is_changed());
        ds.set_label("Other");
        assert!(ds.is_changed());
    }

    #[test]
    fn unattached_until_touched() {
        let mut ds = Datastream::from_spec(&DatastreamSpec::content("thumbnail").autocreate(false));
        assert!(ds.is_new());
        assert!(!ds.is_changed());
        assert!(!ds.is_attached());
        ds.set_content(b"png".to_vec()).unwrap();
        assert!(ds.is_attached());
        assert!(ds.is_changed());
    }

    // ---- structured fields ----

    #[test]
    fn field_dispatch_follows_schema() {
        let mut ds = descriptive();
        ds.set_field("title", vec!["Dune".into()]).unwrap();
        assert_eq!(ds.field("title").unwrap(), ["Dune"]);
        assert!(ds.field("pages").unwrap().is_empty());
        assert_eq!(ds.field_type("pages"), FieldType::Integer);
        assert!(matches!(
            ds.set_field("publisher", vec!["x".into()]),
            Err(ModelError::UnknownField { .. })
        ));
        assert!(matches!(ds.field("bad name"), Err(ModelError::InvalidFieldName(_))));
    }

    #[test]
    fn schema_less_structured_accepts_any_field() {
        let mut ds = Datastream::new("extra", DatastreamKind::Structured);
        ds.set_field("anything", vec!["x".into()]).unwrap();
        assert_eq!(ds.field("anything").unwrap(), ["x"]);
    }

    #[test]
    fn set_content_decodes_structured_payload() {
        let mut ds = descriptive();
        ds.set_content(b"<fields><title>Dune</title></fields>".to_vec()).unwrap();
        assert_eq!(ds.field("title").unwrap(), ["Dune"]);
        assert!(matches!(ds.set_content(b"<mods/>".to_vec()), Err(ModelError::Decode { .. })));
    }

    #[test]
    fn clearing_a_field_restores_clean_state() {
        let mut ds = descriptive();
        ds.set_field("title", vec!["Dune".into()]).unwrap();
        ds.set_field("title", Vec::new()).unwrap();
        assert!(!ds.is_changed());
    }

    #[test]
    fn kind_mismatch_is_reported() {
        let mut ds = Datastream::new("file_ds", DatastreamKind::Content);
        assert!(matches!(ds.fields(), Err(ModelError::KindMismatch { .. })));
        assert!(matches!(ds.set_graph(Vec::new()), Err(ModelError::KindMismatch { .. })));
    }

    #[test]
    fn graph_payload() {
        let mut ds = Datastream::new("RELS-EXT", DatastreamKind::Rdf);
        let triple = Triple::new("info:fedora/a:1", "urn:p", Term::Literal("x".into()));
        ds.set_graph(vec![triple.clone()]).unwrap();
        assert!(ds.is_changed());
        assert_eq!(ds.graph().unwrap(), [triple]);
        assert!(String::from_utf8(ds.content()).unwrap().ends_with(" .\n"));
    }

    #[test]
    fn rebind_redecodes_payload() {
        let mut ds = Datastream::from_profile("extra", DatastreamKind::Content, "", "text/plain", true);
        ds.set_content(b"<fields><a>1</a></fields>".to_vec()).unwrap();
        ds.rebind(DatastreamKind::Structured, Vec::new()).unwrap();
        assert_eq!(ds.field("a").unwrap(), ["1"]);
        assert!(ds.is_changed());
    }

    // ---- save ----

    #[test]
    fn save_clears_flags_and_adopts_profile() {
        let (repo, pid) = repo_with_object();
        let mut ds = Datastream::new("file_ds", DatastreamKind::Content);
        ds.set_versionable(false);
        ds.set_content(b"Foo".to_vec()).unwrap();
        assert!(ds.save(&repo, &pid).unwrap());
        assert!(!ds.is_new());
        assert!(!ds.is_changed());
        assert!(!ds.versionable());
        assert_eq!(ds.size(), 3);
        assert_eq!(ds.checksum(), Some(docmap_repo::checksum(b"Foo").as_str()));
        assert!(!ds.save(&repo, &pid).unwrap());
    }

    #[test]
    fn reload_after_save_is_clean_with_new_value() {
        let (repo, pid) = repo_with_object();
        let mut ds = descriptive();
        ds.set_field("title", vec!["Dune".into()]).unwrap();
        ds.save(&repo, &pid).unwrap();

        let record = repo.read_datastream(&pid, "descMetadata").unwrap();
        let reloaded = Datastream::from_record(&record, DatastreamKind::Structured, Vec::new()).unwrap();
        assert!(!reloaded.is_changed());
        assert!(!reloaded.is_new());
        assert_eq!(reloaded.field("title").unwrap(), ["Dune"]);
    }

    struct Unavailable;

    impl RepositoryClient for Unavailable {
        fn fetch(&self, pid: &Pid) -> RepoResult<docmap_repo::ObjectRecord> {
            Err(RepoError::NotFound(pid.clone()))
        }
        fn create(&self, _: &Pid) -> RepoResult<docmap_repo::ObjectRecord> {
            Err(RepoError::Unavailable("down".into()))
        }
        fn delete(&self, _: &Pid) -> RepoResult<()> {
            Err(RepoError::Unavailable("down".into()))
        }
        fn read_datastream(&self, _: &Pid, _: &str) -> RepoResult<DatastreamRecord> {
            Err(RepoError::Unavailable("down".into()))
        }
        fn write_datastream(&self, _: &Pid, _: &str, _: &DatastreamWrite) -> RepoResult<docmap_repo::DatastreamProfile> {
            Err(RepoError::Unavailable("down".into()))
        }
        fn next_pid(&self, _: &str) -> RepoResult<Pid> {
            Err(RepoError::Unavailable("down".into()))
        }
    }

    #[test]
    fn failed_save_leaves_flags_untouched() {
        let pid = Pid::new("changeme:1").unwrap();
        let mut ds = Datastream::new("file_ds", DatastreamKind::Content);
        ds.set_content(b"Foo".to_vec()).unwrap();
        assert!(matches!(ds.save(&Unavailable, &pid), Err(ModelError::Repository(_))));
        assert!(ds.is_new());
        assert!(ds.is_changed());
    }
}
