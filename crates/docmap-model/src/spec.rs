//! Class-level datastream declarations.

use docmap_types::{DatastreamKind, FieldDescriptor, FieldType};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Declaration of one datastream a model expects its objects to carry.
///
/// Entries are plain data: the registry stores them, the materializer turns
/// them into [`Datastream`](crate::datastream::Datastream)s.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastreamSpec {
    pub name: String,
    pub kind: DatastreamKind,
    /// Falls back to the kind's default label when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default = "default_true")]
    pub versionable: bool,
    /// Whether new objects carry this datastream in their save set
    /// before it is touched.
    #[serde(default = "default_true")]
    pub autocreate: bool,
    /// Field schema of a structured datastream, kept verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDescriptor>,
}

impl DatastreamSpec {
    pub fn new(name: impl Into<String>, kind: DatastreamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            label: None,
            versionable: true,
            autocreate: true,
            fields: Vec::new(),
        }
    }

    pub fn content(name: impl Into<String>) -> Self {
        Self::new(name, DatastreamKind::Content)
    }

    pub fn structured(name: impl Into<String>) -> Self {
        Self::new(name, DatastreamKind::Structured)
    }

    pub fn rdf(name: impl Into<String>) -> Self {
        Self::new(name, DatastreamKind::Rdf)
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn versionable(mut self, versionable: bool) -> Self {
        self.versionable = versionable;
        self
    }

    pub fn autocreate(mut self, autocreate: bool) -> Self {
        self.autocreate = autocreate;
        self
    }

    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDescriptor::new(name, field_type));
        self
    }

    /// The declared label, or the kind's default.
    pub fn effective_label(&self) -> &str {
        self.label.as_deref().unwrap_or_else(|| self.kind.default_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_kind() {
        let spec = DatastreamSpec::content("file_ds");
        assert!(spec.versionable);
        assert!(spec.autocreate);
        assert_eq!(spec.effective_label(), "File Datastream");
        assert_eq!(DatastreamSpec::structured("descMetadata").effective_label(), "");
        assert_eq!(DatastreamSpec::rdf("foo").label("Foo Data").effective_label(), "Foo Data");
    }

    #[test]
    fn deserializes_with_defaults() {
        let spec: DatastreamSpec = toml::from_str(
            r#"
            name = "descMetadata"
            kind = "structured"
            autocreate = false
            fields = [{ name = "title" }, { name = "pages", type = "integer" }]
            "#,
        )
        .unwrap();
        assert!(spec.versionable);
        assert!(!spec.autocreate);
        assert_eq!(spec.fields[1], FieldDescriptor::new("pages", FieldType::Integer));
        assert_eq!(spec.fields[0].field_type, FieldType::String);
    }
}
