use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The semantic kind of a datastream.
///
/// The kind decides how the mapping layer encodes and decodes the payload;
/// the repository itself only ever sees bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatastreamKind {
    /// Unstructured content (files, arbitrary bytes).
    Content,
    /// XML metadata with a declared field schema.
    Structured,
    /// RDF graph metadata serialized as N-Triples.
    Rdf,
}

impl DatastreamKind {
    /// MIME type assigned to a freshly created datastream of this kind.
    pub fn default_mime_type(&self) -> &'static str {
        match self {
            Self::Content => "application/octet-stream",
            Self::Structured => "text/xml",
            Self::Rdf => "application/n-triples",
        }
    }

    /// Label assigned when the declaring entry does not name one.
    pub fn default_label(&self) -> &'static str {
        match self {
            Self::Content => "File Datastream",
            Self::Structured | Self::Rdf => "",
        }
    }

    /// Infer the kind of an undeclared datastream from its MIME type.
    pub fn from_mime_type(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        match essence {
            "text/xml" | "application/xml" => Self::Structured,
            "application/n-triples" | "application/rdf+xml" | "text/turtle" => Self::Rdf,
            _ if essence.ends_with("+xml") => Self::Structured,
            _ => Self::Content,
        }
    }

    /// Returns `true` for the XML-backed kind.
    pub fn is_xml(&self) -> bool {
        matches!(self, Self::Structured)
    }
}

impl fmt::Display for DatastreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content => write!(f, "content"),
            Self::Structured => write!(f, "structured"),
            Self::Rdf => write!(f, "rdf"),
        }
    }
}

impl FromStr for DatastreamKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "content" => Ok(Self::Content),
            "structured" => Ok(Self::Structured),
            "rdf" => Ok(Self::Rdf),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }
}

/// Value type of a structured-metadata field.
///
/// The mapping layer stores every value as text; the type only selects the
/// index role suffix used when the field is mirrored into the index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[default]
    String,
    Text,
    Integer,
    Date,
    Boolean,
}

/// One field declared in a structured datastream's schema block.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_per_kind() {
        assert_eq!(DatastreamKind::Content.default_label(), "File Datastream");
        assert_eq!(DatastreamKind::Structured.default_mime_type(), "text/xml");
        assert_eq!(DatastreamKind::Rdf.default_mime_type(), "application/n-triples");
    }

    #[test]
    fn kind_inferred_from_mime() {
        assert_eq!(DatastreamKind::from_mime_type("text/xml"), DatastreamKind::Structured);
        assert_eq!(
            DatastreamKind::from_mime_type("text/xml; charset=utf-8"),
            DatastreamKind::Structured
        );
        assert_eq!(DatastreamKind::from_mime_type("application/mods+xml"), DatastreamKind::Structured);
        assert_eq!(DatastreamKind::from_mime_type("application/n-triples"), DatastreamKind::Rdf);
        assert_eq!(DatastreamKind::from_mime_type("image/png"), DatastreamKind::Content);
    }

    #[test]
    fn kind_parse_and_display() {
        for kind in [DatastreamKind::Content, DatastreamKind::Structured, DatastreamKind::Rdf] {
            assert_eq!(kind.to_string().parse::<DatastreamKind>().unwrap(), kind);
        }
        assert!("om".parse::<DatastreamKind>().is_err());
    }

    #[test]
    fn field_descriptor_deserializes_with_default_type() {
        let field: FieldDescriptor = serde_json::from_str(r#"{"name":"title"}"#).unwrap();
        assert_eq!(field.field_type, FieldType::String);
        let field: FieldDescriptor =
            serde_json::from_str(r#"{"name":"swank","type":"text"}"#).unwrap();
        assert_eq!(field, FieldDescriptor::new("swank", FieldType::Text));
    }
}
