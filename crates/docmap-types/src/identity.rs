use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// URI prefix of model assertions stored in `RELS-EXT` and the index.
pub const AFMODEL_PREFIX: &str = "info:fedora/afmodel:";

/// Persistent identifier of a digital object.
///
/// Repository pids conventionally look like `namespace:id`
/// (`changeme:30`), but the repository is the authority on what it accepts,
/// so the only local rules are: non-empty and free of whitespace.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pid(String);

impl Pid {
    /// Parse a pid.
    pub fn new(raw: impl Into<String>) -> Result<Self, TypeError> {
        let raw = raw.into();
        if raw.is_empty() || raw.chars().any(char::is_whitespace) {
            return Err(TypeError::InvalidPid(raw));
        }
        Ok(Self(raw))
    }

    /// Build a pid from a namespace and a local part.
    pub fn from_parts(namespace: &str, local: &str) -> Result<Self, TypeError> {
        Self::new(format!("{namespace}:{local}"))
    }

    /// The namespace (text before the first `:`), if any.
    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once(':').map(|(ns, _)| ns)
    }

    /// The `info:fedora/` URI used as the subject of relationship triples.
    pub fn to_uri(&self) -> String {
        format!("info:fedora/{}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Pid {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Pid> for String {
    fn from(pid: Pid) -> Self {
        pid.0
    }
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pid({})", self.0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a registered model.
///
/// Names use `::` as the namespace separator (`SpecModel::Basic`). In the
/// index and in `hasModel` assertions the separator is flattened to `_`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelName(String);

impl ModelName {
    pub fn new(raw: impl Into<String>) -> Result<Self, TypeError> {
        let raw = raw.into();
        let valid = !raw.is_empty()
            && raw
                .split("::")
                .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_alphanumeric() || c == '_'));
        if !valid {
            return Err(TypeError::InvalidModelName(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The flattened form used inside index fields: `SpecModel_Basic`.
    pub fn flattened(&self) -> String {
        self.0.replace("::", "_")
    }

    /// The model URI asserted via `hasModel`:
    /// `info:fedora/afmodel:SpecModel_Basic`.
    pub fn to_uri(&self) -> String {
        format!("{AFMODEL_PREFIX}{}", self.flattened())
    }
}

impl TryFrom<String> for ModelName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ModelName> for String {
    fn from(name: ModelName) -> Self {
        name.0
    }
}

impl fmt::Debug for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelName({})", self.0)
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_accepts_namespaced_and_bare_ids() {
        let pid = Pid::new("changeme:30").unwrap();
        assert_eq!(pid.namespace(), Some("changeme"));
        assert_eq!(pid.to_uri(), "info:fedora/changeme:30");

        let bare = Pid::new("_PID_").unwrap();
        assert_eq!(bare.namespace(), None);
    }

    #[test]
    fn pid_rejects_empty_and_whitespace() {
        assert!(matches!(Pid::new(""), Err(TypeError::InvalidPid(_))));
        assert!(matches!(Pid::new("a b:c"), Err(TypeError::InvalidPid(_))));
    }

    #[test]
    fn pid_from_parts() {
        let pid = Pid::from_parts("test", "has_metadata_base").unwrap();
        assert_eq!(pid.as_str(), "test:has_metadata_base");
    }

    #[test]
    fn pid_serde_roundtrip_rejects_invalid() {
        let pid: Pid = serde_json::from_str("\"mypid:99999\"").unwrap();
        assert_eq!(pid.as_str(), "mypid:99999");
        assert!(serde_json::from_str::<Pid>("\"\"").is_err());
    }

    #[test]
    fn model_uri_flattens_namespace() {
        let model = ModelName::new("SpecModel::Basic").unwrap();
        assert_eq!(model.flattened(), "SpecModel_Basic");
        assert_eq!(model.to_uri(), "info:fedora/afmodel:SpecModel_Basic");
    }

    #[test]
    fn model_name_validation() {
        assert!(ModelName::new("Base").is_ok());
        assert!(ModelName::new("With_Underscore").is_ok());
        assert!(ModelName::new("").is_err());
        assert!(ModelName::new("Spec::").is_err());
        assert!(ModelName::new("has space").is_err());
    }
}
