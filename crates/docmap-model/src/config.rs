use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::registry::{ModelSchema, RegistrySchema};

/// Where finder results come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Fetch and materialize every hit from the repository.
    #[default]
    Repository,
    /// Return frozen index-backed proxies.
    Index,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub url: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_user")]
    pub password: String,
}

fn default_user() -> String {
    "fedoraAdmin".into()
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8983/fedora".into(),
            user: default_user(),
            password: default_user(),
        }
    }
}

/// Repository connection settings: one endpoint, or a list of shards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shards: Vec<Credentials>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RepositoryCredentials {
    Single(Credentials),
    Sharded(Vec<Credentials>),
}

impl RepositoryConfig {
    pub fn credentials(&self) -> ModelResult<RepositoryCredentials> {
        if self.shards.is_empty() {
            let defaults = Credentials::default();
            return Ok(RepositoryCredentials::Single(Credentials {
                url: self.url.clone().unwrap_or(defaults.url),
                user: self.user.clone().unwrap_or(defaults.user),
                password: self.password.clone().unwrap_or(defaults.password),
            }));
        }
        if self.url.is_some() {
            return Err(ModelError::Config(
                "repository takes either `url` or `shards`, not both".into(),
            ));
        }
        Ok(RepositoryCredentials::Sharded(self.shards.clone()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub url: String,
    /// Rows requested per finder page.
    pub page_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8983/solr/development".into(),
            page_size: 1000,
        }
    }
}

/// Top-level configuration, read from TOML.
///
/// ```toml
/// pid_namespace = "changeme"
/// resolution = "repository"
///
/// [repository]
/// url = "http://127.0.0.1:8983/fedora"
///
/// [index]
/// url = "http://127.0.0.1:8983/solr/development"
/// page_size = 1000
///
/// [[model]]
/// name = "HasFile"
/// datastreams = [{ name = "file_ds", kind = "content", versionable = false }]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMapConfig {
    #[serde(default = "default_namespace")]
    pub pid_namespace: String,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default, rename = "model", skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<ModelSchema>,
}

fn default_namespace() -> String {
    "changeme".into()
}

impl Default for DocMapConfig {
    fn default() -> Self {
        Self {
            pid_namespace: default_namespace(),
            resolution: Resolution::default(),
            repository: RepositoryConfig::default(),
            index: IndexConfig::default(),
            models: Vec::new(),
        }
    }
}

impl DocMapConfig {
    /// Defaults with finder results served from the index.
    pub fn index_only() -> Self {
        Self {
            resolution: Resolution::Index,
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> ModelResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ModelError::Config(e.to_string()))?;
        if config.index.page_size == 0 {
            return Err(ModelError::Config("index.page_size must be positive".into()));
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ModelError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn credentials(&self) -> ModelResult<RepositoryCredentials> {
        self.repository.credentials()
    }

    pub fn is_sharded(&self) -> bool {
        !self.repository.shards.is_empty()
    }

    /// The `[[model]]` tables as a registry schema.
    pub fn registry_schema(&self) -> RegistrySchema {
        RegistrySchema {
            models: self.models.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let c = DocMapConfig::default();
        assert_eq!(c.pid_namespace, "changeme");
        assert_eq!(c.resolution, Resolution::Repository);
        assert_eq!(c.index.page_size, 1000);
        assert!(!c.is_sharded());
        assert_eq!(
            c.credentials().unwrap(),
            RepositoryCredentials::Single(Credentials::default())
        );
        assert_eq!(DocMapConfig::index_only().resolution, Resolution::Index);
    }

    #[test]
    fn single_repository_credentials() {
        let c = DocMapConfig::from_toml_str(
            r#"
            [repository]
            url = "http://testhost.com:8983/fedora"
            user = "fedoraAdmin"
            password = "fedoraAdmin"
            "#,
        )
        .unwrap();
        let RepositoryCredentials::Single(creds) = c.credentials().unwrap() else {
            panic!("expected single credentials");
        };
        assert_eq!(creds.url, "http://testhost.com:8983/fedora");
    }

    #[test]
    fn sharded_repository_credentials() {
        let c = DocMapConfig::from_toml_str(
            r#"
            [[repository.shards]]
            url = "http://127.0.0.1:8983/fedora1"

            [[repository.shards]]
            url = "http://127.0.0.1:8983/fedora2"
            user = "other"
            "#,
        )
        .unwrap();
        assert!(c.is_sharded());
        let RepositoryCredentials::Sharded(shards) = c.credentials().unwrap() else {
            panic!("expected shards");
        };
        assert_eq!(shards.len(), 2);
        assert_eq!(shards[0].user, "fedoraAdmin");
        assert_eq!(shards[1].user, "other");
    }

    #[test]
    fn url_and_shards_conflict() {
        let c = DocMapConfig::from_toml_str(
            r#"
            [repository]
            url = "http://a"
            [[repository.shards]]
            url = "http://b"
            "#,
        )
        .unwrap();
        assert!(matches!(c.credentials(), Err(ModelError::Config(_))));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(DocMapConfig::from_toml_str("resolution = \"solr\"").is_err());
        assert!(DocMapConfig::from_toml_str("[index]\nurl = \"x\"\npage_size = 0").is_err());
    }

    #[test]
    fn load_from_file_with_models() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            resolution = "index"

            [[model]]
            name = "HasFile"
            datastreams = [{{ name = "file_ds", kind = "content", versionable = false }}]
            "#
        )
        .unwrap();
        let c = DocMapConfig::load(file.path()).unwrap();
        assert_eq!(c.resolution, Resolution::Index);
        assert_eq!(c.registry_schema().models[0].name, "HasFile");
        assert!(DocMapConfig::load("/nonexistent/docmap.toml").is_err());
    }
}
