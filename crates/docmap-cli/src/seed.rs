//! Opening a mapper over in-memory stores and seeding it from JSON.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use docmap_model::{AttributeValue, DocMap, DocMapConfig, ModelRegistry, RepositoryCredentials};
use docmap_repo::{InMemoryRepository, RepositoryClient, ShardedRepository};
use docmap_types::Pid;
use serde::Deserialize;
use tracing::{debug, info};

/// One object to create: `{"model": "Book", "pid": "test:1", "attributes": {"title": "x"}}`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SeedObject {
    pub model: String,
    #[serde(default)]
    pub pid: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

/// Build a mapper from an optional TOML config. Each configured shard gets
/// its own in-memory repository.
pub fn open(config: Option<&Path>) -> anyhow::Result<DocMap> {
    let config = match config {
        Some(path) => DocMapConfig::load(path)?,
        None => DocMapConfig::default(),
    };
    let registry = ModelRegistry::from_schema(config.registry_schema())
        .context("invalid model declarations")?;

    let repository: Arc<dyn RepositoryClient> = match config.credentials()? {
        RepositoryCredentials::Single(credentials) => {
            debug!(url = %credentials.url, "in-memory repository");
            Arc::new(InMemoryRepository::new())
        }
        RepositoryCredentials::Sharded(shards) => {
            debug!(shards = shards.len(), "in-memory sharded repository");
            let shards = shards
                .iter()
                .map(|_| Arc::new(InMemoryRepository::new()) as Arc<dyn RepositoryClient>)
                .collect();
            Arc::new(ShardedRepository::new(shards)?)
        }
    };

    Ok(DocMap::builder(Arc::new(registry))
        .config(config)
        .repository(repository)
        .build())
}

pub fn load(path: &Path) -> anyhow::Result<Vec<SeedObject>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Create and save every seed object, in order.
pub fn apply(docmap: &DocMap, objects: Vec<SeedObject>) -> anyhow::Result<Vec<Pid>> {
    let mut pids = Vec::with_capacity(objects.len());
    for seed in objects {
        let mut obj = match &seed.pid {
            Some(pid) => docmap.new_object_with_pid(&seed.model, Pid::new(pid.as_str())?)?,
            None => docmap.new_object(&seed.model)?,
        };
        obj.set_attributes(seed.attributes)
            .with_context(|| format!("seeding a {}", seed.model))?;
        docmap.save(&mut obj)?;
        if let Some(pid) = obj.pid() {
            pids.push(pid.clone());
        }
    }
    info!(objects = pids.len(), "seeded");
    Ok(pids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"
pid_namespace = "test"

[[model]]
name = "Book"
datastreams = [{ name = "descMetadata", kind = "structured" }]
delegates = [
    { attribute = "title", to = "descMetadata" },
    { attribute = "tags", to = "descMetadata", multiple = true },
]
"#;

    fn write(suffix: &str, text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn open_defaults_to_root_model_only() {
        let docmap = open(None).unwrap();
        assert_eq!(docmap.registry().models().count(), 1);
        assert_eq!(docmap.config().pid_namespace, "changeme");
    }

    #[test]
    fn seed_objects_are_saved_and_indexed() {
        let config = write(".toml", CONFIG);
        let seed = write(
            ".json",
            r#"[
                {"model": "Book", "attributes": {"title": "Hydra", "tags": ["quix", "quack"]}},
                {"model": "Book", "pid": "test:99", "attributes": {"title": "Dummies"}}
            ]"#,
        );
        let docmap = open(Some(config.path())).unwrap();
        let pids = apply(&docmap, load(seed.path()).unwrap()).unwrap();
        assert_eq!(pids[0].namespace(), Some("test"));
        assert_eq!(pids[1].as_str(), "test:99");
        assert_eq!(docmap.count("Book", None).unwrap(), 2);

        let book = docmap.find_one("Book", &pids[0], None).unwrap();
        assert_eq!(
            book.get_attribute("tags").unwrap(),
            AttributeValue::Multiple(vec!["quix".into(), "quack".into()])
        );
    }

    #[test]
    fn sharded_config_opens() {
        let config = write(
            ".toml",
            r#"
[[repository.shards]]
url = "http://127.0.0.1:8983/fedora1"

[[repository.shards]]
url = "http://127.0.0.1:8983/fedora2"
"#,
        );
        let docmap = open(Some(config.path())).unwrap();
        assert!(docmap.config().is_sharded());
        let obj = docmap.create("Base", Vec::<(&str, &str)>::new()).unwrap();
        assert!(docmap.exists(obj.pid().unwrap()).unwrap());
    }

    #[test]
    fn unknown_seed_model_fails() {
        let docmap = open(None).unwrap();
        let seed = vec![SeedObject {
            model: "Nope".into(),
            pid: None,
            attributes: BTreeMap::new(),
        }];
        assert!(apply(&docmap, seed).is_err());
    }
}
