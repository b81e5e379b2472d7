use std::sync::Arc;

use chrono::Utc;
use docmap_index::{FieldNamer, InMemoryIndex, IndexClient, SolrizerNamer};
use docmap_repo::{InMemoryRepository, RepositoryClient};
use docmap_types::{ModelName, Pid};
use tracing::info;

use crate::attributes::AttributeValue;
use crate::config::DocMapConfig;
use crate::deprecation::{DeprecationObserver, TracingDeprecations};
use crate::error::{ModelError, ModelResult};
use crate::indexing::{to_index_document, IndexFields};
use crate::materializer::Materializer;
use crate::object::DigitalObject;
use crate::query::QueryBuilder;
use crate::registry::ModelRegistry;

/// Options for [`DocMap::save_with`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaveOptions {
    /// Run validation rules first and refuse to save on failure.
    pub validate: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { validate: true }
    }
}

impl SaveOptions {
    pub fn without_validation() -> Self {
        Self { validate: false }
    }
}

/// High-level mapping API: owns the registry and the repository and index
/// collaborators, and coordinates writes across both stores.
///
/// Writes go to the repository first and the index second. The two are not
/// transactional: a failed repository write leaves the index untouched, and
/// the index is never read back as a source of truth for writes.
pub struct DocMap {
    config: DocMapConfig,
    registry: Arc<ModelRegistry>,
    materializer: Materializer,
    repository: Arc<dyn RepositoryClient>,
    index: Arc<dyn IndexClient>,
    namer: Arc<dyn FieldNamer>,
    fields: IndexFields,
    deprecations: Arc<dyn DeprecationObserver>,
}

/// Assembles a [`DocMap`]. Unset collaborators default to the in-memory
/// backends, [`SolrizerNamer`], and [`TracingDeprecations`].
pub struct DocMapBuilder {
    config: DocMapConfig,
    registry: Arc<ModelRegistry>,
    repository: Option<Arc<dyn RepositoryClient>>,
    index: Option<Arc<dyn IndexClient>>,
    namer: Option<Arc<dyn FieldNamer>>,
    deprecations: Option<Arc<dyn DeprecationObserver>>,
}

impl DocMapBuilder {
    pub fn config(mut self, config: DocMapConfig) -> Self {
        self.config = config;
        self
    }

    pub fn repository(mut self, repository: Arc<dyn RepositoryClient>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn index(mut self, index: Arc<dyn IndexClient>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn namer(mut self, namer: Arc<dyn FieldNamer>) -> Self {
        self.namer = Some(namer);
        self
    }

    pub fn deprecations(mut self, deprecations: Arc<dyn DeprecationObserver>) -> Self {
        self.deprecations = Some(deprecations);
        self
    }

    pub fn build(self) -> DocMap {
        let namer = self.namer.unwrap_or_else(|| Arc::new(SolrizerNamer));
        DocMap {
            fields: IndexFields::new(namer.as_ref()),
            materializer: Materializer::new(Arc::clone(&self.registry)),
            config: self.config,
            registry: self.registry,
            repository: self
                .repository
                .unwrap_or_else(|| Arc::new(InMemoryRepository::new())),
            index: self.index.unwrap_or_else(|| Arc::new(InMemoryIndex::new())),
            namer,
            deprecations: self
                .deprecations
                .unwrap_or_else(|| Arc::new(TracingDeprecations)),
        }
    }
}

impl DocMap {
    pub fn builder(registry: Arc<ModelRegistry>) -> DocMapBuilder {
        DocMapBuilder {
            config: DocMapConfig::default(),
            registry,
            repository: None,
            index: None,
            namer: None,
            deprecations: None,
        }
    }

    /// A mapper over fresh in-memory stores.
    pub fn in_memory(registry: Arc<ModelRegistry>) -> Self {
        Self::builder(registry).build()
    }

    // ---- Accessors ----

    pub fn config(&self) -> &DocMapConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn materializer(&self) -> &Materializer {
        &self.materializer
    }

    pub fn repository(&self) -> &Arc<dyn RepositoryClient> {
        &self.repository
    }

    pub fn index(&self) -> &Arc<dyn IndexClient> {
        &self.index
    }

    pub fn namer(&self) -> &Arc<dyn FieldNamer> {
        &self.namer
    }

    pub fn fields(&self) -> &IndexFields {
        &self.fields
    }

    pub(crate) fn deprecations(&self) -> &dyn DeprecationObserver {
        self.deprecations.as_ref()
    }

    pub fn query_builder(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(&self.registry, &self.fields)
    }

    /// Look up a registered model.
    pub fn model(&self, name: &str) -> ModelResult<ModelName> {
        self.registry.model(name).cloned()
    }

    // ---- Object lifecycle ----

    pub fn new_object(&self, model: &str) -> ModelResult<DigitalObject> {
        self.materializer.new_object(&self.model(model)?, None)
    }

    /// A new object that will be created under `pid` on first save.
    pub fn new_object_with_pid(&self, model: &str, pid: Pid) -> ModelResult<DigitalObject> {
        self.materializer.new_object(&self.model(model)?, Some(pid))
    }

    /// Build, assign attributes, and save in one step.
    pub fn create<I, K, V>(&self, model: &str, attributes: I) -> ModelResult<DigitalObject>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<AttributeValue>,
    {
        let mut obj = self.new_object(model)?;
        obj.set_attributes(attributes)?;
        self.save(&mut obj)?;
        Ok(obj)
    }

    pub fn save(&self, obj: &mut DigitalObject) -> ModelResult<()> {
        self.save_with(obj, SaveOptions::default())
    }

    /// Persist an object.
    ///
    /// Mints a pid if needed, creates the repository object if new, asserts
    /// the model in `RELS-EXT`, writes every datastream in the save set, and
    /// then refreshes the index entry. The first failed datastream write
    /// aborts the save: datastreams not yet written stay dirty and the index
    /// is not touched.
    pub fn save_with(&self, obj: &mut DigitalObject, options: SaveOptions) -> ModelResult<()> {
        if options.validate {
            let errors = obj.validate();
            if !errors.is_empty() {
                return Err(ModelError::Validation(errors));
            }
        }

        let pid = match obj.pid() {
            Some(pid) => pid.clone(),
            None => {
                let pid = self.repository.next_pid(&self.config.pid_namespace)?;
                obj.assign_pid(pid.clone());
                pid
            }
        };
        if obj.is_new() {
            let record = self.repository.create(&pid)?;
            obj.mark_persisted(record.created, record.modified);
        }
        obj.assert_model()?;

        let mut written = 0usize;
        for name in obj.save_set() {
            if obj.datastream_mut(&name)?.save(self.repository.as_ref(), &pid)? {
                written += 1;
            }
        }
        if written > 0 {
            obj.touch(Utc::now());
        }

        self.update_index(obj)?;
        obj.commit_changes();
        info!(pid = %pid, model = %obj.model(), datastreams = written, "object saved");
        Ok(())
    }

    /// Push the object's current index document.
    pub fn update_index(&self, obj: &DigitalObject) -> ModelResult<()> {
        let doc = to_index_document(obj, self.namer.as_ref())?;
        self.index.add(doc)?;
        Ok(())
    }

    /// Remove an object from the repository, then from the index.
    pub fn delete(&self, obj: &DigitalObject) -> ModelResult<()> {
        let pid = match obj.pid() {
            Some(pid) if !obj.is_new() => pid,
            _ => return Err(ModelError::NotPersisted),
        };
        self.repository.delete(pid)?;
        self.index.delete(pid.as_str())?;
        info!(pid = %pid, model = %obj.model(), "object deleted");
        Ok(())
    }
}

impl std::fmt::Debug for DocMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocMap")
            .field("config", &self.config)
            .field("models", &self.registry.models().count())
            .finish()
    }
}
