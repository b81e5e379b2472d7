//! The model registry.
//!
//! Models form a single-rooted hierarchy. Each model declares datastreams,
//! delegated attributes, and validation rules; a model inherits everything
//! its ancestors declare. [`ModelRegistryBuilder`] collects declarations and
//! [`ModelRegistryBuilder::build`] resolves inheritance once. The resulting
//! [`ModelRegistry`] is immutable and shared as `Arc<ModelRegistry>`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use docmap_types::{DatastreamKind, ModelName};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attributes::Delegate;
use crate::error::{ModelError, ModelResult};
use crate::spec::DatastreamSpec;
use crate::validation::{RuleSchema, ValidationRule};

/// Name of the root model every other model descends from.
pub const ROOT_MODEL: &str = "Base";

/// Relationship datastream carrying `hasModel` assertions.
pub const RELS_EXT: &str = "RELS-EXT";

const RELS_EXT_LABEL: &str = "Fedora Object-to-Object Relationship Metadata";

fn model_name(raw: &str) -> ModelResult<ModelName> {
    ModelName::new(raw).map_err(|_| ModelError::UnknownModel(raw.to_string()))
}

/// Replace an entry with the same key in place, or append.
fn upsert<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T, &T) -> bool) {
    match items.iter_mut().find(|existing| same(existing, &item)) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Declarative form of one model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub name: String,
    /// Defaults to the root model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub datastreams: Vec<DatastreamSpec>,
    #[serde(default)]
    pub delegates: Vec<Delegate>,
    #[serde(default)]
    pub validations: Vec<RuleSchema>,
}

/// Declarative form of a whole registry, e.g. a `[[model]]` TOML list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySchema {
    #[serde(default, rename = "model")]
    pub models: Vec<ModelSchema>,
}

impl RegistrySchema {
    pub fn from_toml_str(s: &str) -> ModelResult<Self> {
        toml::from_str(s).map_err(|e| ModelError::Config(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ModelDef {
    parent: Option<ModelName>,
    datastreams: Vec<DatastreamSpec>,
    delegates: Vec<Delegate>,
    rules: Vec<Arc<dyn ValidationRule>>,
}

/// Collects model declarations.
#[derive(Debug)]
pub struct ModelRegistryBuilder {
    root: ModelName,
    models: BTreeMap<ModelName, ModelDef>,
}

impl Default for ModelRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistryBuilder {
    /// A builder holding only the root model and its `RELS-EXT` datastream.
    pub fn new() -> Self {
        let root = ModelName::new(ROOT_MODEL).expect("root model name is valid");
        let mut models = BTreeMap::new();
        models.insert(
            root.clone(),
            ModelDef {
                datastreams: vec![DatastreamSpec::rdf(RELS_EXT).label(RELS_EXT_LABEL)],
                ..ModelDef::default()
            },
        );
        Self { root, models }
    }

    /// Declare `model` as a child of `parent`. Redeclaring with the same
    /// parent is a no-op.
    pub fn define(&mut self, model: &str, parent: &str) -> ModelResult<&mut Self> {
        let name = model_name(model)?;
        let parent = model_name(parent)?;
        if name == self.root {
            return Err(ModelError::InvalidRegistry(format!("{name} cannot be redefined")));
        }
        match self.models.get(&name) {
            Some(def) if def.parent.as_ref() != Some(&parent) => {
                return Err(ModelError::InvalidRegistry(format!(
                    "{name} is already defined with a different parent"
                )));
            }
            Some(_) => {}
            None => {
                self.models.insert(
                    name,
                    ModelDef {
                        parent: Some(parent),
                        ..ModelDef::default()
                    },
                );
            }
        }
        Ok(self)
    }

    /// Declare a datastream on `model`. A later declaration of the same name
    /// replaces the earlier one.
    pub fn register(&mut self, model: &str, spec: DatastreamSpec) -> ModelResult<&mut Self> {
        upsert(&mut self.def_mut(model)?.datastreams, spec, |a, b| a.name == b.name);
        Ok(self)
    }

    pub fn delegate(&mut self, model: &str, delegate: Delegate) -> ModelResult<&mut Self> {
        upsert(&mut self.def_mut(model)?.delegates, delegate, |a, b| {
            a.attribute == b.attribute
        });
        Ok(self)
    }

    pub fn validates(&mut self, model: &str, rule: Arc<dyn ValidationRule>) -> ModelResult<&mut Self> {
        self.def_mut(model)?.rules.push(rule);
        Ok(self)
    }

    /// Apply every model in a declarative schema.
    pub fn schema(&mut self, schema: RegistrySchema) -> ModelResult<&mut Self> {
        for model in schema.models {
            let parent = model.parent.as_deref().unwrap_or(ROOT_MODEL);
            if model.name != ROOT_MODEL {
                self.define(&model.name, parent)?;
            }
            for spec in model.datastreams {
                self.register(&model.name, spec)?;
            }
            for delegate in model.delegates {
                self.delegate(&model.name, delegate)?;
            }
            for rule in model.validations {
                self.validates(&model.name, rule.into_rule())?;
            }
        }
        Ok(self)
    }

    /// Resolve inheritance and freeze the registry.
    pub fn build(self) -> ModelResult<ModelRegistry> {
        let mut resolved = BTreeMap::new();
        for name in self.models.keys() {
            let chain = self.chain(name)?;
            let mut model = ResolvedModel {
                parent: self.models[name].parent.clone(),
                datastreams: Vec::new(),
                delegates: Vec::new(),
                rules: Vec::new(),
            };
            for ancestor in chain.iter().rev() {
                let def = &self.models[*ancestor];
                for spec in &def.datastreams {
                    upsert(&mut model.datastreams, spec.clone(), |a, b| a.name == b.name);
                }
                for delegate in &def.delegates {
                    upsert(&mut model.delegates, delegate.clone(), |a, b| {
                        a.attribute == b.attribute
                    });
                }
                model.rules.extend(def.rules.iter().cloned());
            }
            check_delegates(name, &model)?;
            resolved.insert(name.clone(), model);
        }
        debug!(models = resolved.len(), "model registry built");
        Ok(ModelRegistry {
            root: self.root,
            models: resolved,
        })
    }

    fn def_mut(&mut self, model: &str) -> ModelResult<&mut ModelDef> {
        let name = model_name(model)?;
        self.models
            .get_mut(&name)
            .ok_or_else(|| ModelError::UnknownModel(model.to_string()))
    }

    /// `name` followed by each ancestor up to the root.
    fn chain<'a>(&'a self, name: &'a ModelName) -> ModelResult<Vec<&'a ModelName>> {
        let mut chain = vec![name];
        let mut seen = BTreeSet::from([name]);
        let mut current = name;
        while let Some(parent) = self.models[current].parent.as_ref() {
            if !self.models.contains_key(parent) {
                return Err(ModelError::InvalidRegistry(format!(
                    "{current} has unknown parent {parent}"
                )));
            }
            if !seen.insert(parent) {
                return Err(ModelError::InvalidRegistry(format!(
                    "inheritance cycle through {parent}"
                )));
            }
            chain.push(parent);
            current = parent;
        }
        Ok(chain)
    }
}

fn check_delegates(name: &ModelName, model: &ResolvedModel) -> ModelResult<()> {
    for delegate in &model.delegates {
        let target = model.datastreams.iter().find(|s| s.name == delegate.datastream);
        match target {
            Some(spec) if spec.kind == DatastreamKind::Structured => {}
            Some(_) => {
                return Err(ModelError::InvalidRegistry(format!(
                    "{name}.{} delegates to non-structured datastream {}",
                    delegate.attribute, delegate.datastream
                )))
            }
            None => {
                return Err(ModelError::InvalidRegistry(format!(
                    "{name}.{} delegates to undeclared datastream {}",
                    delegate.attribute, delegate.datastream
                )))
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ResolvedModel {
    parent: Option<ModelName>,
    datastreams: Vec<DatastreamSpec>,
    delegates: Vec<Delegate>,
    rules: Vec<Arc<dyn ValidationRule>>,
}

/// Immutable, inheritance-resolved model declarations.
#[derive(Debug)]
pub struct ModelRegistry {
    root: ModelName,
    models: BTreeMap<ModelName, ResolvedModel>,
}

impl ModelRegistry {
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::new()
    }

    /// Build a registry from a declarative schema.
    pub fn from_schema(schema: RegistrySchema) -> ModelResult<Self> {
        let mut builder = Self::builder();
        builder.schema(schema)?;
        builder.build()
    }

    pub fn root(&self) -> &ModelName {
        &self.root
    }

    pub fn is_root(&self, model: &ModelName) -> bool {
        *model == self.root
    }

    /// Look up a registered model by name.
    pub fn model(&self, name: &str) -> ModelResult<&ModelName> {
        let key = model_name(name)?;
        self.models
            .get_key_value(&key)
            .map(|(k, _)| k)
            .ok_or_else(|| ModelError::UnknownModel(name.to_string()))
    }

    pub fn contains(&self, model: &ModelName) -> bool {
        self.models.contains_key(model)
    }

    pub fn models(&self) -> impl Iterator<Item = &ModelName> {
        self.models.keys()
    }

    pub fn parent(&self, model: &ModelName) -> ModelResult<Option<&ModelName>> {
        Ok(self.get(model)?.parent.as_ref())
    }

    /// `model` followed by each ancestor up to the root.
    pub fn ancestors(&self, model: &ModelName) -> ModelResult<Vec<&ModelName>> {
        let mut chain = vec![self.model_key(model)?];
        while let Some(parent) = self.get(chain[chain.len() - 1])?.parent.as_ref() {
            chain.push(parent);
        }
        Ok(chain)
    }

    /// Whether `model` is `ancestor` or descends from it.
    pub fn is_a(&self, model: &ModelName, ancestor: &ModelName) -> bool {
        self.ancestors(model)
            .map(|chain| chain.contains(&ancestor))
            .unwrap_or(false)
    }

    /// Resolved datastream declarations, ancestors first.
    pub fn resolve(&self, model: &ModelName) -> ModelResult<&[DatastreamSpec]> {
        Ok(&self.get(model)?.datastreams)
    }

    pub fn spec(&self, model: &ModelName, datastream: &str) -> ModelResult<Option<&DatastreamSpec>> {
        Ok(self.resolve(model)?.iter().find(|s| s.name == datastream))
    }

    pub fn delegates(&self, model: &ModelName) -> ModelResult<&[Delegate]> {
        Ok(&self.get(model)?.delegates)
    }

    pub fn delegate(&self, model: &ModelName, attribute: &str) -> ModelResult<Option<&Delegate>> {
        Ok(self.delegates(model)?.iter().find(|d| d.attribute == attribute))
    }

    /// Validation rules, inherited rules first.
    pub fn rules(&self, model: &ModelName) -> ModelResult<&[Arc<dyn ValidationRule>]> {
        Ok(&self.get(model)?.rules)
    }

    /// Whether a presence rule applies to `attribute`.
    pub fn is_required(&self, model: &ModelName, attribute: &str) -> ModelResult<bool> {
        Ok(self
            .rules(model)?
            .iter()
            .any(|r| r.attribute() == attribute && r.requires_presence()))
    }

    /// The registered model whose URI is `uri`.
    pub fn model_for_uri(&self, uri: &str) -> Option<&ModelName> {
        self.models.keys().find(|m| m.to_uri() == uri)
    }

    fn get(&self, model: &ModelName) -> ModelResult<&ResolvedModel> {
        self.models
            .get(model)
            .ok_or_else(|| ModelError::UnknownModel(model.to_string()))
    }

    fn model_key(&self, model: &ModelName) -> ModelResult<&ModelName> {
        self.models
            .get_key_value(model)
            .map(|(k, _)| k)
            .ok_or_else(|| ModelError::UnknownModel(model.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::PresenceOf;
    use docmap_types::FieldType;

    fn registry() -> ModelRegistry {
        let mut builder = ModelRegistry::builder();
        builder
            .define("HasFile", ROOT_MODEL)
            .unwrap()
            .register("HasFile", DatastreamSpec::content("file_ds").versionable(false))
            .unwrap()
            .register("HasFile", DatastreamSpec::content("file_ds2").autocreate(false))
            .unwrap();
        builder
            .define("HasMetadata", "HasFile")
            .unwrap()
            .register(
                "HasMetadata",
                DatastreamSpec::structured("descMetadata").field("title", FieldType::String),
            )
            .unwrap()
            .register("HasMetadata", DatastreamSpec::content("file_ds").label("Override"))
            .unwrap()
            .delegate("HasMetadata", Delegate::new("title", "descMetadata"))
            .unwrap()
            .validates("HasMetadata", Arc::new(PresenceOf::new("title")))
            .unwrap();
        builder.build().unwrap()
    }

    fn name(raw: &str) -> ModelName {
        ModelName::new(raw).unwrap()
    }

    #[test]
    fn root_declares_rels_ext() {
        let registry = registry();
        let root = registry.root().clone();
        assert!(registry.is_root(&root));
        let specs = registry.resolve(&root).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, RELS_EXT);
        assert_eq!(specs[0].kind, DatastreamKind::Rdf);
    }

    #[test]
    fn resolve_is_ancestors_first_with_overrides_in_place() {
        let registry = registry();
        let names: Vec<_> = registry
            .resolve(&name("HasMetadata"))
            .unwrap()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, [RELS_EXT, "file_ds", "file_ds2", "descMetadata"]);
        let file_ds = registry.spec(&name("HasMetadata"), "file_ds").unwrap().unwrap();
        assert_eq!(file_ds.effective_label(), "Override");
        assert!(file_ds.versionable);
        // The parent keeps its own declaration.
        let parent = registry.spec(&name("HasFile"), "file_ds").unwrap().unwrap();
        assert!(!parent.versionable);
    }

    #[test]
    fn hierarchy_queries() {
        let registry = registry();
        let child = name("HasMetadata");
        let chain: Vec<_> = registry.ancestors(&child).unwrap().into_iter().map(|m| m.as_str()).collect();
        assert_eq!(chain, ["HasMetadata", "HasFile", "Base"]);
        assert!(registry.is_a(&child, &name("HasFile")));
        assert!(registry.is_a(&child, &child));
        assert!(!registry.is_a(&name("HasFile"), &child));
        assert_eq!(registry.parent(&child).unwrap(), Some(&name("HasFile")));
        assert_eq!(
            registry.model_for_uri("info:fedora/afmodel:HasFile"),
            Some(&name("HasFile"))
        );
    }

    #[test]
    fn delegates_and_rules_are_inherited() {
        let mut builder = ModelRegistry::builder();
        builder
            .define("Parent", ROOT_MODEL)
            .unwrap()
            .register("Parent", DatastreamSpec::structured("someData"))
            .unwrap()
            .delegate("Parent", Delegate::new("fubar", "someData"))
            .unwrap()
            .validates("Parent", Arc::new(PresenceOf::new("fubar")))
            .unwrap();
        builder.define("Child", "Parent").unwrap();
        let registry = builder.build().unwrap();
        let child = name("Child");
        assert!(registry.delegate(&child, "fubar").unwrap().is_some());
        assert!(registry.is_required(&child, "fubar").unwrap());
        assert!(!registry.is_required(&child, "swank").unwrap());
        assert_eq!(registry.rules(&child).unwrap().len(), 1);
    }

    #[test]
    fn unknown_models_and_bad_hierarchies() {
        let registry = registry();
        assert!(matches!(registry.model("Nope"), Err(ModelError::UnknownModel(_))));
        assert!(matches!(registry.model("not a model"), Err(ModelError::UnknownModel(_))));
        assert!(matches!(registry.resolve(&name("Nope")), Err(ModelError::UnknownModel(_))));

        let mut builder = ModelRegistry::builder();
        assert!(matches!(
            builder.register("Nope", DatastreamSpec::content("x")),
            Err(ModelError::UnknownModel(_))
        ));
        builder.define("Orphan", "Missing").unwrap();
        assert!(matches!(builder.build(), Err(ModelError::InvalidRegistry(_))));

        let mut builder = ModelRegistry::builder();
        builder.define("A", "B").unwrap().define("B", "A").unwrap();
        assert!(matches!(builder.build(), Err(ModelError::InvalidRegistry(_))));

        let mut builder = ModelRegistry::builder();
        builder.define("A", ROOT_MODEL).unwrap();
        assert!(builder.define("A", "Other").is_err());
        assert!(builder.define(ROOT_MODEL, "A").is_err());
    }

    #[test]
    fn delegate_targets_are_checked() {
        let mut builder = ModelRegistry::builder();
        builder
            .define("Bad", ROOT_MODEL)
            .unwrap()
            .register("Bad", DatastreamSpec::content("file_ds"))
            .unwrap()
            .delegate("Bad", Delegate::new("title", "file_ds"))
            .unwrap();
        assert!(matches!(builder.build(), Err(ModelError::InvalidRegistry(_))));
    }

    #[test]
    fn builds_from_toml_schema() {
        let schema = RegistrySchema::from_toml_str(
            r#"
            [[model]]
            name = "SpecModel::Basic"

            [[model.datastreams]]
            name = "someData"
            kind = "structured"
            fields = [{ name = "fubar" }, { name = "swank" }]

            [[model.delegates]]
            attribute = "fubar"
            to = "someData"

            [[model.validations]]
            rule = "length"
            attribute = "swank"
            min = 5

            [[model]]
            name = "SpecModel::Sub"
            parent = "SpecModel::Basic"
            "#,
        )
        .unwrap();
        let registry = ModelRegistry::from_schema(schema).unwrap();
        let sub = registry.model("SpecModel::Sub").unwrap();
        assert_eq!(registry.resolve(sub).unwrap().len(), 2);
        assert_eq!(registry.rules(sub).unwrap()[0].name(), "length");
        assert_eq!(sub.to_uri(), "info:fedora/afmodel:SpecModel_Sub");
    }
}
