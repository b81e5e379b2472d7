//! Shared model fixtures for unit tests.

use std::sync::Arc;

use docmap_types::FieldType;

use crate::attributes::Delegate;
use crate::registry::{ModelRegistry, ROOT_MODEL};
use crate::spec::DatastreamSpec;
use crate::validation::{LengthOf, PresenceOf};

/// `HasFile`, `SpecModel::Basic`, and two children of `SpecModel::Basic`.
pub(crate) fn registry() -> Arc<ModelRegistry> {
    let mut builder = ModelRegistry::builder();
    builder
        .define("HasFile", ROOT_MODEL)
        .unwrap()
        .register("HasFile", DatastreamSpec::content("file_ds").versionable(false))
        .unwrap()
        .register("HasFile", DatastreamSpec::content("file_ds2").autocreate(false))
        .unwrap();
    builder
        .define("SpecModel::Basic", ROOT_MODEL)
        .unwrap()
        .register(
            "SpecModel::Basic",
            DatastreamSpec::structured("someData")
                .field("fubar", FieldType::String)
                .field("swank", FieldType::String)
                .field("tags", FieldType::String),
        )
        .unwrap()
        .register(
            "SpecModel::Basic",
            DatastreamSpec::structured("foo")
                .label("Foo Data")
                .field("title", FieldType::Text),
        )
        .unwrap()
        .delegate("SpecModel::Basic", Delegate::new("fubar", "someData"))
        .unwrap()
        .delegate("SpecModel::Basic", Delegate::new("swank", "someData"))
        .unwrap()
        .delegate("SpecModel::Basic", Delegate::new("tags", "someData").multiple(true))
        .unwrap();
    builder
        .define("SpecModel::Validated", "SpecModel::Basic")
        .unwrap()
        .validates("SpecModel::Validated", Arc::new(PresenceOf::new("fubar")))
        .unwrap()
        .validates("SpecModel::Validated", Arc::new(LengthOf::new("swank").min(5)))
        .unwrap();
    builder
        .define("SpecModel::Sub", "SpecModel::Basic")
        .unwrap()
        .register("SpecModel::Sub", DatastreamSpec::content("subData"))
        .unwrap();
    Arc::new(builder.build().unwrap())
}
