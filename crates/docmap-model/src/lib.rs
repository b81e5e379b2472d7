//! Object-repository mapping for docmap.
//!
//! Digital objects live in two stores: a versioned content repository that
//! holds each object's datastreams, and a search index that holds one flat
//! summary document per object. This crate maps between those stores and
//! typed, declaratively specified models.
//!
//! # Components
//!
//! - [`ModelRegistry`] -- immutable model hierarchy with inherited datastream
//!   declarations, delegated attributes, and validation rules
//! - [`Materializer`] -- builds [`DigitalObject`]s from repository records,
//!   reconciling persisted datastreams with declarations
//! - [`Datastream`] -- typed payload with `new`/`changed` tracking and save
//! - [`IndexedObject`] -- read-mostly view built only from an index document
//! - [`DocMap`] -- the facade: save/delete across both stores and the finder
//!   operations (`find`, `find_each`, `find_in_batches`, `count`, ...)
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use docmap_model::{DatastreamSpec, Delegate, DocMap, ModelRegistry, ROOT_MODEL};
//!
//! let mut builder = ModelRegistry::builder();
//! builder
//!     .define("Book", ROOT_MODEL).unwrap()
//!     .register("Book", DatastreamSpec::structured("descMetadata")).unwrap()
//!     .delegate("Book", Delegate::new("title", "descMetadata")).unwrap();
//! let docmap = DocMap::in_memory(Arc::new(builder.build().unwrap()));
//!
//! let book = docmap.create("Book", [("title", "Hydra for Dummies")]).unwrap();
//! assert_eq!(docmap.count("Book", None).unwrap(), 1);
//! assert!(!book.is_new());
//! ```

pub mod attributes;
pub mod codec;
pub mod config;
pub mod datastream;
pub mod deprecation;
pub mod docmap;
pub mod error;
pub mod finder;
pub mod indexing;
pub mod materializer;
pub mod object;
pub mod proxy;
pub mod query;
pub mod registry;
pub mod spec;
pub mod validation;

#[cfg(test)]
mod testing;

// Re-exports for convenience.
pub use attributes::{AttributeChange, AttributeValue, ChangeSet, Delegate};
pub use codec::FieldMap;
pub use config::{Credentials, DocMapConfig, IndexConfig, RepositoryConfig, RepositoryCredentials, Resolution};
pub use datastream::{Datastream, Payload};
pub use deprecation::{DeprecationObserver, RecordingDeprecations, TracingDeprecations};
pub use docmap::{DocMap, DocMapBuilder, SaveOptions};
pub use error::{ModelError, ModelResult};
pub use finder::{BatchOptions, FindOptions};
pub use indexing::{to_index_document, DatastreamSummary, IndexFields, ObjectProfile};
pub use materializer::Materializer;
pub use object::{DigitalObject, HAS_MODEL};
pub use proxy::{IndexedObject, ObjectView, ProxyState};
pub use query::{ConditionValue, Conditions, Filter, Lookup, QueryBuilder};
pub use registry::{ModelRegistry, ModelRegistryBuilder, ModelSchema, RegistrySchema, RELS_EXT, ROOT_MODEL};
pub use spec::DatastreamSpec;
pub use validation::{LengthOf, PresenceOf, RuleSchema, ValidationErrors, ValidationRule};
