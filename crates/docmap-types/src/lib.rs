//! Foundation types for docmap.
//!
//! This crate provides the identity and structural types shared by every
//! other docmap crate: the repository's persistent identifiers, model names,
//! the small set of datastream kinds the mapping layer knows how to decode,
//! structured-field descriptors, and the RDF triple used by graph metadata.
//!
//! # Key Types
//!
//! - [`Pid`] -- Persistent identifier of a digital object (`namespace:id`)
//! - [`ModelName`] -- Name of a registered model, e.g. `SpecModel::Basic`
//! - [`DatastreamKind`] -- Content, structured (XML field) or RDF metadata
//! - [`FieldDescriptor`] -- One named, typed field of a structured schema
//! - [`Triple`] -- A single N-Triples statement

pub mod error;
pub mod identity;
pub mod kind;
pub mod triple;

pub use error::TypeError;
pub use identity::{ModelName, Pid, AFMODEL_PREFIX};
pub use kind::{DatastreamKind, FieldDescriptor, FieldType};
pub use triple::{Term, Triple};
