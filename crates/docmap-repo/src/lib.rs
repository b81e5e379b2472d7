//! Content repository boundary for docmap.
//!
//! Every digital object has a canonical representation in a versioned
//! content repository: a pid plus a set of named datastreams, each carrying
//! a byte payload and a small profile (label, MIME type, versionable flag,
//! checksum). This crate defines that boundary and ships backends for it.
//!
//! # Backends
//!
//! All backends implement the [`RepositoryClient`] trait:
//!
//! - [`InMemoryRepository`] -- `HashMap`-based repository for tests and embedding
//! - [`ShardedRepository`] -- routes each pid to one of several clients by
//!   CRC-32 of the pid
//!
//! # Design Rules
//!
//! 1. A missing object is [`RepoError::NotFound`], never an empty record.
//! 2. The repository is authoritative for the profile it returns after a
//!    write; callers adopt it rather than their requested values.
//! 3. The repository never interprets datastream payloads.

pub mod error;
pub mod memory;
pub mod record;
pub mod sharded;
pub mod traits;

pub use error::{RepoError, RepoResult};
pub use memory::InMemoryRepository;
pub use record::{checksum, DatastreamProfile, DatastreamRecord, DatastreamWrite, ObjectRecord};
pub use sharded::{shard_index, ShardedRepository};
pub use traits::RepositoryClient;
