//! Search index boundary for docmap.
//!
//! The content repository is not efficiently queryable, so every query runs
//! against a denormalized, eventually consistent search index. This crate
//! defines the client boundary, the flat document shape, the query-string
//! clause grammar shared by the finder and the index, and the injectable
//! collaborator that maps logical field keys to physical index field names.
//!
//! # Key Types
//!
//! - [`IndexClient`] -- query / add / delete / count boundary
//! - [`IndexDocument`] -- flat field → values mapping
//! - [`Query`] / [`Clause`] -- the `field:"value" AND ...` grammar
//! - [`FieldNamer`] / [`SolrizerNamer`] -- logical key + role → field name
//! - [`InMemoryIndex`] -- BTreeMap-backed index for tests and embedding

pub mod document;
pub mod error;
pub mod memory;
pub mod naming;
pub mod query;
pub mod traits;

pub use document::{IndexDocument, ID_FIELD};
pub use error::{IndexError, IndexResult};
pub use memory::InMemoryIndex;
pub use naming::{FieldNamer, IndexRole, SolrizerNamer};
pub use query::{escape_value, term_clause, Clause, Query, MATCH_ALL};
pub use traits::{IndexClient, QueryParams, QueryResponse, SortDirection, SortSpec};

#[cfg(test)]
mod tests {
    use crate::{term_clause, IndexClient, IndexDocument, InMemoryIndex, ID_FIELD};

    // -----------------------------------------------------------------------
    // Root exports
    // -----------------------------------------------------------------------

    #[test]
    fn id_lookup_through_root_exports() {
        let index = InMemoryIndex::new();
        index.add(IndexDocument::with_id("changeme:1")).unwrap();
        index.add(IndexDocument::with_id("changeme:2")).unwrap();

        assert_eq!(ID_FIELD, "id");
        assert_eq!(index.count(&term_clause(ID_FIELD, "changeme:2")).unwrap(), 1);
        assert_eq!(index.count(&term_clause(ID_FIELD, "changeme:3")).unwrap(), 0);
    }
}
