//! Logical field key → physical index field name.
//!
//! The mapping is a pure function injected wherever query strings or index
//! documents are built. There is no process-wide cache.

use docmap_types::FieldType;

/// How a field participates in the index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexRole {
    /// Tokenized, stored, multi-valued.
    StoredSearchable,
    /// Exact-match string, stored, multi-valued.
    Symbol,
    /// Single-valued, stored, usable as a sort key.
    StoredSortable,
    /// Exact-match facet values, not stored.
    Facetable,
    /// Stored only, not searchable.
    Displayable,
}

/// Maps a logical field key and role to the physical field name.
pub trait FieldNamer: Send + Sync {
    fn name(&self, key: &str, role: IndexRole, field_type: FieldType) -> String;
}

/// Dynamic-field suffix naming (`title_tesim`, `has_model_ssim`,
/// `system_create_dtsi`).
#[derive(Clone, Copy, Debug, Default)]
pub struct SolrizerNamer;

impl SolrizerNamer {
    fn suffix(role: IndexRole, field_type: FieldType) -> &'static str {
        use FieldType::*;
        match (role, field_type) {
            (IndexRole::StoredSearchable, String | Text) => "tesim",
            (IndexRole::StoredSearchable, Date) => "dtsim",
            (IndexRole::StoredSearchable, Integer) => "isim",
            (IndexRole::StoredSearchable, Boolean) => "bsi",
            (IndexRole::Symbol, _) => "ssim",
            (IndexRole::StoredSortable, String | Text) => "ssi",
            (IndexRole::StoredSortable, Date) => "dtsi",
            (IndexRole::StoredSortable, Integer) => "isi",
            (IndexRole::StoredSortable, Boolean) => "bsi",
            (IndexRole::Facetable, _) => "sim",
            (IndexRole::Displayable, _) => "ssm",
        }
    }
}

impl FieldNamer for SolrizerNamer {
    fn name(&self, key: &str, role: IndexRole, field_type: FieldType) -> String {
        format!("{key}_{}", Self::suffix(role, field_type))
    }
}
