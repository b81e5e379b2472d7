//! Error types for the index crate.

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The query string is outside the supported clause grammar.
    #[error("unsupported query {query:?}: {reason}")]
    UnsupportedQuery { query: String, reason: String },

    /// A sort clause could not be parsed.
    #[error("invalid sort clause: {0}")]
    InvalidSort(String),

    /// A document was submitted without an `id` field.
    #[error("document has no id field")]
    MissingId,

    /// The index refused or failed the request.
    #[error("index unavailable: {0}")]
    Unavailable(String),

    /// An internal lock was poisoned by a panicking writer.
    #[error("index state poisoned: {0}")]
    Poisoned(String),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
