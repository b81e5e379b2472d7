use docmap_types::Pid;

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The requested object does not exist.
    #[error("object not found: {0}")]
    NotFound(Pid),

    /// The object exists but has no datastream with this name.
    #[error("datastream {name} not found on {pid}")]
    DatastreamNotFound { pid: Pid, name: String },

    /// Attempted to create an object whose pid is already taken.
    #[error("object already exists: {0}")]
    AlreadyExists(Pid),

    /// The repository refused or failed the request.
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    /// An internal lock was poisoned by a panicking writer.
    #[error("repository state poisoned: {0}")]
    Poisoned(String),

    /// The repository produced an identifier it cannot parse back.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] docmap_types::TypeError),
}

impl RepoError {
    /// Returns `true` for the object-level not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;
