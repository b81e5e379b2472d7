use docmap_index::IndexError;
use docmap_repo::RepoError;
use docmap_types::{DatastreamKind, Pid, TypeError};
use thiserror::Error;

use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum ModelError {
    /// No repository object exists for this pid.
    #[error("object not found: {0}")]
    NotFound(Pid),

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("invalid model registry: {0}")]
    InvalidRegistry(String),

    #[error("no datastream named {0}")]
    UnknownDatastream(String),

    #[error("datastream {0} already exists")]
    DuplicateDatastream(String),

    #[error("datastream {datastream} has no field {field}")]
    UnknownField { datastream: String, field: String },

    #[error("invalid field name: {0:?}")]
    InvalidFieldName(String),

    #[error("datastream {datastream} is {actual}, expected {expected}")]
    KindMismatch {
        datastream: String,
        expected: DatastreamKind,
        actual: DatastreamKind,
    },

    #[error("model {model} has no attribute {attribute}")]
    UnknownAttribute { model: String, attribute: String },

    #[error("cannot decode datastream {datastream}: {reason}")]
    Decode { datastream: String, reason: String },

    #[error("object is frozen")]
    Frozen,

    #[error("object must be frozen before repository access")]
    NotFrozen,

    #[error("object has not been persisted")]
    NotPersisted,

    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("repository error: {0}")]
    Repository(RepoError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("type error: {0}")]
    Type(#[from] TypeError),
}

impl From<RepoError> for ModelError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(pid) => Self::NotFound(pid),
            other => Self::Repository(other),
        }
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
