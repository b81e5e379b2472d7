use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid pid: {0:?}")]
    InvalidPid(String),

    #[error("invalid model name: {0:?}")]
    InvalidModelName(String),

    #[error("unknown datastream kind: {0}")]
    UnknownKind(String),

    #[error("malformed triple at line {line}: {reason}")]
    MalformedTriple { line: usize, reason: String },
}
