use thiserror::Error;

/// Hard faults from a repository implementation (I/O, serialization, schema
/// drift). Soft "not found" outcomes are expressed as `Option`/`Vec`, never
/// as this error type.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("backing store error: {0}")]
    Backend(String),
    #[error("data for cm_id {0} could not be decoded")]
    Decode(i64),
}
