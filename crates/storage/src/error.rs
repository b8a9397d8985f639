use thiserror::Error;

use crate::violation::ConstraintViolation;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(ConstraintViolation),

    #[error("config error: {0}")]
    Config(String),

    #[error("core error: {0}")]
    Core(#[from] featureboard_core::CoreError),
}
