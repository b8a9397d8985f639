use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid rank {0}: priority must be a positive integer")]
    InvalidRank(i64),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
