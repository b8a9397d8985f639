use featureboard_core::{ClientId, CoreError, Rank};
use featureboard_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Rejected before any store interaction.
    #[error("validation failed: {0}")]
    Validation(#[from] CoreError),

    #[error("a feature request titled {title:?} already exists")]
    TitleConflict { title: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("priority {priority} of client {client_id} still taken after shifting")]
    RankConflictAfterRetry { client_id: ClientId, priority: Rank },

    #[error("shifting client {client_id} from {target} would push a rank past the largest priority")]
    RankOverflow { client_id: ClientId, target: Rank },

    #[error("shift of client {client_id} wrote {actual} rows, expected {expected}")]
    ShiftMismatch {
        client_id: ClientId,
        expected: usize,
        actual: usize,
    },

    /// Any store failure the engine does not repair, propagated unchanged.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// Errors an HTTP layer should report as a conflict with existing data.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::TitleConflict { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
