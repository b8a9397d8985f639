use featureboard_core::FeatureRequest;
use featureboard_storage::{StorageError, StoreTransaction};
use tracing::{debug, warn};

use crate::classify::{Conflict, classify};
use crate::error::EngineError;
use crate::shift::{apply_shift, plan_shift};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Retried,
}

/// Save `request` in `tx`, shifting its client's ranks if its priority is
/// taken, then end the transaction.
///
/// On success the transaction is committed and the persisted request is
/// returned with its id assigned. Every error rolls the whole transaction
/// back, so no partially shifted group is ever committed. A rank conflict is
/// repaired at most once.
pub fn reassign_and_save<T: StoreTransaction>(
    mut tx: T,
    request: FeatureRequest,
) -> Result<FeatureRequest, EngineError> {
    match save_in(&mut tx, &request) {
        Ok(saved) => {
            tx.commit()?;
            debug!(
                id = ?saved.id,
                client_id = %saved.client_id,
                priority = %saved.priority,
                "feature request committed"
            );
            Ok(saved)
        }
        Err(e) => {
            warn!(error = %e, title = %request.title, "reassignment rolled back");
            if let Err(rollback_err) = tx.rollback() {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(e)
        }
    }
}

fn save_in<T: StoreTransaction>(
    tx: &mut T,
    request: &FeatureRequest,
) -> Result<FeatureRequest, EngineError> {
    if let Some(id) = request.id
        && tx.get_feature_request(id)?.is_none()
    {
        return Err(EngineError::NotFound(format!("feature request {id}")));
    }

    let mut attempt = Attempt::First;
    loop {
        tx.stage(request.clone());
        let violation = match tx.flush() {
            Ok(saved) => {
                return saved.into_iter().next().ok_or_else(|| {
                    EngineError::Storage(StorageError::NotFound(
                        "flush returned no feature request".into(),
                    ))
                });
            }
            Err(StorageError::ConstraintViolation(violation)) => violation,
            Err(e) => return Err(e.into()),
        };

        let conflict = classify(&violation);
        debug!(?conflict, ?attempt, %violation, "flush rejected");
        match (conflict, attempt) {
            (Conflict::None, _) => {
                return Err(StorageError::ConstraintViolation(violation).into());
            }
            (Conflict::Title, _) => {
                return Err(EngineError::TitleConflict {
                    title: request.title.clone(),
                });
            }
            (_, Attempt::Retried) => {
                return Err(EngineError::RankConflictAfterRetry {
                    client_id: request.client_id,
                    priority: request.priority,
                });
            }
            (_, Attempt::First) => {
                let plan = plan_shift(tx, request.client_id, request.priority)?;
                apply_shift(tx, &plan)?;
                attempt = Attempt::Retried;
            }
        }
    }
}
