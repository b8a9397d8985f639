//! Rank shift planning.
//!
//! Claiming rank `R` in a group moves every member at `R` or below it in the
//! list one step down (`rank + 1`). When the store checks uniqueness on every
//! row write a plain increment can collide with the next member, so the shift
//! runs in two bulk updates:
//!
//! 1. negate: `rank -> -(rank + 1)` for every member with `rank >= R`. Live
//!    ranks are positive, so no write in this phase can collide.
//! 2. flip: `rank -> |rank|` for every negative member. The targets are the
//!    distinct values `rank + 1` and no positive member holds any of them,
//!    since every positive `>= R` was negated in phase 1.
//!
//! Either phase may visit rows in any order. Phase 1 must finish first.

use featureboard_core::{ClientId, CoreError, FeatureRequestId, Rank};
use featureboard_storage::{PriorityFilter, PriorityTransform, RankedMember, StoreTransaction};
use tracing::debug;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftStrategy {
    /// Negate then flip; required under immediate constraint checking.
    TwoPhase,
    /// One bulk increment; only valid when uniqueness is checked at commit.
    SingleIncrement,
}

impl ShiftStrategy {
    pub fn for_store<T: StoreTransaction>(tx: &T) -> Self {
        if tx.checks_constraints_immediately() {
            Self::TwoPhase
        } else {
            Self::SingleIncrement
        }
    }
}

/// One bulk update and the number of rows it must touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftStep {
    pub filter: PriorityFilter,
    pub transform: PriorityTransform,
    pub expected_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankMove {
    pub id: FeatureRequestId,
    pub from: Rank,
    pub to: Rank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftPlan {
    client_id: ClientId,
    target: Rank,
    moves: Vec<RankMove>,
    steps: Vec<ShiftStep>,
}

impl ShiftPlan {
    /// Plan freeing `target` in the group made of `members`.
    pub fn compute(
        client_id: ClientId,
        target: Rank,
        members: &[RankedMember],
        strategy: ShiftStrategy,
    ) -> Result<Self, CoreError> {
        let mut moves = Vec::new();
        for member in members.iter().filter(|m| m.priority >= target) {
            moves.push(RankMove {
                id: member.id,
                from: member.priority,
                to: member.priority.next()?,
            });
        }

        let expected_rows = moves.len();
        let steps = if moves.is_empty() {
            Vec::new()
        } else {
            match strategy {
                ShiftStrategy::TwoPhase => vec![
                    ShiftStep {
                        filter: PriorityFilter::AtLeast(target),
                        transform: PriorityTransform::NegateSuccessor,
                        expected_rows,
                    },
                    ShiftStep {
                        filter: PriorityFilter::Negative,
                        transform: PriorityTransform::Absolute,
                        expected_rows,
                    },
                ],
                ShiftStrategy::SingleIncrement => vec![ShiftStep {
                    filter: PriorityFilter::AtLeast(target),
                    transform: PriorityTransform::Increment,
                    expected_rows,
                }],
            }
        };

        Ok(Self {
            client_id,
            target,
            moves,
            steps,
        })
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn target(&self) -> Rank {
        self.target
    }

    pub fn moves(&self) -> &[RankMove] {
        &self.moves
    }

    pub fn steps(&self) -> &[ShiftStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Read the group and plan the shift inside the caller's transaction.
pub fn plan_shift<T: StoreTransaction>(
    tx: &T,
    client_id: ClientId,
    target: Rank,
) -> Result<ShiftPlan, EngineError> {
    let members = tx.group_members(client_id)?;
    let plan = ShiftPlan::compute(client_id, target, &members, ShiftStrategy::for_store(tx))
        .map_err(|_| EngineError::RankOverflow { client_id, target })?;
    debug!(
        client_id = %client_id,
        target = %target,
        group_size = members.len(),
        moved = plan.moves().len(),
        "shift planned"
    );
    Ok(plan)
}

/// Run the plan's bulk updates in order. A row count that differs from the
/// plan means the group changed underneath the transaction.
pub fn apply_shift<T: StoreTransaction>(tx: &mut T, plan: &ShiftPlan) -> Result<(), EngineError> {
    for step in plan.steps() {
        let actual = tx.bulk_update_priority(plan.client_id, step.filter, step.transform)?;
        if actual != step.expected_rows {
            return Err(EngineError::ShiftMismatch {
                client_id: plan.client_id,
                expected: step.expected_rows,
                actual,
            });
        }
        debug!(client_id = %plan.client_id, transform = ?step.transform, rows = actual, "shift step applied");
    }
    Ok(())
}
