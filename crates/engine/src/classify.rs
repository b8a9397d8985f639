use featureboard_storage::{ConstraintViolation, UniqueConstraint};

/// Which of the engine's unique rules a rejected write broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// Not a rule the engine knows how to handle; the caller treats it as
    /// fatal.
    None,
    Rank,
    Title,
    RankAndTitle,
}

impl Conflict {
    pub fn involves_rank(&self) -> bool {
        matches!(self, Self::Rank | Self::RankAndTitle)
    }
}

pub fn classify(violation: &ConstraintViolation) -> Conflict {
    let rank = violation.violates(UniqueConstraint::ClientPriority);
    let title = violation.violates(UniqueConstraint::Title);
    match (rank, title) {
        (true, true) => Conflict::RankAndTitle,
        (true, false) => Conflict::Rank,
        (false, true) => Conflict::Title,
        (false, false) => Conflict::None,
    }
}
