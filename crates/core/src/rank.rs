use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// A positive priority within a client's group. `Rank(1)` is the most
/// important request.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rank(i64);

impl Rank {
    pub const FIRST: Rank = Rank(1);

    pub fn new(value: i64) -> Result<Self, CoreError> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(CoreError::InvalidRank(value))
        }
    }

    pub fn get(&self) -> i64 {
        self.0
    }

    /// The rank one step further down the list.
    pub fn next(&self) -> Result<Self, CoreError> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or(CoreError::InvalidRank(self.0))
    }
}

impl TryFrom<i64> for Rank {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rank> for i64 {
    fn from(rank: Rank) -> Self {
        rank.0
    }
}

impl fmt::Debug for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rank({})", self.0)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
