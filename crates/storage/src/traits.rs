use featureboard_core::{
    Client, ClientId, FeatureRequest, FeatureRequestId, ProductArea, ProductAreaId, Rank,
};

use crate::error::StorageError;

/// One member of a client's rank space, as read inside a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedMember {
    pub id: FeatureRequestId,
    pub priority: Rank,
}

/// Which rows of a group a bulk priority update touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityFilter {
    AtLeast(Rank),
    Negative,
}

impl PriorityFilter {
    pub fn matches(&self, priority: i64) -> bool {
        match self {
            Self::AtLeast(rank) => priority >= rank.get(),
            Self::Negative => priority < 0,
        }
    }
}

/// How a bulk priority update rewrites each matching row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityTransform {
    /// `p -> -(p + 1)`
    NegateSuccessor,
    /// `p -> |p|`
    Absolute,
    /// `p -> p + 1`, only safe when uniqueness is checked at commit.
    Increment,
}

impl PriorityTransform {
    pub fn apply(&self, priority: i64) -> i64 {
        match self {
            Self::NegateSuccessor => -(priority + 1),
            Self::Absolute => priority.abs(),
            Self::Increment => priority + 1,
        }
    }
}

/// A single open write transaction. Dropping it without `commit` rolls back.
pub trait StoreTransaction {
    fn get_feature_request(
        &self,
        id: FeatureRequestId,
    ) -> Result<Option<FeatureRequest>, StorageError>;

    /// Every request of the client, ordered by priority.
    fn group_members(&self, client_id: ClientId) -> Result<Vec<RankedMember>, StorageError>;

    /// Queue a request for the next `flush`. Inserts when `id` is `None`.
    fn stage(&mut self, request: FeatureRequest);

    /// Write the staged requests now. On a constraint violation nothing from
    /// this flush remains applied, the transaction stays open, and the error
    /// is `StorageError::ConstraintViolation`. Staged requests are consumed
    /// either way.
    fn flush(&mut self) -> Result<Vec<FeatureRequest>, StorageError>;

    fn bulk_update_priority(
        &mut self,
        client_id: ClientId,
        filter: PriorityFilter,
        transform: PriorityTransform,
    ) -> Result<usize, StorageError>;

    /// Whether unique rules are enforced on every individual write rather
    /// than at commit.
    fn checks_constraints_immediately(&self) -> bool {
        true
    }

    fn commit(self) -> Result<(), StorageError>
    where
        Self: Sized;

    fn rollback(self) -> Result<(), StorageError>
    where
        Self: Sized;
}

pub trait Storage {
    type Transaction<'a>: StoreTransaction
    where
        Self: 'a;

    /// Open a write transaction. Concurrent writers are serialized from here
    /// until the transaction ends.
    fn begin(&mut self) -> Result<Self::Transaction<'_>, StorageError>;

    fn get_feature_request(
        &self,
        id: FeatureRequestId,
    ) -> Result<Option<FeatureRequest>, StorageError>;

    fn list_feature_requests(&self) -> Result<Vec<FeatureRequest>, StorageError>;

    fn list_client_feature_requests(
        &self,
        client_id: ClientId,
    ) -> Result<Vec<FeatureRequest>, StorageError>;

    fn insert_client(&mut self, name: &str) -> Result<Client, StorageError>;

    fn get_client(&self, id: ClientId) -> Result<Option<Client>, StorageError>;

    fn list_clients(&self) -> Result<Vec<Client>, StorageError>;

    fn insert_product_area(&mut self, name: &str) -> Result<ProductArea, StorageError>;

    fn get_product_area(&self, id: ProductAreaId) -> Result<Option<ProductArea>, StorageError>;

    fn list_product_areas(&self) -> Result<Vec<ProductArea>, StorageError>;
}
