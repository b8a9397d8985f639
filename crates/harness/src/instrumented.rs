use std::cell::Cell;

use featureboard_core::{
    Client, ClientId, FeatureRequest, FeatureRequestId, ProductArea, ProductAreaId,
};
use featureboard_storage::{
    PriorityFilter, PriorityTransform, RankedMember, SqliteStorage, SqliteTransaction, Storage,
    StorageError, StoreTransaction,
};
use rusqlite::ffi;

/// Where an injected store failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// After the negate bulk update has been written.
    Negate,
    /// After the flip bulk update has been written.
    Flip,
    /// Every bulk update reports the rows it would touch but writes nothing,
    /// so the retried save meets the same conflict.
    SkipShift,
}

impl FaultPoint {
    fn fires_on(&self, transform: PriorityTransform) -> bool {
        matches!(
            (self, transform),
            (Self::Negate, PriorityTransform::NegateSuccessor)
                | (Self::Flip, PriorityTransform::Absolute)
        )
    }
}

/// SQLite storage that counts transactions and bulk writes and can fail a
/// chosen shift phase.
pub struct InstrumentedStorage {
    inner: SqliteStorage,
    fault: Option<FaultPoint>,
    transactions: Cell<usize>,
    bulk_updates: Cell<usize>,
}

impl InstrumentedStorage {
    pub fn new(inner: SqliteStorage) -> Self {
        Self {
            inner,
            fault: None,
            transactions: Cell::new(0),
            bulk_updates: Cell::new(0),
        }
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Ok(Self::new(SqliteStorage::open_in_memory()?))
    }

    pub fn set_fault(&mut self, fault: Option<FaultPoint>) {
        self.fault = fault;
    }

    pub fn transactions(&self) -> usize {
        self.transactions.get()
    }

    pub fn bulk_updates(&self) -> usize {
        self.bulk_updates.get()
    }

    pub fn reset_counters(&self) {
        self.transactions.set(0);
        self.bulk_updates.set(0);
    }
}

pub struct InstrumentedTransaction<'a> {
    inner: SqliteTransaction<'a>,
    fault: Option<FaultPoint>,
    bulk_updates: &'a Cell<usize>,
    skipped_rows: usize,
}

fn injected_fault(point: FaultPoint) -> StorageError {
    StorageError::Sqlite(rusqlite::Error::SqliteFailure(
        ffi::Error::new(ffi::SQLITE_IOERR),
        Some(format!("injected fault after {point:?}")),
    ))
}

impl StoreTransaction for InstrumentedTransaction<'_> {
    fn get_feature_request(
        &self,
        id: FeatureRequestId,
    ) -> Result<Option<FeatureRequest>, StorageError> {
        self.inner.get_feature_request(id)
    }

    fn group_members(&self, client_id: ClientId) -> Result<Vec<RankedMember>, StorageError> {
        self.inner.group_members(client_id)
    }

    fn stage(&mut self, request: FeatureRequest) {
        self.inner.stage(request);
    }

    fn flush(&mut self) -> Result<Vec<FeatureRequest>, StorageError> {
        self.inner.flush()
    }

    fn bulk_update_priority(
        &mut self,
        client_id: ClientId,
        filter: PriorityFilter,
        transform: PriorityTransform,
    ) -> Result<usize, StorageError> {
        self.bulk_updates.set(self.bulk_updates.get() + 1);
        if self.fault == Some(FaultPoint::SkipShift) {
            // Nothing was negated, so the flip reports what the negate claimed.
            let rows = match filter {
                PriorityFilter::AtLeast(_) => self
                    .inner
                    .group_members(client_id)?
                    .iter()
                    .filter(|m| filter.matches(m.priority.get()))
                    .count(),
                PriorityFilter::Negative => self.skipped_rows,
            };
            self.skipped_rows = rows;
            return Ok(rows);
        }

        let changed = self.inner.bulk_update_priority(client_id, filter, transform)?;
        match self.fault {
            Some(point) if point.fires_on(transform) => Err(injected_fault(point)),
            _ => Ok(changed),
        }
    }

    fn checks_constraints_immediately(&self) -> bool {
        self.inner.checks_constraints_immediately()
    }

    fn commit(self) -> Result<(), StorageError> {
        self.inner.commit()
    }

    fn rollback(self) -> Result<(), StorageError> {
        self.inner.rollback()
    }
}

impl Storage for InstrumentedStorage {
    type Transaction<'a> = InstrumentedTransaction<'a>;

    fn begin(&mut self) -> Result<InstrumentedTransaction<'_>, StorageError> {
        let Self {
            inner,
            fault,
            transactions,
            bulk_updates,
        } = self;
        transactions.set(transactions.get() + 1);
        Ok(InstrumentedTransaction {
            inner: inner.begin()?,
            fault: *fault,
            bulk_updates,
            skipped_rows: 0,
        })
    }

    fn get_feature_request(
        &self,
        id: FeatureRequestId,
    ) -> Result<Option<FeatureRequest>, StorageError> {
        self.inner.get_feature_request(id)
    }

    fn list_feature_requests(&self) -> Result<Vec<FeatureRequest>, StorageError> {
        self.inner.list_feature_requests()
    }

    fn list_client_feature_requests(
        &self,
        client_id: ClientId,
    ) -> Result<Vec<FeatureRequest>, StorageError> {
        self.inner.list_client_feature_requests(client_id)
    }

    fn insert_client(&mut self, name: &str) -> Result<Client, StorageError> {
        self.inner.insert_client(name)
    }

    fn get_client(&self, id: ClientId) -> Result<Option<Client>, StorageError> {
        self.inner.get_client(id)
    }

    fn list_clients(&self) -> Result<Vec<Client>, StorageError> {
        self.inner.list_clients()
    }

    fn insert_product_area(&mut self, name: &str) -> Result<ProductArea, StorageError> {
        self.inner.insert_product_area(name)
    }

    fn get_product_area(&self, id: ProductAreaId) -> Result<Option<ProductArea>, StorageError> {
        self.inner.get_product_area(id)
    }

    fn list_product_areas(&self) -> Result<Vec<ProductArea>, StorageError> {
        self.inner.list_product_areas()
    }
}
