pub mod classify;
pub mod error;
pub mod reassign;
pub mod shift;

pub use classify::{Conflict, classify};
pub use error::EngineError;
pub use reassign::reassign_and_save;
pub use shift::{RankMove, ShiftPlan, ShiftStep, ShiftStrategy, apply_shift, plan_shift};

use featureboard_core::{
    Client, ClientId, CoreError, FeatureRequest, FeatureRequestId, ProductArea,
};
use featureboard_storage::{SeedConfig, SqliteStorage, Storage, StorageConfig};
use tracing::{debug, info};

/// Entry point for the service layer. Owns the store and runs each save in
/// its own write transaction.
pub struct Engine<S: Storage = SqliteStorage> {
    storage: S,
}

impl Engine<SqliteStorage> {
    /// Open the configured database, create its schema and insert the
    /// configured reference data.
    pub fn open(config: &StorageConfig) -> Result<Self, EngineError> {
        let mut engine = Self::new(SqliteStorage::open_with_config(config)?);
        engine.seed_default_data(&config.seed)?;
        Ok(engine)
    }
}

impl<S: Storage> Engine<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    // ========================================================================
    // Feature requests
    // ========================================================================

    /// Create or update a feature request, taking its requested priority and
    /// moving any request already at or after it one step down.
    pub fn save_feature_request(
        &mut self,
        request: FeatureRequest,
    ) -> Result<FeatureRequest, EngineError> {
        request.validate()?;
        debug!(
            id = ?request.id,
            client_id = %request.client_id,
            priority = %request.priority,
            "saving feature request"
        );
        let tx = self.storage.begin()?;
        reassign_and_save(tx, request)
    }

    pub fn get_feature_request(
        &self,
        id: FeatureRequestId,
    ) -> Result<Option<FeatureRequest>, EngineError> {
        Ok(self.storage.get_feature_request(id)?)
    }

    /// All requests, grouped by client and ordered by priority.
    pub fn list_feature_requests(&self) -> Result<Vec<FeatureRequest>, EngineError> {
        Ok(self.storage.list_feature_requests()?)
    }

    pub fn list_client_feature_requests(
        &self,
        client_id: ClientId,
    ) -> Result<Vec<FeatureRequest>, EngineError> {
        Ok(self.storage.list_client_feature_requests(client_id)?)
    }

    // ========================================================================
    // Reference data
    // ========================================================================

    pub fn create_client(&mut self, name: &str) -> Result<Client, EngineError> {
        require_name(name)?;
        Ok(self.storage.insert_client(name.trim())?)
    }

    pub fn get_client(&self, id: ClientId) -> Result<Option<Client>, EngineError> {
        Ok(self.storage.get_client(id)?)
    }

    pub fn list_clients(&self) -> Result<Vec<Client>, EngineError> {
        Ok(self.storage.list_clients()?)
    }

    pub fn create_product_area(&mut self, name: &str) -> Result<ProductArea, EngineError> {
        require_name(name)?;
        Ok(self.storage.insert_product_area(name.trim())?)
    }

    pub fn list_product_areas(&self) -> Result<Vec<ProductArea>, EngineError> {
        Ok(self.storage.list_product_areas()?)
    }

    /// Insert the configured clients and product areas that do not exist
    /// yet. Returns how many rows were added.
    pub fn seed_default_data(&mut self, seed: &SeedConfig) -> Result<usize, EngineError> {
        let mut added = 0;

        let clients: Vec<String> = self.storage.list_clients()?.into_iter().map(|c| c.name).collect();
        for name in seed.clients.iter().filter(|n| !clients.contains(n)) {
            self.create_client(name)?;
            added += 1;
        }

        let areas: Vec<String> = self
            .storage
            .list_product_areas()?
            .into_iter()
            .map(|a| a.name)
            .collect();
        for name in seed.product_areas.iter().filter(|n| !areas.contains(n)) {
            self.create_product_area(name)?;
            added += 1;
        }

        info!(added, "default data seeded");
        Ok(added)
    }
}

fn require_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::InvalidData("name must not be empty".into()));
    }
    Ok(())
}
