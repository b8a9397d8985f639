use featureboard_core::{ClientId, FeatureRequest, FeatureRequestId, ProductAreaId, Rank};
use featureboard_engine::{Engine, EngineError};
use featureboard_storage::{SeedConfig, SqliteStorage, Storage, StorageConfig};

use crate::init_tracing;

/// An engine over a seeded store, with shorthand for the common moves.
pub struct TestBoard<S: Storage = SqliteStorage> {
    pub engine: Engine<S>,
    pub clients: Vec<ClientId>,
    pub areas: Vec<ProductAreaId>,
}

impl TestBoard<SqliteStorage> {
    pub fn new() -> Result<Self, EngineError> {
        Self::open(&StorageConfig::in_memory())
    }

    /// Open through `Engine::open`, seeding whatever `config` lists.
    pub fn open(config: &StorageConfig) -> Result<Self, EngineError> {
        init_tracing();
        Self::from_engine(Engine::open(config)?)
    }
}

impl<S: Storage> TestBoard<S> {
    /// Seed the default clients and product areas into `storage`.
    pub fn with_storage(storage: S) -> Result<Self, EngineError> {
        init_tracing();
        let mut engine = Engine::new(storage);
        engine.seed_default_data(&SeedConfig::default())?;
        Self::from_engine(engine)
    }

    fn from_engine(engine: Engine<S>) -> Result<Self, EngineError> {
        let clients = engine.list_clients()?.into_iter().map(|c| c.id).collect();
        let areas = engine.list_product_areas()?.into_iter().map(|a| a.id).collect();
        Ok(Self {
            engine,
            clients,
            areas,
        })
    }

    pub fn client(&self, index: usize) -> ClientId {
        self.clients[index]
    }

    /// An unsaved request in the first product area.
    pub fn request(
        &self,
        client_id: ClientId,
        title: &str,
        priority: i64,
    ) -> Result<FeatureRequest, EngineError> {
        Ok(FeatureRequest::new(
            client_id,
            self.areas[0],
            title,
            format!("{title} description"),
            Rank::new(priority)?,
        ))
    }

    pub fn add(
        &mut self,
        client_id: ClientId,
        title: &str,
        priority: i64,
    ) -> Result<FeatureRequest, EngineError> {
        let request = self.request(client_id, title, priority)?;
        self.engine.save_feature_request(request)
    }

    /// Add one request per title at ranks 1, 2, 3, ...
    pub fn add_dense(&mut self, client_id: ClientId, titles: &[&str]) -> Result<(), EngineError> {
        for (i, title) in titles.iter().enumerate() {
            self.add(client_id, title, i as i64 + 1)?;
        }
        Ok(())
    }

    /// Re-save an existing request at a new priority, optionally in another
    /// client's group.
    pub fn move_to(
        &mut self,
        id: FeatureRequestId,
        client_id: ClientId,
        priority: i64,
    ) -> Result<FeatureRequest, EngineError> {
        let mut request = self
            .engine
            .get_feature_request(id)?
            .ok_or_else(|| EngineError::NotFound(format!("feature request {id}")))?;
        request.client_id = client_id;
        request.priority = Rank::new(priority)?;
        self.engine.save_feature_request(request)
    }

    /// `(title, priority)` of every request of the client, by priority.
    pub fn ranks(&self, client_id: ClientId) -> Result<Vec<(String, i64)>, EngineError> {
        Ok(self
            .engine
            .list_client_feature_requests(client_id)?
            .into_iter()
            .map(|r| (r.title, r.priority.get()))
            .collect())
    }

    pub fn id_of(&self, title: &str) -> Result<FeatureRequestId, EngineError> {
        self.engine
            .list_feature_requests()?
            .into_iter()
            .find(|r| r.title == title)
            .and_then(|r| r.id)
            .ok_or_else(|| EngineError::NotFound(format!("feature request {title:?}")))
    }
}
