use super::{CollectionTransport, TransportResult};
use crate::core::{Entity, EntityId, EntityPatch, NewEntity, TransportError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct InMemoryTransportConfig {
    /// Simulated round-trip time applied to every call.
    pub latency: Duration,
    /// Fail every n-th call (1-based); `None` never fails.
    pub fail_every: Option<u64>,
    /// Owner stamped on created records.
    pub owner_id: String,
}

impl Default for InMemoryTransportConfig {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            fail_every: None,
            owner_id: "server".to_string(),
        }
    }
}

impl InMemoryTransportConfig {
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn fail_every(mut self, n: u64) -> Self {
        self.fail_every = Some(n.max(1));
        self
    }

    pub fn owner_id(mut self, owner_id: &str) -> Self {
        self.owner_id = owner_id.to_string();
        self
    }
}

/// A simulated server holding records in memory.
///
/// Assigns sequential ids (`col-1`, `col-2`, …), stamps timestamps, and can
/// inject latency and failures.
pub struct InMemoryTransport {
    config: InMemoryTransportConfig,
    records: Mutex<HashMap<EntityId, Entity>>,
    failing_ids: Mutex<HashSet<EntityId>>,
    next_id: AtomicU64,
    calls: AtomicU64,
}

impl InMemoryTransport {
    pub fn new(config: InMemoryTransportConfig) -> Self {
        Self {
            config,
            records: Mutex::new(HashMap::new()),
            failing_ids: Mutex::new(HashSet::new()),
            next_id: AtomicU64::new(1),
            calls: AtomicU64::new(0),
        }
    }

    /// Seeds the server with existing records.
    pub async fn seed(&self, entities: impl IntoIterator<Item = Entity>) {
        let mut records = self.records.lock().await;
        for entity in entities {
            records.insert(entity.id.clone(), entity);
        }
    }

    /// Makes every update/delete on `id` fail until cleared.
    pub async fn fail_for(&self, id: &EntityId) {
        self.failing_ids.lock().await.insert(id.clone());
    }

    pub async fn clear_failures(&self) {
        self.failing_ids.lock().await.clear();
    }

    pub async fn records(&self) -> Vec<Entity> {
        self.records.lock().await.values().cloned().collect()
    }

    pub async fn get(&self, id: &EntityId) -> Option<Entity> {
        self.records.lock().await.get(id).cloned()
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn round_trip(&self, id: Option<&EntityId>) -> TransportResult<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
        if let Some(n) = self.config.fail_every
            && call % n == 0
        {
            return Err(TransportError::Server {
                status: 500,
                message: format!("injected failure on call {call}"),
            });
        }
        if let Some(id) = id
            && self.failing_ids.lock().await.contains(id)
        {
            return Err(TransportError::Network(format!("injected failure for '{id}'")));
        }
        Ok(())
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new(InMemoryTransportConfig::default())
    }
}

#[async_trait]
impl CollectionTransport for InMemoryTransport {
    async fn create(&self, data: NewEntity) -> TransportResult<Entity> {
        self.round_trip(None).await?;
        let id = EntityId::new(format!("col-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        let entity = Entity::provisional(id.clone(), &data, &self.config.owner_id, Utc::now());
        self.records.lock().await.insert(id, entity.clone());
        Ok(entity)
    }

    async fn update(&self, id: &EntityId, patch: EntityPatch) -> TransportResult<Entity> {
        self.round_trip(Some(id)).await?;
        let mut records = self.records.lock().await;
        let current = records.get(id).ok_or_else(|| TransportError::Server {
            status: 404,
            message: format!("collection '{id}' not found"),
        })?;
        let mut updated = patch.apply_to(current);
        updated.updated_at = Utc::now();
        records.insert(id.clone(), updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: &EntityId) -> TransportResult<()> {
        self.round_trip(Some(id)).await?;
        match self.records.lock().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(TransportError::Server {
                status: 404,
                message: format!("collection '{id}' not found"),
            }),
        }
    }
}
