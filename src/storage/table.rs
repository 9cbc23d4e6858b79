use crate::core::{Entity, EntityId, EntityPatch};

/// Normalized, keyed store of base (server-confirmed or provisional) records.
///
/// Row order is meaningless here; anything that needs an order sorts
/// explicitly. `version` is bumped by every call that changes the map and by
/// nothing else, which is what derivation memoizes on.
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    rows: im::HashMap<EntityId, Entity>,
    version: u64,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Inserts or replaces the row keyed by `entity.id`.
    pub fn insert(&mut self, entity: Entity) {
        let entity = entity.normalized();
        self.rows.insert(entity.id.clone(), entity);
        self.version += 1;
    }

    /// Applies `patch` to an existing row. A missing id is a no-op: a delete
    /// may legitimately have outrun a stale update.
    pub fn patch(&mut self, id: &EntityId, patch: &EntityPatch) -> bool {
        let Some(current) = self.rows.get(id) else {
            return false;
        };
        if patch.is_empty() {
            return true;
        }
        let patched = patch.apply_to(current);
        self.rows.insert(id.clone(), patched);
        self.version += 1;
        true
    }

    pub fn remove(&mut self, id: &EntityId) -> Option<Entity> {
        let removed = self.rows.remove(id)?;
        self.version += 1;
        Some(removed)
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.rows.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.rows.contains_key(id)
    }

    /// Order-irrelevant view over every row.
    pub fn values(&self) -> impl Iterator<Item = &Entity> {
        self.rows.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.rows.keys()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
