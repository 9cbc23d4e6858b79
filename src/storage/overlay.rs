use crate::core::{Entity, EntityId, EntityPatch};

/// Tentative field-level changes not yet confirmed by the transport.
///
/// At most one entry per id: a second optimistic update merges on top of the
/// first instead of stacking.
#[derive(Debug, Clone, Default)]
pub struct OptimisticOverlay {
    entries: im::HashMap<EntityId, EntityPatch>,
    version: u64,
}

impl OptimisticOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn apply(&mut self, id: &EntityId, patch: &EntityPatch) {
        let mut merged = self.entries.get(id).cloned().unwrap_or_default();
        merged.merge(patch);
        self.entries.insert(id.clone(), merged);
        self.version += 1;
    }

    pub fn clear(&mut self, id: &EntityId) -> Option<EntityPatch> {
        let cleared = self.entries.remove(id)?;
        self.version += 1;
        Some(cleared)
    }

    pub fn get(&self, id: &EntityId) -> Option<&EntityPatch> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `base ⊕ overlay[base.id]`.
    pub fn effective(&self, base: &Entity) -> Entity {
        match self.entries.get(&base.id) {
            Some(patch) => patch.apply_to(base),
            None => base.clone(),
        }
    }
}
