use crate::core::EntityId;

/// Per-id issue counters.
///
/// Incremented when an optimistic mutation is issued, never when one
/// completes, and never reset: entries outlive the entity so a removed and
/// recreated id cannot match a stale generation.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounters {
    counters: im::HashMap<EntityId, u64>,
}

impl GenerationCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation; ids never mutated are at 0.
    pub fn current(&self, id: &EntityId) -> u64 {
        self.counters.get(id).copied().unwrap_or(0)
    }

    pub fn advance(&mut self, id: &EntityId) -> u64 {
        let next = self.current(id) + 1;
        self.counters.insert(id.clone(), next);
        next
    }

    pub fn is_current(&self, id: &EntityId, generation: u64) -> bool {
        self.current(id) == generation
    }
}
