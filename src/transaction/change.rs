// ============================================================================
// Rollback Snapshots
// ============================================================================
//
// A delete has no overlay to discard on failure: the absence of the entity IS
// the optimistic state. What gets reverted is the removal itself, so the
// entity is captured synchronously before it leaves the table.
//
// The capture is the base row, never the overlay-merged view: updates still
// in flight when the delete was issued have not been accepted yet. If one of
// them is later confirmed, the confirmed record replaces the capture.
//
// ============================================================================

use crate::core::Entity;

/// The state a failed delete puts back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedEntity {
    /// Last server-accepted version of the entity.
    pub entity: Entity,
    /// Whether the entity was the current selection.
    pub was_selected: bool,
    /// Generation of the newest update already reflected in `entity`.
    pub confirmed_generation: u64,
}

impl RemovedEntity {
    pub fn new(entity: Entity, was_selected: bool, confirmed_generation: u64) -> Self {
        Self {
            entity,
            was_selected,
            confirmed_generation,
        }
    }

    /// Takes a server-confirmed update issued at `generation`, unless a newer
    /// one is already reflected.
    pub fn confirm(&mut self, entity: Entity, generation: u64) -> bool {
        if generation <= self.confirmed_generation {
            return false;
        }
        self.entity = entity;
        self.confirmed_generation = generation;
        true
    }
}
