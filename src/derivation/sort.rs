// ============================================================================
// src/derivation/sort.rs - Deterministic Entity Sorting
// ============================================================================
//
// Design Patterns:
// - Comparator Pattern: one comparison strategy per SortConfig
//
// Guarantees:
// - Stable sort (slice::sort_by) over a total order
// - Equal sort keys fall back to ascending id, regardless of direction, so
//   rows never swap places between renders
//
// ============================================================================

use crate::core::{Entity, SortValue};
use crate::view::{SortConfig, SortDirection, SortField};
use std::cmp::Ordering;

impl SortField {
    /// Extracts the value this field sorts on.
    pub fn value_of(&self, entity: &Entity) -> SortValue {
        match self {
            SortField::Name => SortValue::Text(entity.name.clone()),
            SortField::Kind => SortValue::Kind(entity.kind),
            SortField::ItemCount => SortValue::Integer(entity.item_count),
            SortField::CreatedAt => SortValue::Timestamp(entity.created_at),
            SortField::UpdatedAt => SortValue::Timestamp(entity.updated_at),
        }
    }
}

// ============================================================================
// ENTITY COMPARATOR
// ============================================================================

pub struct EntityComparator<'a> {
    config: &'a SortConfig,
}

impl<'a> EntityComparator<'a> {
    pub fn new(config: &'a SortConfig) -> Self {
        Self { config }
    }

    pub fn compare(&self, a: &Entity, b: &Entity) -> Ordering {
        self.compare_by_key(a, b).then_with(|| a.id.cmp(&b.id))
    }

    fn compare_by_key(&self, a: &Entity, b: &Entity) -> Ordering {
        let value_a = self.config.field.value_of(a);
        let value_b = self.config.field.value_of(b);
        let ordering = value_a.compare(&value_b);

        match self.config.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

// ============================================================================
// SORT EXECUTOR
// ============================================================================

pub struct SortExecutor;

impl SortExecutor {
    pub fn sort(mut entities: Vec<Entity>, config: &SortConfig) -> Vec<Entity> {
        let comparator = EntityComparator::new(config);
        entities.sort_by(|a, b| comparator.compare(a, b));
        entities
    }

    /// Whether `entities` is already in the order `sort` would produce.
    pub fn is_sorted(entities: &[Entity], config: &SortConfig) -> bool {
        let comparator = EntityComparator::new(config);
        entities
            .windows(2)
            .all(|pair| comparator.compare(&pair[0], &pair[1]) != Ordering::Greater)
    }
}
