// ============================================================================
// Search & Filter Predicates
// ============================================================================
//
// - Search: case-insensitive substring over name, description and every tag.
//   A blank query matches everything.
// - Filters: type ∈ filters.kinds (if non-empty) AND at least one tag in
//   filters.tags (if non-empty).
//
// ============================================================================

use crate::core::Entity;
use crate::storage::{EntityTable, OptimisticOverlay};
use crate::view::Filters;

/// A search query folded once so the per-row test does no allocation for the
/// needle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    needle: String,
}

impl SearchQuery {
    pub fn new(raw: &str) -> Self {
        Self {
            needle: raw.trim().to_lowercase(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.needle.is_empty()
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        if self.is_blank() {
            return true;
        }
        contains_folded(&entity.name, &self.needle)
            || contains_folded(&entity.description, &self.needle)
            || entity.tags.iter().any(|tag| contains_folded(tag, &self.needle))
    }
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

pub fn matches_filters(entity: &Entity, filters: &Filters) -> bool {
    let kind_ok = filters.kinds.is_empty() || filters.kinds.contains(&entity.kind);
    let tags_ok = filters.tags.is_empty() || entity.tags.iter().any(|tag| filters.tags.contains(tag));
    kind_ok && tags_ok
}

/// Effective entities (base ⊕ overlay) satisfying both search and filters,
/// in table order.
pub fn filter_entities(
    table: &EntityTable,
    overlay: &OptimisticOverlay,
    search: &SearchQuery,
    filters: &Filters,
) -> Vec<Entity> {
    table
        .values()
        .map(|base| overlay.effective(base))
        .filter(|entity| search.matches(entity) && matches_filters(entity, filters))
        .collect()
}
