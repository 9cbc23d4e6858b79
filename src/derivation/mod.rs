// ============================================================================
// Derivation Engine
// ============================================================================
//
//   effective = base ⊕ overlay[id]
//   filtered  = effective.filter(search && filters)
//   sorted    = stable_sort(filtered, sort_config, tie-break = ascending id)
//   page      = sorted[page * size .. (page + 1) * size]
//
// Each stage is memoized on the versions of its inputs, never on a deep
// comparison of rows: the table and overlay carry counters bumped on every
// change, and each stage keys on the epoch of the stage before it.
//
// ============================================================================

pub mod filter;
pub mod memo;
pub mod sort;

pub use filter::{SearchQuery, filter_entities, matches_filters};
pub use memo::MemoCell;
pub use sort::{EntityComparator, SortExecutor};

use crate::core::Entity;
use crate::storage::{EntityTable, OptimisticOverlay};
use crate::view::{Filters, Pagination, SortConfig, ViewState};
use std::sync::Arc;

/// Borrowed inputs of one derivation pass.
#[derive(Debug, Clone, Copy)]
pub struct DerivationInput<'a> {
    pub table: &'a EntityTable,
    pub overlay: &'a OptimisticOverlay,
    pub view: &'a ViewState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FilterKey {
    table_version: u64,
    overlay_version: u64,
    search_query: String,
    filters: Filters,
}

/// Output of a full derivation pass.
#[derive(Debug, Clone)]
pub struct Derived {
    pub filtered: Arc<Vec<Entity>>,
    pub sorted: Arc<Vec<Entity>>,
    pub page: Arc<Vec<Entity>>,
    pub page_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DerivationStats {
    pub filtered_computations: u64,
    pub sorted_computations: u64,
    pub page_computations: u64,
}

#[derive(Debug, Default)]
pub struct DerivationEngine {
    filtered: MemoCell<FilterKey, Vec<Entity>>,
    sorted: MemoCell<(u64, SortConfig), Vec<Entity>>,
    page: MemoCell<(u64, Pagination), Vec<Entity>>,
}

impl DerivationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filtered(&mut self, input: DerivationInput<'_>) -> Arc<Vec<Entity>> {
        let key = FilterKey {
            table_version: input.table.version(),
            overlay_version: input.overlay.version(),
            search_query: input.view.search_query.clone(),
            filters: input.view.filters.clone(),
        };
        let (filtered, _) = self.filtered.get_or_compute(key, || {
            let search = SearchQuery::new(&input.view.search_query);
            filter_entities(input.table, input.overlay, &search, &input.view.filters)
        });
        filtered
    }

    pub fn sorted(&mut self, input: DerivationInput<'_>) -> Arc<Vec<Entity>> {
        let filtered = self.filtered(input);
        let key = (self.filtered.computations(), input.view.sort_config);
        let (sorted, _) = self
            .sorted
            .get_or_compute(key, || SortExecutor::sort(filtered.as_ref().clone(), &input.view.sort_config));
        sorted
    }

    /// The current page of `sorted`. A page index past the end shows the last
    /// page instead of nothing.
    pub fn page(&mut self, input: DerivationInput<'_>) -> Arc<Vec<Entity>> {
        let sorted = self.sorted(input);
        let key = (self.sorted.computations(), input.view.pagination);
        let (page, _) = self
            .page
            .get_or_compute(key, || paginate(&sorted, &input.view.pagination));
        page
    }

    pub fn derive(&mut self, input: DerivationInput<'_>) -> Derived {
        let page = self.page(input);
        let filtered = self.filtered(input);
        let sorted = self.sorted(input);
        let page_count = input.view.pagination.page_count(sorted.len());
        Derived {
            filtered,
            sorted,
            page,
            page_count,
        }
    }

    pub fn stats(&self) -> DerivationStats {
        DerivationStats {
            filtered_computations: self.filtered.computations(),
            sorted_computations: self.sorted.computations(),
            page_computations: self.page.computations(),
        }
    }
}

pub fn paginate(sorted: &[Entity], pagination: &Pagination) -> Vec<Entity> {
    let size = pagination.page_size.max(1);
    let pages = pagination.page_count(sorted.len());
    if pages == 0 {
        return Vec::new();
    }
    let page = pagination.page.min(pages - 1);
    sorted.iter().skip(page * size).take(size).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CollectionType, EntityId, EntityPatch, NewEntity};
    use crate::view::SortField;
    use chrono::Utc;

    fn table_of(names: &[(&str, &str)]) -> EntityTable {
        let mut table = EntityTable::new();
        for (id, name) in names {
            table.insert(Entity::provisional(
                EntityId::from(*id),
                &NewEntity::new(*name, CollectionType::Personal),
                "u1",
                Utc::now(),
            ));
        }
        table
    }

    #[test]
    fn test_unchanged_inputs_return_identical_results() {
        let table = table_of(&[("a", "Test A"), ("b", "Other")]);
        let overlay = OptimisticOverlay::new();
        let view = ViewState::default();
        let input = DerivationInput { table: &table, overlay: &overlay, view: &view };

        let mut engine = DerivationEngine::new();
        let first = engine.derive(input);
        let second = engine.derive(input);

        assert!(Arc::ptr_eq(&first.filtered, &second.filtered));
        assert!(Arc::ptr_eq(&first.sorted, &second.sorted));
        assert!(Arc::ptr_eq(&first.page, &second.page));
        assert_eq!(engine.stats().filtered_computations, 1);
        assert_eq!(engine.stats().sorted_computations, 1);
    }

    #[test]
    fn test_sort_change_reuses_filtered() {
        let table = table_of(&[("a", "B"), ("b", "A")]);
        let overlay = OptimisticOverlay::new();
        let mut view = ViewState::default();
        let mut engine = DerivationEngine::new();

        let first = engine.derive(DerivationInput { table: &table, overlay: &overlay, view: &view });
        view.sort_config = SortConfig::descending(SortField::Name);
        let second = engine.derive(DerivationInput { table: &table, overlay: &overlay, view: &view });

        assert!(Arc::ptr_eq(&first.filtered, &second.filtered));
        assert!(!Arc::ptr_eq(&first.sorted, &second.sorted));
        assert_eq!(second.sorted[0].name, "B");
    }

    #[test]
    fn test_overlay_change_recomputes() {
        let table = table_of(&[("a", "X")]);
        let mut overlay = OptimisticOverlay::new();
        let view = ViewState::default();
        let mut engine = DerivationEngine::new();

        let before = engine.sorted(DerivationInput { table: &table, overlay: &overlay, view: &view });
        overlay.apply(&EntityId::from("a"), &EntityPatch::new().name("Y"));
        let after = engine.sorted(DerivationInput { table: &table, overlay: &overlay, view: &view });

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after[0].name, "Y");
    }

    #[test]
    fn test_page_past_end_shows_last_page() {
        let table = table_of(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let overlay = OptimisticOverlay::new();
        let mut view = ViewState::new(2);
        view.pagination.page = 7;
        let mut engine = DerivationEngine::new();

        let derived = engine.derive(DerivationInput { table: &table, overlay: &overlay, view: &view });
        assert_eq!(derived.page_count, 2);
        assert_eq!(derived.page.len(), 1);
        assert_eq!(derived.page[0].id.as_str(), "c");
    }

    #[test]
    fn test_paginate_empty() {
        assert!(paginate(&[], &Pagination::new(10)).is_empty());
    }
}
