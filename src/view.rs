//! UI-owned parameters of derivation: search, filters, sort, selection and
//! pagination.

use crate::core::{CollectionType, EntityId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    /// Empty means no restriction.
    #[serde(rename = "type")]
    pub kinds: BTreeSet<CollectionType>,
    /// Empty means no restriction; otherwise at least one must match.
    pub tags: BTreeSet<String>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: CollectionType) -> Self {
        self.kinds.insert(kind);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty() && self.tags.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    Name,
    #[serde(rename = "type")]
    Kind,
    ItemCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortConfig {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    pub fn ascending(field: SortField) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn descending(field: SortField) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// Zero-based page index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn page_count(&self, total: usize) -> usize {
        total.div_ceil(self.page_size.max(1))
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(25)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub search_query: String,
    pub filters: Filters,
    pub sort_config: SortConfig,
    pub selected_id: Option<EntityId>,
    pub pagination: Pagination,
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            pagination: Pagination::new(page_size),
            ..Self::default()
        }
    }
}
