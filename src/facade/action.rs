use crate::core::{Entity, EntityId, EntityPatch, NewEntity};
use crate::transaction::OperationId;
use crate::view::{Filters, SortConfig};

/// Everything a UI can ask the store to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CreateEntity(NewEntity),
    UpdateEntity { id: EntityId, patch: EntityPatch },
    DeleteEntity(EntityId),
    DuplicateEntity(EntityId),
    BulkDelete(Vec<EntityId>),

    SetSearch(String),
    SetFilters(Filters),
    SetSort(SortConfig),
    Select(Option<EntityId>),
    SetPage(usize),
    SetPageSize(usize),

    /// Loads server records, replacing any local copy with the same id.
    Hydrate(Vec<Entity>),
    DismissError(OperationId),
}

impl Action {
    /// Whether the action issues transport calls.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::CreateEntity(_)
                | Self::UpdateEntity { .. }
                | Self::DeleteEntity(_)
                | Self::DuplicateEntity(_)
                | Self::BulkDelete(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateEntity(_) => "create_entity",
            Self::UpdateEntity { .. } => "update_entity",
            Self::DeleteEntity(_) => "delete_entity",
            Self::DuplicateEntity(_) => "duplicate_entity",
            Self::BulkDelete(_) => "bulk_delete",
            Self::SetSearch(_) => "set_search",
            Self::SetFilters(_) => "set_filters",
            Self::SetSort(_) => "set_sort",
            Self::Select(_) => "select",
            Self::SetPage(_) => "set_page",
            Self::SetPageSize(_) => "set_page_size",
            Self::Hydrate(_) => "hydrate",
            Self::DismissError(_) => "dismiss_error",
        }
    }
}
