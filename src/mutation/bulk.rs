use super::{DeleteIssue, IssuedCreate, MutationManager};
use crate::core::{EntityId, NewEntity};
use crate::facade::StoreState;
use std::collections::HashSet;
use tracing::{Level, event};

impl MutationManager {
    /// Issues a create copying the displayed (overlay-merged) source entity.
    pub fn issue_duplicate(&self, state: &mut StoreState, source_id: &EntityId) -> Option<IssuedCreate> {
        let Some(source) = state.effective(source_id) else {
            event!(Level::DEBUG, entity_id = %source_id, "duplicate source not found; ignored");
            return None;
        };
        let name = format!("{}{}", source.name, self.config.duplicate_suffix);
        self.issue_create(state, NewEntity::copy_of(&source, name))
    }

    /// One independent delete per distinct id. Not atomic: each id succeeds
    /// or rolls back on its own.
    pub fn issue_bulk_delete(&self, state: &mut StoreState, ids: &[EntityId]) -> Vec<DeleteIssue> {
        let mut seen = HashSet::new();
        ids.iter()
            .filter(|id| seen.insert((*id).clone()))
            .filter_map(|id| self.issue_delete(state, id))
            .collect()
    }
}
