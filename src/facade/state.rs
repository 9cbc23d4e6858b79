use crate::core::{Entity, EntityId, Result, StoreError};
use crate::derivation::DerivationInput;
use crate::storage::{EntityTable, GenerationCounters, OptimisticOverlay};
use crate::transaction::{OperationKind, OperationState};
use crate::view::ViewState;

/// Everything the store owns, in one aggregate.
///
/// Cloning is O(1): every map is a persistent structure, so a clone handed to
/// a listener or returned from `Store::get_state` never observes later writes.
/// Fields are crate-private; outside the crate the state is read-only.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub(crate) entities: EntityTable,
    pub(crate) overlay: OptimisticOverlay,
    pub(crate) generations: GenerationCounters,
    pub(crate) operations: OperationState,
    pub(crate) view: ViewState,
    pub(crate) revision: u64,
}

impl StoreState {
    pub fn new(view: ViewState) -> Self {
        Self {
            view,
            ..Self::default()
        }
    }

    pub fn entities(&self) -> &EntityTable {
        &self.entities
    }

    pub fn overlay(&self) -> &OptimisticOverlay {
        &self.overlay
    }

    pub fn generations(&self) -> &GenerationCounters {
        &self.generations
    }

    pub fn operations(&self) -> &OperationState {
        &self.operations
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Number of settled transitions so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The entity as the UI should display it.
    pub fn effective(&self, id: &EntityId) -> Option<Entity> {
        self.entities.get(id).map(|base| self.overlay.effective(base))
    }

    pub fn selected(&self) -> Option<Entity> {
        self.view.selected_id.as_ref().and_then(|id| self.effective(id))
    }

    pub fn derivation_input(&self) -> DerivationInput<'_> {
        DerivationInput {
            table: &self.entities,
            overlay: &self.overlay,
            view: &self.view,
        }
    }

    pub(crate) fn clear_selection_of(&mut self, id: &EntityId) {
        if self.view.selected_id.as_ref() == Some(id) {
            self.view.selected_id = None;
        }
    }

    /// Verifies that the entity table, overlay, generations and operation
    /// state agree with each other.
    pub fn check_consistency(&self) -> Result<()> {
        for id in self.overlay.ids() {
            if !self.entities.contains(id) {
                return Err(inconsistent(format!("overlay for '{id}' has no base entity")));
            }
            let current = self.generations.current(id);
            let owned = self
                .operations
                .pending_for(id, OperationKind::Update)
                .any(|record| record.generation_at_issue() == current);
            if !owned {
                return Err(inconsistent(format!(
                    "overlay for '{id}' has no pending update at generation {current}"
                )));
            }
        }

        for record in self.operations.pending() {
            if !record.is_pending() {
                return Err(inconsistent(format!(
                    "{} is tracked but not pending",
                    record.operation_id()
                )));
            }
            let target = record.target_id();
            match record.kind() {
                OperationKind::Update => {
                    let owner = self.generations.is_current(target, record.generation_at_issue());
                    if owner && !self.overlay.contains(target) {
                        return Err(inconsistent(format!(
                            "{} owns '{target}' but no overlay exists",
                            record.operation_id()
                        )));
                    }
                }
                OperationKind::Delete => {
                    if self.entities.contains(target) {
                        return Err(inconsistent(format!(
                            "'{target}' is still present while {} deletes it",
                            record.operation_id()
                        )));
                    }
                    if !self.operations.removed().any(|(id, _)| id == record.operation_id()) {
                        return Err(inconsistent(format!(
                            "{} has no rollback snapshot",
                            record.operation_id()
                        )));
                    }
                }
                OperationKind::Create => {}
            }
        }

        for (operation_id, _) in self.operations.removed() {
            let is_delete = self
                .operations
                .get(operation_id)
                .is_some_and(|record| record.kind() == OperationKind::Delete);
            if !is_delete {
                return Err(inconsistent(format!(
                    "rollback snapshot for {operation_id} has no pending delete"
                )));
            }
        }

        for id in self.entities.ids() {
            if id.is_temporary() && !self.operations.has_pending(id, OperationKind::Create) {
                return Err(inconsistent(format!("temporary '{id}' has no pending create")));
            }
        }

        if let Some(selected) = &self.view.selected_id
            && !self.entities.contains(selected)
        {
            return Err(inconsistent(format!("selection '{selected}' does not exist")));
        }

        Ok(())
    }
}

fn inconsistent(message: String) -> StoreError {
    StoreError::Inconsistent(message)
}
