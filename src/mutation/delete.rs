use super::{MutationManager, MutationOutcome};
use crate::core::{EntityId, StoreError, TransportError};
use crate::facade::StoreState;
use crate::transaction::{OperationId, OperationKind, OperationRecord, OperationStatus, RemovedEntity};
use tracing::{Level, event, info_span};

/// The optimistic half of a delete the server has to confirm.
#[derive(Debug, Clone)]
pub struct IssuedDelete {
    pub operation_id: OperationId,
    pub target_id: EntityId,
}

#[derive(Debug, Clone)]
pub enum DeleteIssue {
    /// Entity removed; the transport must confirm.
    Remote(IssuedDelete),
    /// A provisional entity whose create is still in flight was removed. The
    /// server never knew the id, so there is nothing to send.
    Local(EntityId),
}

impl MutationManager {
    /// Removes the entity immediately, capturing its base row so a failure
    /// can put back what the server last accepted.
    ///
    /// The delete also bumps the target's generation, which turns every
    /// in-flight update on it stale. Those updates may still be confirmed
    /// while the delete is pending; see `complete_update`.
    pub fn issue_delete(&self, state: &mut StoreState, target_id: &EntityId) -> Option<DeleteIssue> {
        let span = info_span!("store.mutation.delete", entity_id = %target_id);
        let _enter = span.enter();

        let Some(base) = state.entities.get(target_id).cloned() else {
            event!(Level::DEBUG, "delete target not found; ignored");
            return None;
        };
        let confirmed_generation = settled_generation(state, target_id);

        state.generations.advance(target_id);
        state.overlay.clear(target_id);
        state.entities.remove(target_id);
        let was_selected = state.view.selected_id.as_ref() == Some(target_id);
        state.clear_selection_of(target_id);

        if target_id.is_temporary() {
            event!(Level::DEBUG, "provisional entity removed locally");
            return Some(DeleteIssue::Local(target_id.clone()));
        }

        let generation = state.generations.current(target_id);
        let operation_id = state.operations.begin(OperationRecord::new(
            OperationKind::Delete,
            target_id.clone(),
            generation,
        ));
        state
            .operations
            .capture_removed(
                &operation_id,
                RemovedEntity::new(base, was_selected, confirmed_generation),
            );

        event!(Level::DEBUG, operation_id = %operation_id, "optimistic delete applied");
        Some(DeleteIssue::Remote(IssuedDelete {
            operation_id,
            target_id: target_id.clone(),
        }))
    }

    /// Confirms the removal, or reinserts the captured entity unless something
    /// has recreated the id in the meantime.
    pub fn complete_delete(
        &self,
        state: &mut StoreState,
        issued: IssuedDelete,
        result: Result<(), TransportError>,
    ) -> MutationOutcome {
        let span = info_span!(
            "store.mutation.delete",
            operation_id = %issued.operation_id,
            entity_id = %issued.target_id
        );
        let _enter = span.enter();

        let IssuedDelete {
            operation_id,
            target_id,
        } = issued;

        match result {
            Ok(()) => {
                state.operations.settle(&operation_id, OperationStatus::Succeeded);
                event!(Level::DEBUG, "delete confirmed");
                MutationOutcome::Applied(None)
            }
            Err(source) if source.is_not_found() => {
                // Already gone on the server: the optimistic removal stands.
                state.operations.settle(&operation_id, OperationStatus::Succeeded);
                event!(Level::DEBUG, "delete target already absent on server");
                MutationOutcome::Ignored
            }
            Err(source) => {
                let removed = state.operations.take_removed(&operation_id);
                state.operations.settle(&operation_id, OperationStatus::Failed);

                if let Some(removed) = removed
                    && !state.entities.contains(&target_id)
                {
                    state.entities.insert(removed.entity);
                    if removed.was_selected && state.view.selected_id.is_none() {
                        state.view.selected_id = Some(target_id.clone());
                    }
                }

                let error = StoreError::TransportFailure {
                    operation_id,
                    kind: OperationKind::Delete,
                    target_id,
                    source,
                };
                event!(Level::WARN, error = %error, "delete failed; entity restored");
                state
                    .operations
                    .record_failure(error.clone(), self.config.max_retained_errors);
                MutationOutcome::RolledBack(error)
            }
        }
    }
}

/// Newest generation on `target_id` that no pending update holds. Anything
/// the base row reflects was issued at or before it; pending updates issued
/// earlier can no longer replace the base when they are confirmed.
fn settled_generation(state: &StoreState, target_id: &EntityId) -> u64 {
    let pending: Vec<u64> = state
        .operations
        .pending_for(target_id, OperationKind::Update)
        .map(|record| record.generation_at_issue())
        .collect();
    (1..=state.generations.current(target_id))
        .rev()
        .find(|generation| !pending.contains(generation))
        .unwrap_or(0)
}
