use super::{MutationManager, MutationOutcome};
use crate::core::{Entity, EntityId, NewEntity, StoreError, TransportError};
use crate::facade::StoreState;
use crate::transaction::{OperationId, OperationKind, OperationRecord, OperationStatus};
use chrono::Utc;
use tracing::{Level, event, info_span};

/// The optimistic half of a create.
#[derive(Debug, Clone)]
pub struct IssuedCreate {
    pub operation_id: OperationId,
    pub temp_id: EntityId,
    pub data: NewEntity,
}

impl MutationManager {
    /// Inserts a provisional entity under a fresh temporary id.
    ///
    /// A blank name is an invalid payload and issues nothing.
    pub fn issue_create(&self, state: &mut StoreState, data: NewEntity) -> Option<IssuedCreate> {
        if data.name.trim().is_empty() {
            event!(Level::DEBUG, "create with blank name ignored");
            return None;
        }

        let temp_id = EntityId::temporary();
        let span = info_span!("store.mutation.create", temp_id = %temp_id);
        let _enter = span.enter();

        // A fresh temporary id has never been mutated: generation 0.
        let generation = state.generations.current(&temp_id);
        let placeholder = Entity::provisional(temp_id.clone(), &data, &self.config.owner_id, Utc::now());
        state.entities.insert(placeholder);
        let operation_id = state.operations.begin(OperationRecord::new(
            OperationKind::Create,
            temp_id.clone(),
            generation,
        ));

        event!(Level::DEBUG, operation_id = %operation_id, "optimistic create applied");
        Some(IssuedCreate {
            operation_id,
            temp_id,
            data,
        })
    }

    /// Promotes the temporary entity to the server record, or discards it.
    ///
    /// If the temporary entity was removed locally while the call was in
    /// flight, the server record is not inserted.
    pub fn complete_create(
        &self,
        state: &mut StoreState,
        issued: IssuedCreate,
        result: Result<Entity, TransportError>,
    ) -> MutationOutcome {
        let span = info_span!(
            "store.mutation.create",
            operation_id = %issued.operation_id,
            temp_id = %issued.temp_id
        );
        let _enter = span.enter();

        let IssuedCreate {
            operation_id,
            temp_id,
            ..
        } = issued;
        let still_owned =
            state.operations.is_pending(&operation_id) && state.entities.contains(&temp_id);

        match result {
            Ok(confirmed) => {
                state.operations.settle(&operation_id, OperationStatus::Succeeded);
                if !still_owned {
                    event!(Level::DEBUG, "create confirmed after local removal; suppressed");
                    return MutationOutcome::Superseded;
                }

                let was_selected = state.view.selected_id.as_ref() == Some(&temp_id);
                state.entities.remove(&temp_id);
                let server_id = confirmed.id.clone();
                state.entities.insert(confirmed.clone());
                if was_selected {
                    state.view.selected_id = Some(server_id.clone());
                }

                event!(Level::DEBUG, server_id = %server_id, "create promoted to server id");
                MutationOutcome::Applied(Some(confirmed))
            }
            Err(source) => {
                state.entities.remove(&temp_id);
                state.clear_selection_of(&temp_id);
                state.operations.settle(&operation_id, OperationStatus::Failed);
                if !still_owned {
                    event!(Level::DEBUG, "create failed after local removal; nothing to revert");
                    return MutationOutcome::Superseded;
                }

                let error = StoreError::TransportFailure {
                    operation_id,
                    kind: OperationKind::Create,
                    target_id: temp_id,
                    source,
                };
                event!(Level::WARN, error = %error, "create failed; provisional entity discarded");
                state
                    .operations
                    .record_failure(error.clone(), self.config.max_retained_errors);
                MutationOutcome::RolledBack(error)
            }
        }
    }
}
