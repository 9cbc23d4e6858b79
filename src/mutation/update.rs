use super::{MutationManager, MutationOutcome};
use crate::core::{Entity, EntityId, EntityPatch, StoreError, TransportError};
use crate::facade::StoreState;
use crate::transaction::{OperationId, OperationKind, OperationRecord, OperationStatus};
use tracing::{Level, event, info_span};

/// The optimistic half of an update.
#[derive(Debug, Clone)]
pub struct IssuedUpdate {
    pub operation_id: OperationId,
    pub target_id: EntityId,
    pub generation: u64,
    pub patch: EntityPatch,
}

impl MutationManager {
    /// Bumps the target's generation and layers `patch` onto its overlay.
    ///
    /// Issues nothing for an empty patch, a temporary id (the server has no
    /// record to update yet) or a missing target.
    pub fn issue_update(
        &self,
        state: &mut StoreState,
        target_id: &EntityId,
        patch: EntityPatch,
    ) -> Option<IssuedUpdate> {
        let span = info_span!("store.mutation.update", entity_id = %target_id);
        let _enter = span.enter();

        if patch.is_empty() {
            event!(Level::DEBUG, "empty patch ignored");
            return None;
        }
        if target_id.is_temporary() {
            event!(Level::DEBUG, "update of unconfirmed entity ignored");
            return None;
        }
        if !state.entities.contains(target_id) {
            event!(Level::DEBUG, "update target not found; ignored");
            return None;
        }

        let generation = state.generations.advance(target_id);
        state.overlay.apply(target_id, &patch);
        let operation_id = state.operations.begin(OperationRecord::new(
            OperationKind::Update,
            target_id.clone(),
            generation,
        ));

        event!(Level::DEBUG, operation_id = %operation_id, generation, "optimistic update applied");
        Some(IssuedUpdate {
            operation_id,
            target_id: target_id.clone(),
            generation,
            patch,
        })
    }

    /// Reconciles an update result.
    ///
    /// Only the latest issued update for an id may touch its overlay. Any
    /// older completion, success or failure, just drops its own record.
    pub fn complete_update(
        &self,
        state: &mut StoreState,
        issued: IssuedUpdate,
        result: Result<Entity, TransportError>,
    ) -> MutationOutcome {
        let span = info_span!(
            "store.mutation.update",
            operation_id = %issued.operation_id,
            entity_id = %issued.target_id
        );
        let _enter = span.enter();

        let IssuedUpdate {
            operation_id,
            target_id,
            generation,
            ..
        } = issued;

        if !state.generations.is_current(&target_id, generation) {
            let status = if result.is_ok() {
                OperationStatus::Succeeded
            } else {
                OperationStatus::Failed
            };
            state.operations.settle(&operation_id, status);

            // A pending delete on the id rolls back to the newest confirmed update.
            if let Ok(mut confirmed) = result
                && let Some(removed) = state.operations.removed_for_mut(&target_id)
            {
                confirmed.id = target_id.clone();
                if removed.confirm(confirmed, generation) {
                    event!(
                        Level::DEBUG,
                        issued_at = generation,
                        "stale update confirmed; delete rollback snapshot refreshed"
                    );
                }
            }
            event!(
                Level::DEBUG,
                issued_at = generation,
                current = state.generations.current(&target_id),
                "stale update completion discarded"
            );
            return MutationOutcome::Superseded;
        }

        match result {
            Ok(mut confirmed) => {
                state.overlay.clear(&target_id);
                state.operations.settle(&operation_id, OperationStatus::Succeeded);
                if !state.entities.contains(&target_id) {
                    event!(Level::DEBUG, "update confirmed for vanished entity; ignored");
                    return MutationOutcome::Ignored;
                }
                confirmed.id = target_id;
                state.entities.insert(confirmed.clone());
                event!(Level::DEBUG, "update confirmed");
                MutationOutcome::Applied(Some(confirmed))
            }
            Err(source) => {
                state.overlay.clear(&target_id);
                state.operations.settle(&operation_id, OperationStatus::Failed);
                let error = StoreError::TransportFailure {
                    operation_id,
                    kind: OperationKind::Update,
                    target_id,
                    source,
                };
                event!(Level::WARN, error = %error, "update failed; overlay reverted");
                state
                    .operations
                    .record_failure(error.clone(), self.config.max_retained_errors);
                MutationOutcome::RolledBack(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::core::{CollectionType, NewEntity};
    use crate::transport::ManualTransport;
    use chrono::Utc;
    use std::sync::Arc;

    fn setup() -> (MutationManager, StoreState, Entity) {
        let manager = MutationManager::new(Arc::new(ManualTransport::new()), StoreConfig::new("u1"));
        let mut state = StoreState::default();
        let base = Entity::provisional(
            EntityId::from("abc123"),
            &NewEntity::new("X", CollectionType::Personal),
            "u1",
            Utc::now(),
        );
        state.entities.insert(base.clone());
        (manager, state, base)
    }

    fn server_view(base: &Entity, patch: &EntityPatch) -> Entity {
        patch.apply_to(base)
    }

    #[test]
    fn test_issue_applies_overlay_and_bumps_generation() {
        let (manager, mut state, base) = setup();
        let issued = manager
            .issue_update(&mut state, &base.id, EntityPatch::new().name("Bar"))
            .unwrap();

        assert_eq!(issued.generation, 1);
        assert_eq!(state.effective(&base.id).unwrap().name, "Bar");
        assert_eq!(state.entities.get(&base.id).unwrap().name, "X");
        state.check_consistency().unwrap();
    }

    #[test]
    fn test_invalid_updates_issue_nothing() {
        let (manager, mut state, base) = setup();
        assert!(manager.issue_update(&mut state, &base.id, EntityPatch::new()).is_none());
        assert!(manager
            .issue_update(&mut state, &EntityId::from("ghost"), EntityPatch::new().name("a"))
            .is_none());
        assert!(manager
            .issue_update(&mut state, &EntityId::temporary(), EntityPatch::new().name("a"))
            .is_none());
        assert_eq!(state.generations.current(&base.id), 0);
        assert!(state.operations.is_empty());
    }

    #[test]
    fn test_failure_restores_exact_base() {
        let (manager, mut state, base) = setup();
        let issued = manager
            .issue_update(&mut state, &base.id, EntityPatch::new().name("Bar").tags(["t"]))
            .unwrap();

        let outcome =
            manager.complete_update(&mut state, issued, Err(TransportError::Timeout(30_000)));
        assert!(matches!(outcome, MutationOutcome::RolledBack(_)));
        assert_eq!(state.effective(&base.id).unwrap(), base);
        assert!(state.overlay.is_empty());
        state.check_consistency().unwrap();
    }

    #[test]
    fn test_stale_success_does_not_override_newer_overlay() {
        let (manager, mut state, base) = setup();
        let first = manager
            .issue_update(&mut state, &base.id, EntityPatch::new().name("Bar"))
            .unwrap();
        let second = manager
            .issue_update(&mut state, &base.id, EntityPatch::new().name("Baz"))
            .unwrap();

        let stale = server_view(&base, &first.patch);
        assert_eq!(
            manager.complete_update(&mut state, first, Ok(stale)),
            MutationOutcome::Superseded
        );
        assert_eq!(state.effective(&base.id).unwrap().name, "Baz");
        state.check_consistency().unwrap();

        let fresh = server_view(&base, &second.patch);
        assert!(manager.complete_update(&mut state, second, Ok(fresh)).is_applied());
        assert_eq!(state.effective(&base.id).unwrap().name, "Baz");
        assert!(state.overlay.is_empty());
        assert!(state.operations.is_empty());
        state.check_consistency().unwrap();
    }

    #[test]
    fn test_stale_failure_does_not_roll_back_newer_overlay() {
        let (manager, mut state, base) = setup();
        let first = manager
            .issue_update(&mut state, &base.id, EntityPatch::new().name("Bar"))
            .unwrap();
        let _second = manager
            .issue_update(&mut state, &base.id, EntityPatch::new().name("Baz"))
            .unwrap();

        let outcome =
            manager.complete_update(&mut state, first, Err(TransportError::Network("reset".into())));
        assert_eq!(outcome, MutationOutcome::Superseded);
        assert_eq!(state.effective(&base.id).unwrap().name, "Baz");
        assert_eq!(state.operations.failures().count(), 0);
        state.check_consistency().unwrap();
    }
}
