/// Optimistic mutation tests
///
/// Drives the store through a transport whose calls resolve only when the test
/// says so, to pin down behaviour under every completion order.
/// Run with: cargo test --test optimistic_mutation_tests
use chrono::{TimeZone, Utc};
use collection_store::transport::{TransportCall, TransportRequest};
use collection_store::{
    CollectionType, Entity, EntityId, EntityPatch, ManualTransport, MutationOutcome, NewEntity,
    OperationKind, Store, StoreConfig, StoreError, TransportError,
};
use std::sync::Arc;

fn record(id: &str, name: &str) -> Entity {
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mut entity = Entity::provisional(
        EntityId::from(id),
        &NewEntity::new(name, CollectionType::Shared)
            .description("seeded")
            .tags(["alpha", "beta"]),
        "owner-1",
        created,
    );
    entity.item_count = 7;
    entity
}

fn store_with(entities: Vec<Entity>) -> (Store, Arc<ManualTransport>) {
    let transport = Arc::new(ManualTransport::new());
    let store = Store::new(transport.clone(), StoreConfig::new("u1")).unwrap();
    store.hydrate(entities);
    (store, transport)
}

fn patched_name(call: &TransportCall) -> Option<String> {
    match call.request() {
        TransportRequest::Update { patch, .. } => patch.name.clone(),
        _ => None,
    }
}

fn server_error() -> TransportError {
    TransportError::Server {
        status: 500,
        message: "internal".into(),
    }
}

#[tokio::test]
async fn test_create_scenario_promotes_temporary_id() {
    let (store, transport) = store_with(vec![]);

    let pending = store
        .create_entity(NewEntity::new("Foo", CollectionType::Personal))
        .unwrap();
    let state = store.get_state();
    assert_eq!(state.entities().len(), 1);
    let placeholder = state.entities().values().next().unwrap().clone();
    assert!(placeholder.id.is_temporary());
    assert_eq!(placeholder.item_count, 0);
    assert_eq!(pending.target_id(), &placeholder.id);
    assert_eq!(pending.kind(), OperationKind::Create);

    let handle = pending.spawn();
    transport.next_call().await.accept("abc123", None);
    assert!(handle.await.unwrap().is_applied());

    let state = store.get_state();
    let ids: Vec<EntityId> = state.entities().ids().cloned().collect();
    assert_eq!(ids, vec![EntityId::from("abc123")]);
    assert!(state.entities().ids().all(|id| !id.is_temporary()));
    assert!(state.operations().is_empty());
    state.check_consistency().unwrap();
}

#[tokio::test]
async fn test_create_failure_discards_placeholder_and_keeps_error() {
    let (store, transport) = store_with(vec![]);
    let pending = store
        .create_entity(NewEntity::new("Foo", CollectionType::Personal))
        .unwrap();
    let operation_id = pending.operation_id().cloned().unwrap();

    let handle = pending.spawn();
    transport.next_call().await.fail(TransportError::Timeout(10_000));
    let outcome = handle.await.unwrap();

    assert!(matches!(outcome, MutationOutcome::RolledBack(_)));
    assert!(store.get_state().entities().is_empty());
    assert!(store.get_state().operations().is_empty());
    assert!(matches!(
        store.error_for(&operation_id),
        Some(StoreError::TransportFailure { kind: OperationKind::Create, .. })
    ));

    assert!(store.dismiss_error(&operation_id));
    assert!(store.errors().is_empty());
}

#[tokio::test]
async fn test_blank_create_is_a_noop() {
    let (store, transport) = store_with(vec![]);
    assert!(store
        .create_entity(NewEntity::new("   ", CollectionType::Personal))
        .is_none());
    assert_eq!(store.get_state().revision(), 0);
    assert_eq!(transport.parked(), 0);
}

#[tokio::test]
async fn test_rollback_restores_pre_mutation_entity() {
    let base = record("abc123", "X");
    let (store, transport) = store_with(vec![base.clone()]);

    let handle = store
        .update_entity(
            &base.id,
            EntityPatch::new()
                .name("Bar")
                .description("changed")
                .kind(CollectionType::Public)
                .tags(["gamma"]),
        )
        .unwrap()
        .spawn();
    assert_eq!(store.entity(&base.id).unwrap().name, "Bar");

    transport.next_call().await.fail(server_error());
    assert!(handle.await.unwrap().error().is_some());

    assert_eq!(store.entity(&base.id).unwrap(), base);
    assert!(store.get_state().overlay().is_empty());
    assert_eq!(store.errors().len(), 1);
}

#[tokio::test]
async fn test_stale_reconciliation_first_success_resolves_last() {
    let base = record("abc123", "X");
    let (store, transport) = store_with(vec![base.clone()]);

    let first = store
        .update_entity(&base.id, EntityPatch::new().name("Bar"))
        .unwrap()
        .spawn();
    let second = store
        .update_entity(&base.id, EntityPatch::new().name("Baz"))
        .unwrap()
        .spawn();
    assert_eq!(store.entity(&base.id).unwrap().name, "Baz");

    let mut calls = vec![transport.next_call().await, transport.next_call().await];
    calls.sort_by_key(patched_name);
    let call_baz = calls.pop().unwrap();
    let call_bar = calls.pop().unwrap();

    call_baz.accept("", Some(&base));
    assert!(second.await.unwrap().is_applied());
    call_bar.accept("", Some(&base));
    assert_eq!(first.await.unwrap(), MutationOutcome::Superseded);

    assert_eq!(store.entity(&base.id).unwrap().name, "Baz");
    assert!(store.get_state().operations().is_empty());
    assert!(store.errors().is_empty());
}

/// Resolves update A ("Bar") and update B ("Baz") in the given order, with A
/// either succeeding or failing, and returns the displayed name at the end.
async fn last_write_wins(a_resolves_first: bool, a_fails: bool) -> String {
    let base = record("abc123", "X");
    let (store, transport) = store_with(vec![base.clone()]);

    let a = store
        .update_entity(&base.id, EntityPatch::new().name("Bar"))
        .unwrap()
        .spawn();
    let b = store
        .update_entity(&base.id, EntityPatch::new().name("Baz"))
        .unwrap()
        .spawn();

    let mut calls = vec![transport.next_call().await, transport.next_call().await];
    calls.sort_by_key(patched_name);
    let call_b = calls.pop().unwrap();
    let call_a = calls.pop().unwrap();

    let resolve_a = |call: TransportCall| {
        if a_fails {
            call.fail(TransportError::Network("reset".into()));
        } else {
            call.accept("", Some(&base));
        }
    };

    if a_resolves_first {
        resolve_a(call_a);
        assert_eq!(a.await.unwrap(), MutationOutcome::Superseded);
        assert_eq!(store.entity(&base.id).unwrap().name, "Baz");
        call_b.accept("", Some(&base));
        assert!(b.await.unwrap().is_applied());
    } else {
        call_b.accept("", Some(&base));
        assert!(b.await.unwrap().is_applied());
        resolve_a(call_a);
        assert_eq!(a.await.unwrap(), MutationOutcome::Superseded);
    }

    let state = store.get_state();
    state.check_consistency().unwrap();
    assert!(state.operations().is_empty());
    assert_eq!(state.operations().failures().count(), 0);
    store.entity(&base.id).unwrap().name
}

#[tokio::test]
async fn test_last_write_wins_under_every_resolution_order() {
    for a_resolves_first in [true, false] {
        for a_fails in [true, false] {
            assert_eq!(
                last_write_wins(a_resolves_first, a_fails).await,
                "Baz",
                "a_resolves_first={a_resolves_first} a_fails={a_fails}"
            );
        }
    }
}

#[tokio::test]
async fn test_newer_update_failure_reverts_to_base_even_after_older_success() {
    let base = record("abc123", "X");
    let (store, transport) = store_with(vec![base.clone()]);

    let a = store
        .update_entity(&base.id, EntityPatch::new().name("Bar"))
        .unwrap()
        .spawn();
    let b = store
        .update_entity(&base.id, EntityPatch::new().description("only b"))
        .unwrap()
        .spawn();

    let first = transport.next_call().await;
    let second = transport.next_call().await;
    let (call_a, call_b) = if patched_name(&first).is_some() {
        (first, second)
    } else {
        (second, first)
    };

    call_a.accept("", Some(&base));
    assert_eq!(a.await.unwrap(), MutationOutcome::Superseded);
    call_b.fail(server_error());
    assert!(matches!(b.await.unwrap(), MutationOutcome::RolledBack(_)));

    // The overlay owned by the newest update carried both patches; it reverts
    // to the last confirmed base.
    assert_eq!(store.entity(&base.id).unwrap(), base);
}

#[tokio::test]
async fn test_delete_then_fail_restores_entity() {
    let base = record("abc123", "X");
    let (store, transport) = store_with(vec![base.clone(), record("other", "Y")]);
    store.select(Some(base.id.clone()));

    let handle = store.delete_entity(&base.id).unwrap().spawn();
    assert!(store.entity(&base.id).is_none());
    assert!(store.selected().is_none());

    let call = transport.next_call().await;
    assert_eq!(call.request(), &TransportRequest::Delete(base.id.clone()));
    call.fail(server_error());
    assert!(matches!(handle.await.unwrap(), MutationOutcome::RolledBack(_)));

    let state = store.get_state();
    assert_eq!(state.entities().get(&base.id), Some(&base));
    assert_eq!(state.view().selected_id, Some(base.id.clone()));
    assert_eq!(state.entities().len(), 2);
    state.check_consistency().unwrap();
}

#[tokio::test]
async fn test_delete_makes_in_flight_update_stale() {
    let base = record("abc123", "X");
    let (store, transport) = store_with(vec![base.clone()]);

    let update = store
        .update_entity(&base.id, EntityPatch::new().name("Bar"))
        .unwrap()
        .spawn();
    let update_call = transport.next_call().await;
    let delete = store.delete_entity(&base.id).unwrap().spawn();
    let delete_call = transport.next_call().await;

    update_call.accept("", Some(&base));
    assert_eq!(update.await.unwrap(), MutationOutcome::Superseded);
    assert!(store.entity(&base.id).is_none());

    delete_call.accept("", None);
    assert_eq!(delete.await.unwrap(), MutationOutcome::Applied(None));
    assert!(store.get_state().entities().is_empty());
    assert!(store.get_state().operations().is_empty());
}

#[tokio::test]
async fn test_failed_delete_then_failed_update_leaves_server_value() {
    let base = record("abc123", "X");
    let (store, transport) = store_with(vec![base.clone()]);

    let update = store
        .update_entity(&base.id, EntityPatch::new().name("Bar"))
        .unwrap()
        .spawn();
    let update_call = transport.next_call().await;
    let delete = store.delete_entity(&base.id).unwrap().spawn();
    let delete_call = transport.next_call().await;

    delete_call.fail(server_error());
    assert!(matches!(delete.await.unwrap(), MutationOutcome::RolledBack(_)));
    assert_eq!(store.entity(&base.id).unwrap().name, "X");

    update_call.fail(server_error());
    assert_eq!(update.await.unwrap(), MutationOutcome::Superseded);

    let state = store.get_state();
    assert_eq!(state.entities().get(&base.id), Some(&base));
    assert_eq!(state.effective(&base.id).unwrap().name, "X");
    assert!(state.operations().is_empty());
    state.check_consistency().unwrap();
}

#[tokio::test]
async fn test_failed_delete_restores_update_confirmed_meanwhile() {
    let base = record("abc123", "X");
    let (store, transport) = store_with(vec![base.clone()]);

    let update = store
        .update_entity(&base.id, EntityPatch::new().name("Bar"))
        .unwrap()
        .spawn();
    let update_call = transport.next_call().await;
    let delete = store.delete_entity(&base.id).unwrap().spawn();
    let delete_call = transport.next_call().await;

    update_call.accept("", Some(&base));
    assert_eq!(update.await.unwrap(), MutationOutcome::Superseded);
    assert!(store.entity(&base.id).is_none());

    delete_call.fail(server_error());
    assert!(matches!(delete.await.unwrap(), MutationOutcome::RolledBack(_)));
    assert_eq!(store.entity(&base.id).unwrap().name, "Bar");
    store.get_state().check_consistency().unwrap();
}

#[tokio::test]
async fn test_delete_not_found_on_server_is_silent() {
    let base = record("abc123", "X");
    let (store, transport) = store_with(vec![base.clone()]);

    let handle = store.delete_entity(&base.id).unwrap().spawn();
    transport.next_call().await.fail(TransportError::Server {
        status: 404,
        message: "gone".into(),
    });

    assert_eq!(handle.await.unwrap(), MutationOutcome::Ignored);
    assert!(store.entity(&base.id).is_none());
    assert!(store.errors().is_empty());
}

#[tokio::test]
async fn test_deleting_unconfirmed_create_suppresses_server_record() {
    let (store, transport) = store_with(vec![]);
    let create = store
        .create_entity(NewEntity::new("Draft", CollectionType::Personal))
        .unwrap();
    let temp_id = create.target_id().clone();
    let create = create.spawn();
    let create_call = transport.next_call().await;

    let delete = store.delete_entity(&temp_id).unwrap();
    assert!(delete.operation_id().is_none());
    assert_eq!(delete.settle().await, MutationOutcome::Applied(None));
    assert_eq!(transport.parked(), 0);

    create_call.accept("abc123", None);
    assert_eq!(create.await.unwrap(), MutationOutcome::Superseded);
    let state = store.get_state();
    assert!(state.entities().is_empty());
    assert!(state.operations().is_empty());
}

#[tokio::test]
async fn test_updates_on_unconfirmed_create_are_rejected() {
    let (store, _transport) = store_with(vec![]);
    let create = store
        .create_entity(NewEntity::new("Draft", CollectionType::Personal))
        .unwrap();
    assert!(store
        .update_entity(create.target_id(), EntityPatch::new().name("Renamed"))
        .is_none());
    assert_eq!(store.pending_operations(), 1);
}

#[tokio::test]
async fn test_promotion_remaps_selection() {
    let (store, transport) = store_with(vec![]);
    let create = store
        .create_entity(NewEntity::new("Foo", CollectionType::Personal))
        .unwrap();
    store.select(Some(create.target_id().clone()));

    let handle = create.spawn();
    transport.next_call().await.accept("abc123", None);
    handle.await.unwrap();

    assert_eq!(store.get_state().view().selected_id, Some(EntityId::from("abc123")));
    assert_eq!(store.selected().unwrap().name, "Foo");
}

#[tokio::test]
async fn test_dropped_reply_rolls_back_as_closed_transport() {
    let base = record("abc123", "X");
    let (store, transport) = store_with(vec![base.clone()]);
    let handle = store
        .update_entity(&base.id, EntityPatch::new().name("Bar"))
        .unwrap()
        .spawn();

    drop(transport.next_call().await);
    let outcome = handle.await.unwrap();
    assert!(matches!(
        outcome.error(),
        Some(StoreError::TransportFailure { source: TransportError::Closed, .. })
    ));
    assert_eq!(store.entity(&base.id).unwrap(), base);
}
