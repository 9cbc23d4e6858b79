use super::action::Action;
use super::state::StoreState;
use super::subscription::{Subscriptions, SubscriptionId};
use crate::config::StoreConfig;
use crate::core::{Entity, EntityId, EntityPatch, NewEntity, Result, StoreError};
use crate::derivation::{DerivationEngine, DerivationStats, Derived};
use crate::mutation::{
    DeleteIssue, IssuedCreate, IssuedDelete, IssuedUpdate, MutationManager, MutationOutcome,
    PendingMutation,
};
use crate::transaction::{OperationId, OperationKind};
use crate::transport::CollectionTransport;
use crate::view::{Filters, SortConfig, ViewState};
use futures::FutureExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{Level, event, info_span};

struct StoreInner {
    state: Mutex<StoreState>,
    manager: MutationManager,
    derivation: Mutex<DerivationEngine>,
    subscriptions: Subscriptions,
}

/// Cheaply cloneable handle to one collection store.
///
/// Every transition runs under a single lock and is fully applied before the
/// lock is released, so no reader or listener ever sees half of one. Listeners
/// run after the lock is dropped, in transition order, and may dispatch.
///
/// # Examples
///
/// ```
/// use collection_store::{Action, CollectionType, InMemoryTransport, NewEntity, Store, StoreConfig};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let store = Store::new(Arc::new(InMemoryTransport::default()), StoreConfig::new("me")).unwrap();
/// let pending = store.dispatch(Action::CreateEntity(NewEntity::new("Reading", CollectionType::Personal)));
///
/// // Visible before the server answers, under a temporary id.
/// assert!(store.sorted()[0].id.is_temporary());
///
/// for mutation in pending {
///     assert!(mutation.settle().await.is_applied());
/// }
/// assert_eq!(store.sorted()[0].id.as_str(), "col-1");
/// # });
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    pub fn new(transport: Arc<dyn CollectionTransport>, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let state = StoreState::new(ViewState::new(config.page_size));
        event!(
            Level::INFO,
            owner_id = %config.owner_id,
            page_size = config.page_size,
            "collection store created"
        );
        Ok(Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(state),
                manager: MutationManager::new(transport, config),
                derivation: Mutex::new(DerivationEngine::new()),
                subscriptions: Subscriptions::default(),
            }),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        self.inner.manager.config()
    }

    /// An immutable snapshot of the whole state.
    pub fn get_state(&self) -> StoreState {
        self.lock_state().clone()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreState) + Send + Sync + 'static,
    {
        self.inner.subscriptions.subscribe(Arc::new(listener))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscriptions.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.inner.subscriptions.len()
    }

    /// Applies `action` and returns the transport work it issued, if any.
    ///
    /// The optimistic effect is already visible when this returns. The
    /// returned mutations must be settled or spawned for the transport calls
    /// to happen.
    pub fn dispatch(&self, action: Action) -> Vec<PendingMutation> {
        let span = info_span!(
            "store.dispatch",
            action = action.name(),
            mutation = action.is_mutation()
        );
        let _enter = span.enter();

        match action {
            Action::CreateEntity(data) => self.create_entity(data).into_iter().collect(),
            Action::UpdateEntity { id, patch } => self.update_entity(&id, patch).into_iter().collect(),
            Action::DeleteEntity(id) => self.delete_entity(&id).into_iter().collect(),
            Action::DuplicateEntity(id) => self.duplicate_entity(&id).into_iter().collect(),
            Action::BulkDelete(ids) => self.bulk_delete(&ids),
            Action::SetSearch(query) => {
                self.set_search(query);
                Vec::new()
            }
            Action::SetFilters(filters) => {
                self.set_filters(filters);
                Vec::new()
            }
            Action::SetSort(sort) => {
                self.set_sort(sort);
                Vec::new()
            }
            Action::Select(id) => {
                self.select(id);
                Vec::new()
            }
            Action::SetPage(page) => {
                self.set_page(page);
                Vec::new()
            }
            Action::SetPageSize(size) => {
                self.set_page_size(size);
                Vec::new()
            }
            Action::Hydrate(entities) => {
                self.hydrate(entities);
                Vec::new()
            }
            Action::DismissError(operation_id) => {
                self.dismiss_error(&operation_id);
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub fn create_entity(&self, data: NewEntity) -> Option<PendingMutation> {
        let issued = self.transition(|state, manager| {
            let issued = manager.issue_create(state, data);
            let changed = issued.is_some();
            (issued, changed)
        })?;
        Some(self.pending_create(issued))
    }

    pub fn update_entity(&self, id: &EntityId, patch: EntityPatch) -> Option<PendingMutation> {
        let issued = self.transition(|state, manager| {
            let issued = manager.issue_update(state, id, patch);
            let changed = issued.is_some();
            (issued, changed)
        })?;
        Some(self.pending_update(issued))
    }

    pub fn delete_entity(&self, id: &EntityId) -> Option<PendingMutation> {
        let issue = self.transition(|state, manager| {
            let issue = manager.issue_delete(state, id);
            let changed = issue.is_some();
            (issue, changed)
        })?;
        Some(self.pending_delete(issue))
    }

    pub fn duplicate_entity(&self, source_id: &EntityId) -> Option<PendingMutation> {
        let issued = self.transition(|state, manager| {
            let issued = manager.issue_duplicate(state, source_id);
            let changed = issued.is_some();
            (issued, changed)
        })?;
        Some(self.pending_create(issued))
    }

    /// Removes every listed entity in one transition; each id then succeeds
    /// or rolls back independently.
    pub fn bulk_delete(&self, ids: &[EntityId]) -> Vec<PendingMutation> {
        let issued = self.transition(|state, manager| {
            let issued = manager.issue_bulk_delete(state, ids);
            let changed = !issued.is_empty();
            (issued, changed)
        });
        issued.into_iter().map(|issue| self.pending_delete(issue)).collect()
    }

    fn pending_create(&self, issued: IssuedCreate) -> PendingMutation {
        let store = self.clone();
        let transport = self.inner.manager.transport();
        let operation_id = issued.operation_id.clone();
        let temp_id = issued.temp_id.clone();

        let completion = async move {
            let result = transport.create(issued.data.clone()).await;
            store.transition(|state, manager| (manager.complete_create(state, issued, result), true))
        };
        PendingMutation::new(Some(operation_id), OperationKind::Create, temp_id, completion.boxed())
    }

    fn pending_update(&self, issued: IssuedUpdate) -> PendingMutation {
        let store = self.clone();
        let transport = self.inner.manager.transport();
        let operation_id = issued.operation_id.clone();
        let target_id = issued.target_id.clone();

        let completion = async move {
            let result = transport.update(&issued.target_id, issued.patch.clone()).await;
            store.transition(|state, manager| (manager.complete_update(state, issued, result), true))
        };
        PendingMutation::new(Some(operation_id), OperationKind::Update, target_id, completion.boxed())
    }

    fn pending_delete(&self, issue: DeleteIssue) -> PendingMutation {
        match issue {
            DeleteIssue::Local(id) => {
                PendingMutation::ready(OperationKind::Delete, id, MutationOutcome::Applied(None))
            }
            DeleteIssue::Remote(issued) => self.pending_remote_delete(issued),
        }
    }

    fn pending_remote_delete(&self, issued: IssuedDelete) -> PendingMutation {
        let store = self.clone();
        let transport = self.inner.manager.transport();
        let operation_id = issued.operation_id.clone();
        let target_id = issued.target_id.clone();

        let completion = async move {
            let result = transport.delete(&issued.target_id).await;
            store.transition(|state, manager| (manager.complete_delete(state, issued, result), true))
        };
        PendingMutation::new(Some(operation_id), OperationKind::Delete, target_id, completion.boxed())
    }

    // ------------------------------------------------------------------
    // View state
    // ------------------------------------------------------------------

    /// Changing the query sends the view back to the first page.
    pub fn set_search(&self, query: impl Into<String>) {
        let query = query.into();
        self.transition(|state, _| {
            if state.view.search_query == query {
                return ((), false);
            }
            state.view.search_query = query;
            state.view.pagination.page = 0;
            ((), true)
        });
    }

    pub fn set_filters(&self, filters: Filters) {
        self.transition(|state, _| {
            if state.view.filters == filters {
                return ((), false);
            }
            state.view.filters = filters;
            state.view.pagination.page = 0;
            ((), true)
        });
    }

    pub fn set_sort(&self, sort: SortConfig) {
        self.transition(|state, _| {
            if state.view.sort_config == sort {
                return ((), false);
            }
            state.view.sort_config = sort;
            ((), true)
        });
    }

    /// Selecting an id that is not in the table is ignored.
    pub fn select(&self, id: Option<EntityId>) {
        self.transition(|state, _| {
            if state.view.selected_id == id {
                return ((), false);
            }
            if let Some(target) = &id
                && !state.entities.contains(target)
            {
                event!(Level::DEBUG, entity_id = %target, "selection of unknown entity ignored");
                return ((), false);
            }
            state.view.selected_id = id;
            ((), true)
        });
    }

    pub fn set_page(&self, page: usize) {
        self.transition(|state, _| {
            if state.view.pagination.page == page {
                return ((), false);
            }
            state.view.pagination.page = page;
            ((), true)
        });
    }

    /// A zero page size is ignored. Resizing returns to the first page.
    pub fn set_page_size(&self, page_size: usize) {
        self.transition(|state, _| {
            if page_size == 0 || state.view.pagination.page_size == page_size {
                return ((), false);
            }
            state.view.pagination.page_size = page_size;
            state.view.pagination.page = 0;
            ((), true)
        });
    }

    /// Loads records fetched from the server.
    ///
    /// Temporary ids and ids with a delete in flight are skipped. A loaded
    /// record replaces the base row; any pending overlay stays on top of it.
    pub fn hydrate(&self, entities: impl IntoIterator<Item = Entity>) -> usize {
        let entities: Vec<Entity> = entities.into_iter().collect();
        self.transition(|state, _| {
            let mut loaded = 0;
            for entity in entities {
                if entity.id.is_temporary()
                    || state.operations.has_pending(&entity.id, OperationKind::Delete)
                {
                    event!(Level::DEBUG, entity_id = %entity.id, "hydrated record skipped");
                    continue;
                }
                state.entities.insert(entity);
                loaded += 1;
            }
            event!(Level::DEBUG, loaded, "records hydrated");
            (loaded, loaded > 0)
        })
    }

    pub fn dismiss_error(&self, operation_id: &OperationId) -> bool {
        self.transition(|state, _| {
            let dismissed = state.operations.dismiss_failure(operation_id);
            (dismissed, dismissed)
        })
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn entity(&self, id: &EntityId) -> Option<Entity> {
        self.lock_state().effective(id)
    }

    pub fn selected(&self) -> Option<Entity> {
        self.lock_state().selected()
    }

    /// Failures still on display, oldest first.
    pub fn errors(&self) -> Vec<StoreError> {
        self.lock_state().operations.failures().cloned().collect()
    }

    pub fn error_for(&self, operation_id: &OperationId) -> Option<StoreError> {
        self.lock_state().operations.failure(operation_id).cloned()
    }

    pub fn pending_operations(&self) -> usize {
        self.lock_state().operations.len()
    }

    pub fn filtered(&self) -> Arc<Vec<Entity>> {
        let state = self.get_state();
        self.lock_derivation().filtered(state.derivation_input())
    }

    pub fn sorted(&self) -> Arc<Vec<Entity>> {
        let state = self.get_state();
        self.lock_derivation().sorted(state.derivation_input())
    }

    pub fn page(&self) -> Arc<Vec<Entity>> {
        let state = self.get_state();
        self.lock_derivation().page(state.derivation_input())
    }

    pub fn derived(&self) -> Derived {
        let state = self.get_state();
        self.lock_derivation().derive(state.derivation_input())
    }

    pub fn derivation_stats(&self) -> DerivationStats {
        self.lock_derivation().stats()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Runs one atomic transition. `f` reports whether it changed anything;
    /// only changes bump the revision and reach listeners.
    fn transition<R>(&self, f: impl FnOnce(&mut StoreState, &MutationManager) -> (R, bool)) -> R {
        let (result, changed) = {
            let mut state = self.lock_state();
            let (result, changed) = f(&mut state, &self.inner.manager);
            if changed {
                state.revision += 1;
                if cfg!(debug_assertions)
                    && let Err(error) = state.check_consistency()
                {
                    event!(Level::ERROR, error = %error, "transition left the store inconsistent");
                    debug_assert!(false, "{error}");
                }
                self.inner.subscriptions.enqueue(state.clone());
            }
            (result, changed)
        };
        if changed {
            self.inner.subscriptions.drain();
        }
        result
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_derivation(&self) -> MutexGuard<'_, DerivationEngine> {
        self.inner.derivation.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
