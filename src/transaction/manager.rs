// ============================================================================
// Operation Bookkeeping
// ============================================================================

use super::{OperationId, OperationKind, OperationRecord, OperationStatus, RemovedEntity};
use crate::core::{EntityId, StoreError};

/// Pending operations, the removal snapshots owned by pending deletes, and
/// the transport failures surfaced to the UI.
///
/// Backed by persistent maps so a store snapshot shares structure with the
/// live state instead of copying it.
#[derive(Debug, Clone, Default)]
pub struct OperationState {
    pending: im::HashMap<OperationId, OperationRecord>,
    removed: im::HashMap<OperationId, RemovedEntity>,
    failures: im::Vector<(OperationId, StoreError)>,
}

impl OperationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, record: OperationRecord) -> OperationId {
        let operation_id = record.operation_id().clone();
        self.pending.insert(operation_id.clone(), record);
        operation_id
    }

    pub fn get(&self, operation_id: &OperationId) -> Option<&OperationRecord> {
        self.pending.get(operation_id)
    }

    pub fn is_pending(&self, operation_id: &OperationId) -> bool {
        self.pending.contains_key(operation_id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &OperationRecord> {
        self.pending.values()
    }

    pub fn pending_for<'a>(
        &'a self,
        target_id: &'a EntityId,
        kind: OperationKind,
    ) -> impl Iterator<Item = &'a OperationRecord> + 'a {
        self.pending
            .values()
            .filter(move |record| record.kind() == kind && record.target_id() == target_id)
    }

    pub fn has_pending(&self, target_id: &EntityId, kind: OperationKind) -> bool {
        self.pending_for(target_id, kind).next().is_some()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Marks the operation finished and drops it from the pending set.
    ///
    /// Any removal snapshot it owned is discarded as well; callers that need
    /// the snapshot take it first.
    pub fn settle(
        &mut self,
        operation_id: &OperationId,
        status: OperationStatus,
    ) -> Option<OperationRecord> {
        self.removed.remove(operation_id);
        let mut record = self.pending.remove(operation_id)?;
        record.finish(status);
        Some(record)
    }

    pub fn capture_removed(&mut self, operation_id: &OperationId, removed: RemovedEntity) {
        self.removed.insert(operation_id.clone(), removed);
    }

    pub fn take_removed(&mut self, operation_id: &OperationId) -> Option<RemovedEntity> {
        self.removed.remove(operation_id)
    }

    pub fn removed(&self) -> impl Iterator<Item = (&OperationId, &RemovedEntity)> {
        self.removed.iter()
    }

    /// Removal snapshot held by the pending delete of `target_id`.
    pub fn removed_for_mut(&mut self, target_id: &EntityId) -> Option<&mut RemovedEntity> {
        self.removed
            .iter_mut()
            .find(|(_, removed)| &removed.entity.id == target_id)
            .map(|(_, removed)| removed)
    }

    /// Keeps at most `retain` failures, evicting the oldest first.
    pub fn record_failure(&mut self, error: StoreError, retain: usize) {
        if !error.is_user_visible() || retain == 0 {
            return;
        }
        let Some(operation_id) = error.operation_id().cloned() else {
            return;
        };
        self.failures.push_back((operation_id, error));
        while self.failures.len() > retain {
            self.failures.pop_front();
        }
    }

    pub fn failure(&self, operation_id: &OperationId) -> Option<&StoreError> {
        self.failures
            .iter()
            .find(|(id, _)| id == operation_id)
            .map(|(_, error)| error)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StoreError> {
        self.failures.iter().map(|(_, error)| error)
    }

    pub fn dismiss_failure(&mut self, operation_id: &OperationId) -> bool {
        let before = self.failures.len();
        self.failures.retain(|(id, _)| id != operation_id);
        self.failures.len() != before
    }
}
