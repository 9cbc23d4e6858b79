use super::MutationOutcome;
use crate::core::EntityId;
use crate::transaction::{OperationId, OperationKind};
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use std::fmt;
use tokio::task::JoinHandle;

/// A mutation whose optimistic half has already been applied.
///
/// Nothing reaches the transport until the mutation is settled (awaited
/// directly) or spawned onto the runtime. Dropping it unsettled leaves the
/// optimistic change and its pending record in place.
#[must_use = "a pending mutation does nothing until it is settled or spawned"]
pub struct PendingMutation {
    operation_id: Option<OperationId>,
    kind: OperationKind,
    target_id: EntityId,
    completion: BoxFuture<'static, MutationOutcome>,
}

impl PendingMutation {
    pub(crate) fn new(
        operation_id: Option<OperationId>,
        kind: OperationKind,
        target_id: EntityId,
        completion: BoxFuture<'static, MutationOutcome>,
    ) -> Self {
        Self {
            operation_id,
            kind,
            target_id,
            completion,
        }
    }

    /// `None` for a purely local removal that never entered operation state.
    pub fn operation_id(&self) -> Option<&OperationId> {
        self.operation_id.as_ref()
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// The id the optimistic change was applied under (temporary for creates).
    pub fn target_id(&self) -> &EntityId {
        &self.target_id
    }

    /// Runs the transport call and reconciles the result.
    pub async fn settle(self) -> MutationOutcome {
        self.completion.await
    }

    pub fn spawn(self) -> JoinHandle<MutationOutcome> {
        tokio::spawn(self.completion)
    }

    pub(crate) fn ready(kind: OperationKind, target_id: EntityId, outcome: MutationOutcome) -> Self {
        Self::new(None, kind, target_id, async move { outcome }.boxed())
    }
}

impl fmt::Debug for PendingMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingMutation")
            .field("operation_id", &self.operation_id)
            .field("kind", &self.kind)
            .field("target_id", &self.target_id)
            .finish_non_exhaustive()
    }
}

/// Settles every mutation concurrently; outcomes keep input order.
pub async fn settle_all(mutations: Vec<PendingMutation>) -> Vec<MutationOutcome> {
    join_all(mutations.into_iter().map(PendingMutation::settle)).await
}
