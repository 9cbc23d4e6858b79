// ============================================================================
// Mutation Manager
// ============================================================================
//
// Every mutation runs in two synchronous halves around one suspension point:
//
//   issue     optimistic apply + generation bump + pending record
//   (await)   transport call; the store stays fully available meanwhile
//   complete  reconcile against whatever the state has become
//
// Correctness under out-of-order completion rests on a single compare at
// completion time: an update only touches the overlay if the generation it
// was issued at is still the current one. There is no lock and no
// cancellation; a superseded call runs to completion and is discarded.
//
// ============================================================================

pub mod bulk;
pub mod create;
pub mod delete;
pub mod pending;
pub mod update;

pub use create::IssuedCreate;
pub use delete::{DeleteIssue, IssuedDelete};
pub use pending::{PendingMutation, settle_all};
pub use update::IssuedUpdate;

use crate::config::StoreConfig;
use crate::core::{Entity, StoreError};
use crate::transport::CollectionTransport;
use std::sync::Arc;

/// How a mutation ended once reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Confirmed by the transport. Carries the server record for
    /// creates/updates, `None` for deletes.
    Applied(Option<Entity>),
    /// A newer mutation owns the entity; the result was dropped without
    /// touching visible state.
    Superseded,
    /// The transport failed and the optimistic change was reverted.
    RolledBack(StoreError),
    /// The target was gone by the time the result arrived.
    Ignored,
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn error(&self) -> Option<&StoreError> {
        match self {
            Self::RolledBack(error) => Some(error),
            _ => None,
        }
    }
}

pub struct MutationManager {
    transport: Arc<dyn CollectionTransport>,
    config: StoreConfig,
}

impl MutationManager {
    pub fn new(transport: Arc<dyn CollectionTransport>, config: StoreConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> Arc<dyn CollectionTransport> {
        Arc::clone(&self.transport)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}
