use super::types::EntityId;
use crate::transaction::{OperationId, OperationKind};
use thiserror::Error;

/// Failure reported by a transport collaborator.
///
/// Timeouts are the transport's business; they arrive here as an ordinary
/// failure completion like any other.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server rejected request ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    #[error("Transport closed before replying")]
    Closed,
}

impl TransportError {
    /// The server no longer has the record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Server { status: 404, .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Recoverable: the failed change has been rolled back and the failure is
    /// kept in operation state keyed by `operation_id`.
    #[error("{kind} of '{target_id}' failed ({operation_id}): {source}")]
    TransportFailure {
        operation_id: OperationId,
        kind: OperationKind,
        target_id: EntityId,
        source: TransportError,
    },

    /// Internal only. A newer mutation owns the entity, nobody is waiting on
    /// this result any more.
    #[error("Operation {0} was superseded by a newer mutation")]
    StaleSuperseded(OperationId),

    /// Target vanished under an optimistic race. Never surfaced to the UI.
    #[error("Entity '{0}' not found")]
    NotFound(EntityId),

    #[error("Inconsistent store state: {0}")]
    Inconsistent(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    /// Whether the UI should hear about this error at all.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Self::TransportFailure { .. })
    }

    pub fn operation_id(&self) -> Option<&OperationId> {
        match self {
            Self::TransportFailure { operation_id, .. } => Some(operation_id),
            Self::StaleSuperseded(operation_id) => Some(operation_id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
