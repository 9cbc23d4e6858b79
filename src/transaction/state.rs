// ============================================================================
// Operation State
// ============================================================================
//
// Every optimistic mutation is tracked by an OperationRecord from the moment
// it is issued until its transport call has been reconciled:
//
//   Pending -> Succeeded | Failed   (record is dropped once reconciled)
//
// `generation_at_issue` is what the completion compares against the live
// generation counter to tell a fresh result from a superseded one.
//
// ============================================================================

use crate::core::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    pub fn new() -> Self {
        OperationId(format!("op-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    operation_id: OperationId,
    kind: OperationKind,
    target_id: EntityId,
    generation_at_issue: u64,
    status: OperationStatus,
}

impl OperationRecord {
    pub fn new(kind: OperationKind, target_id: EntityId, generation_at_issue: u64) -> Self {
        Self {
            operation_id: OperationId::new(),
            kind,
            target_id,
            generation_at_issue,
            status: OperationStatus::Pending,
        }
    }

    pub fn operation_id(&self) -> &OperationId {
        &self.operation_id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn target_id(&self) -> &EntityId {
        &self.target_id
    }

    pub fn generation_at_issue(&self) -> u64 {
        self.generation_at_issue
    }

    pub fn status(&self) -> OperationStatus {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == OperationStatus::Pending
    }

    pub(crate) fn finish(&mut self, status: OperationStatus) {
        self.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_ids_are_unique() {
        let a = OperationId::new();
        let b = OperationId::new();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("op-"));
    }

    #[test]
    fn test_record_starts_pending() {
        let record = OperationRecord::new(OperationKind::Update, EntityId::from("abc123"), 4);
        assert!(record.is_pending());
        assert_eq!(record.generation_at_issue(), 4);
        assert_eq!(record.kind().to_string(), "update");
    }
}
