// ============================================================================
// Operation Tracking Module
// ============================================================================
//
// Bookkeeping for in-flight optimistic mutations: one record per issued
// create/update/delete, the snapshots a failed delete restores, and the
// transport failures kept for the UI.
//
// ============================================================================

pub mod change;
pub mod manager;
pub mod state;

pub use change::RemovedEntity;
pub use manager::OperationState;
pub use state::{OperationId, OperationKind, OperationRecord, OperationStatus};
