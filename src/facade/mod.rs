// ============================================================================
// Store Facade
// ============================================================================
//
// Public entry point. `Store` owns one `StoreState` behind a mutex and turns
// actions into atomic transitions:
//
//   dispatch(action)
//     └─ transition: lock → issue (optimistic) → revision += 1 → enqueue → unlock
//     └─ drain listeners
//   PendingMutation::settle()
//     └─ transport call (no lock held)
//     └─ transition: lock → complete (reconcile) → revision += 1 → enqueue → unlock
//     └─ drain listeners
//
// ============================================================================

pub mod action;
pub mod state;
pub mod store;
pub mod subscription;

pub use action::Action;
pub use state::StoreState;
pub use store::Store;
pub use subscription::{Listener, SubscriptionId};
