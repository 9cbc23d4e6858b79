// ============================================================================
// Collection Store Library
// ============================================================================
//
// Client-side store for a collection of entities mirrored from a server.
// Mutations apply optimistically and reconcile when the transport answers,
// in whatever order it answers. Search, filter, sort and pagination are
// derived views memoized on the versions of their inputs.
//
// ============================================================================

pub mod config;
pub mod core;
pub mod derivation;
pub mod facade;
pub mod mutation;
pub mod storage;
pub mod transaction;
pub mod transport;
pub mod view;

pub use config::StoreConfig;
pub use core::{
    CollectionType, Entity, EntityId, EntityPatch, NewEntity, Result, StoreError, TransportError,
};
pub use derivation::{DerivationStats, Derived};
pub use facade::{Action, Store, StoreState, SubscriptionId};
pub use mutation::{MutationOutcome, PendingMutation, settle_all};
pub use transaction::{OperationId, OperationKind};
pub use transport::{CollectionTransport, InMemoryTransport, InMemoryTransportConfig, ManualTransport};
pub use view::{Filters, Pagination, SortConfig, SortDirection, SortField, ViewState};
