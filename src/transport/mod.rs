// ============================================================================
// Transport Collaborator
// ============================================================================
//
// The store never talks to the network itself. Each mutation kind maps to one
// async call on an injected transport; calls may complete in any order
// relative to issue order and the store does not rely on any ordering.
//
// ============================================================================

pub mod manual;
pub mod memory;

pub use manual::{ManualTransport, TransportCall, TransportRequest};
pub use memory::{InMemoryTransport, InMemoryTransportConfig};

use crate::core::{Entity, EntityId, EntityPatch, NewEntity, TransportError};
use async_trait::async_trait;

pub type TransportResult<T> = std::result::Result<T, TransportError>;

#[async_trait]
pub trait CollectionTransport: Send + Sync {
    /// Creates a record and returns it under its server-assigned id.
    async fn create(&self, data: NewEntity) -> TransportResult<Entity>;

    /// Applies `patch` and returns the record as the server now has it.
    async fn update(&self, id: &EntityId, patch: EntityPatch) -> TransportResult<Entity>;

    async fn delete(&self, id: &EntityId) -> TransportResult<()>;
}
