pub mod error;
pub mod types;
pub mod value;

pub use error::{Result, StoreError, TransportError};
pub use types::{CollectionType, Entity, EntityId, EntityPatch, NewEntity, TEMP_ID_PREFIX};
pub use value::SortValue;
