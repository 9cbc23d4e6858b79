pub mod generation;
pub mod overlay;
pub mod table;

pub use generation::GenerationCounters;
pub use overlay::OptimisticOverlay;
pub use table::EntityTable;
