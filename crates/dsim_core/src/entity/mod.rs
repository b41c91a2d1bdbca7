//! Entity types and storage.

mod model;
mod table;

pub use model::{Entity, EntityWrite, MutationMode, Properties};
pub use table::EntityTable;
