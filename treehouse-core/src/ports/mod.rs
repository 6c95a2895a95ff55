//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces the import core depends on. The DuckDB
//! adapter implements them; tests can substitute in-memory versions.

mod entity_store;
mod lookup;

pub use entity_store::{EntityRegistry, EntityStore};
pub use lookup::{NaturalKey, ReferenceLookup};
