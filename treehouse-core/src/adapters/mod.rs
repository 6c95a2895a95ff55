//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for ReferenceLookup and import history persistence
//! - Per-table DuckDB stores for the EntityStore port

pub mod duckdb;
pub mod stores;
