//! Treehouse Core - CSV data import for the Treehouse operations dashboard
//!
//! This crate implements the import pipeline following hexagonal architecture:
//!
//! - **domain**: Entities created by imports (Member, Program, ...) and ImportHistory
//! - **ports**: Traits the import core depends on (EntityStore, ReferenceLookup)
//! - **services**: Preview / execute / rollback, status, audit log, migrations
//! - **adapters**: DuckDB implementations of the ports

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbRepository;
use adapters::stores::default_registry;
use config::Config;
use ports::EntityRegistry;
use services::{ImportService, StatusService};

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{EntityKind, ImportHistory, ImportStatus, ImportType, ImportedRecord};
pub use services::{EntryPoint, LogEntry, LogEvent, LoggingService};

/// Main context for Treehouse operations
///
/// Holds the database, configuration, entity registry and services.
pub struct TreehouseContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub registry: EntityRegistry,
    pub import_service: ImportService,
    pub status_service: StatusService,
}

impl TreehouseContext {
    /// Open `treehouse.duckdb` in the given directory, applying migrations
    pub fn new(treehouse_dir: &Path) -> Result<Self> {
        let config = Config::load(treehouse_dir)?;

        let db_path = treehouse_dir.join("treehouse.duckdb");
        let repository = Arc::new(DuckDbRepository::new(&db_path)?);
        repository.ensure_schema()?;

        let registry = default_registry(&repository);
        let import_service = ImportService::new(Arc::clone(&repository), registry.clone())
            .with_sample_size(config.import.sample_size);
        let status_service = StatusService::new(Arc::clone(&repository), registry.clone());

        Ok(Self {
            config,
            repository,
            registry,
            import_service,
            status_service,
        })
    }
}
