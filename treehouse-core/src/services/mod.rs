//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod import;
pub mod logging;
pub mod migration;
mod status;

pub use import::{
    ImportService, PreviewResult, PreviewRowError, RollbackRecordError, RollbackResult,
};
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use status::{EntityCount, ImportSummary, StatusService, StatusSummary};
