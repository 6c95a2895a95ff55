//! Status service - record counts and recent import runs

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::{EntityKind, ImportStatus, ImportType};
use crate::ports::EntityRegistry;

pub struct StatusService {
    repository: Arc<DuckDbRepository>,
    registry: EntityRegistry,
}

impl StatusService {
    pub fn new(repository: Arc<DuckDbRepository>, registry: EntityRegistry) -> Self {
        Self {
            repository,
            registry,
        }
    }

    /// Per-entity counts plus the `recent_limit` newest imports
    pub fn get_status(&self, recent_limit: usize) -> Result<StatusSummary> {
        let mut entity_counts = Vec::new();
        for kind in self.registry.kinds() {
            entity_counts.push(EntityCount {
                entity: kind,
                count: self.registry.store(kind)?.count()?,
            });
        }

        let recent_imports = self
            .repository
            .list_import_histories(recent_limit)?
            .into_iter()
            .map(|h| ImportSummary {
                id: h.id.to_string(),
                import_type: h.import_type,
                imported_by: h.imported_by,
                file_name: h.file_name,
                status: h.status,
                total_rows: h.stats.total_rows,
                successful: h.stats.successful,
                failed: h.stats.failed,
                started_at: h.started_at,
            })
            .collect();

        Ok(StatusSummary {
            database: self.repository.db_path().display().to_string(),
            entity_counts,
            recent_imports,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub database: String,
    pub entity_counts: Vec<EntityCount>,
    pub recent_imports: Vec<ImportSummary>,
}

#[derive(Debug, Serialize)]
pub struct EntityCount {
    pub entity: EntityKind,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub id: String,
    pub import_type: ImportType,
    pub imported_by: String,
    pub file_name: Option<String>,
    pub status: ImportStatus,
    pub total_rows: i64,
    pub successful: i64,
    pub failed: i64,
    pub started_at: DateTime<Utc>,
}
