//! Import service - CSV preview, execute, history and rollback
//!
//! Every `execute` call leaves exactly one persisted `ImportHistory` in a
//! terminal state, whether the run completed or failed.

pub mod importers;
pub mod parser;
pub mod rollback;
pub mod validation;

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::config::DEFAULT_SAMPLE_SIZE;
use crate::domain::result::Error;
use crate::domain::{ImportHistory, ImportStatus, ImportType};
use crate::ports::EntityRegistry;

use importers::{import_rows, importer_for, ImportEnv};
use parser::parse_csv;
pub use rollback::{RollbackRecordError, RollbackResult};
pub use validation::{template, template_for, validate_row, CsvTemplate, FieldKind, RowValidation};

/// Errors for one invalid row in a preview
#[derive(Debug, Clone, Serialize)]
pub struct PreviewRowError {
    pub row: usize,
    pub errors: Vec<String>,
    pub data: Value,
}

/// Result of validating a file without writing anything
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    pub errors: Vec<PreviewRowError>,
    pub sample: Vec<Value>,
    pub columns: Vec<String>,
}

pub struct ImportService {
    repository: Arc<DuckDbRepository>,
    registry: EntityRegistry,
    sample_size: usize,
}

impl ImportService {
    pub fn new(repository: Arc<DuckDbRepository>, registry: EntityRegistry) -> Self {
        Self {
            repository,
            registry,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Parse and validate every row; no writes
    pub fn preview(&self, csv_text: &str, import_type: &str) -> Result<PreviewResult> {
        let parsed = parse_csv(csv_text)?;

        let mut errors = Vec::new();
        for row in &parsed.rows {
            let validation = validate_row(row, import_type);
            if !validation.valid {
                errors.push(PreviewRowError {
                    row: row.number(),
                    errors: validation.errors,
                    data: row.to_json(),
                });
            }
        }

        let total_rows = parsed.rows.len();
        Ok(PreviewResult {
            total_rows,
            valid_rows: total_rows - errors.len(),
            invalid_rows: errors.len(),
            errors,
            sample: parsed
                .rows
                .iter()
                .take(self.sample_size)
                .map(|r| r.to_json())
                .collect(),
            columns: parsed.columns,
        })
    }

    /// Run an import and return its persisted history
    ///
    /// Row failures are recorded on the history. Run-level failures (bad CSV,
    /// no importer for the type) mark the history `failed`, persist it, and
    /// are returned as the error.
    pub fn execute(
        &self,
        csv_text: &str,
        import_type: ImportType,
        imported_by: &str,
        file_name: Option<String>,
    ) -> Result<ImportHistory> {
        let mut history = ImportHistory::new(import_type, imported_by, file_name);
        self.repository.insert_import_history(&history)?;
        info!(import_id = %history.id, import_type = %import_type, "Import started");

        match self.run(&mut history, csv_text) {
            Ok(()) => {
                history.complete();
                self.repository.update_import_history(&history)?;
                info!(
                    import_id = %history.id,
                    total = history.stats.total_rows,
                    successful = history.stats.successful,
                    failed = history.stats.failed,
                    "Import completed"
                );
                Ok(history)
            }
            Err(e) => {
                history.fail(e.to_string());
                if let Err(persist_err) = self.repository.update_import_history(&history) {
                    warn!(import_id = %history.id, error = %persist_err, "Failed to record import failure");
                }
                warn!(import_id = %history.id, error = %e, "Import failed");
                Err(e)
            }
        }
    }

    fn run(&self, history: &mut ImportHistory, csv_text: &str) -> Result<()> {
        history.status = ImportStatus::Processing;
        self.repository.update_import_history(history)?;

        let parsed = parse_csv(csv_text)?;
        history.stats.total_rows = parsed.rows.len() as i64;

        let importer = importer_for(history.import_type)
            .ok_or_else(|| Error::unsupported_import_type(history.import_type.as_str()))?;

        let env = ImportEnv {
            lookup: self.repository.as_ref(),
            registry: &self.registry,
            import_id: history.id,
        };
        let outcome = import_rows(importer.as_ref(), &parsed.rows, &env);

        history.stats = outcome.stats;
        history.errors = outcome.errors;
        history.imported_records = outcome.imported_records;
        Ok(())
    }

    /// Delete everything a run created and mark it `rolled_back`
    pub fn rollback(&self, import_id: Uuid) -> Result<RollbackResult> {
        let mut history = self
            .repository
            .get_import_history(import_id)?
            .ok_or_else(|| Error::rollback_not_found(import_id))?;

        if history.is_rolled_back() {
            return Err(Error::already_rolled_back(import_id).into());
        }

        let result = rollback::delete_manifest(&self.registry, &history.imported_records);

        history.status = ImportStatus::RolledBack;
        self.repository.update_import_history(&history)?;
        info!(
            import_id = %import_id,
            deleted = result.deleted,
            errors = result.errors.len(),
            "Import rolled back"
        );
        Ok(result)
    }

    pub fn get_history(&self, import_id: Uuid) -> Result<Option<ImportHistory>> {
        self.repository.get_import_history(import_id)
    }

    /// Most recent runs first
    pub fn list_history(&self, limit: usize) -> Result<Vec<ImportHistory>> {
        self.repository.list_import_histories(limit)
    }

    /// Header plus example row for an import type; needs no database
    pub fn template_csv(import_type: ImportType) -> String {
        template(import_type).to_csv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::stores::default_registry;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> ImportService {
        let repo = Arc::new(DuckDbRepository::new(&dir.path().join("t.duckdb")).unwrap());
        repo.ensure_schema().unwrap();
        let registry = default_registry(&repo);
        ImportService::new(repo, registry)
    }

    #[test]
    fn test_preview_sample_size() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir).with_sample_size(2);

        let csv = "name,programType\nA,event\nB,event\nC,event\n";
        let preview = service.preview(csv, "programs").unwrap();
        assert_eq!(preview.total_rows, 3);
        assert_eq!(preview.valid_rows, 3);
        assert_eq!(preview.sample.len(), 2);
        assert_eq!(preview.columns, vec!["name", "programType"]);
    }

    #[test]
    fn test_preview_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        service
            .preview("firstName,lastName,email\nAda,Lovelace,ada@example.org\n", "members")
            .unwrap();
        assert!(service.list_history(10).unwrap().is_empty());
    }

    #[test]
    fn test_preview_json_shape() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let preview = service
            .preview("firstName,lastName,email\nJane,,jane@example.com\n", "members")
            .unwrap();
        let json = serde_json::to_value(&preview).unwrap();
        assert_eq!(json["totalRows"], 1);
        assert_eq!(json["invalidRows"], 1);
        assert_eq!(json["errors"][0]["row"], 2);
        assert_eq!(json["errors"][0]["data"]["firstName"], "Jane");
    }

    #[test]
    fn test_template_csv_has_header_and_example() {
        let csv = ImportService::template_csv(ImportType::Checkouts);
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("memberEmail,bookTitle,checkoutDate"));
        assert!(lines.next().unwrap().contains("john.doe@example.com"));
    }
}
