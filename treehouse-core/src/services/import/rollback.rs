//! Compensating deletes for an import run's manifest

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::{EntityKind, ImportedRecord};
use crate::ports::EntityRegistry;

/// A manifest entry that could not be deleted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackRecordError {
    pub model: EntityKind,
    pub record_id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollbackResult {
    pub deleted: usize,
    pub errors: Vec<RollbackRecordError>,
}

/// Delete every manifest entry, newest first
///
/// Records created by a hook (members synced from an attendee) come after
/// the record that triggered them, so reverse order removes dependents first.
pub fn delete_manifest(registry: &EntityRegistry, manifest: &[ImportedRecord]) -> RollbackResult {
    let mut result = RollbackResult::default();

    for entry in manifest.iter().rev() {
        let error = match registry.delete_by_id(entry.model, entry.record_id) {
            Ok(true) => {
                result.deleted += 1;
                continue;
            }
            Ok(false) => format!("{} {} not found", entry.model, entry.record_id),
            Err(e) => format!("{:#}", e),
        };

        warn!(model = %entry.model, record_id = %entry.record_id, error = %error, "Rollback delete failed");
        result.errors.push(RollbackRecordError {
            model: entry.model,
            record_id: entry.record_id,
            error,
        });
    }

    result
}
