//! Import history domain model
//!
//! One `ImportHistory` is written per import attempt. It doubles as the
//! rollback manifest: `imported_records` lists every record the run created.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::Error;

/// Kind of data carried by an import file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportType {
    Members,
    Checkouts,
    Donations,
    Programs,
    Attendees,
    Metrics,
}

impl ImportType {
    pub const ALL: [ImportType; 6] = [
        ImportType::Members,
        ImportType::Checkouts,
        ImportType::Donations,
        ImportType::Programs,
        ImportType::Attendees,
        ImportType::Metrics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportType::Members => "members",
            ImportType::Checkouts => "checkouts",
            ImportType::Donations => "donations",
            ImportType::Programs => "programs",
            ImportType::Attendees => "attendees",
            ImportType::Metrics => "metrics",
        }
    }
}

impl fmt::Display for ImportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        ImportType::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| Error::unsupported_import_type(s))
    }
}

/// Where the imported data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportSource {
    Csv,
    Knack,
    Manual,
    Api,
}

impl ImportSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportSource::Csv => "csv",
            ImportSource::Knack => "knack",
            ImportSource::Manual => "manual",
            ImportSource::Api => "api",
        }
    }
}

impl FromStr for ImportSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(ImportSource::Csv),
            "knack" => Ok(ImportSource::Knack),
            "manual" => Ok(ImportSource::Manual),
            "api" => Ok(ImportSource::Api),
            other => Err(Error::validation(format!("Unknown import source: {}", other))),
        }
    }
}

/// Lifecycle of an import run
///
/// `Pending -> Processing -> Completed | Failed`, and later
/// `Completed | Failed -> RolledBack` through a separate action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    RolledBack,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Pending => "pending",
            ImportStatus::Processing => "processing",
            ImportStatus::Completed => "completed",
            ImportStatus::Failed => "failed",
            ImportStatus::RolledBack => "rolled_back",
        }
    }

    /// True once the orchestrator is finished with the run
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ImportStatus::Pending | ImportStatus::Processing)
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ImportStatus::Pending),
            "processing" => Ok(ImportStatus::Processing),
            "completed" => Ok(ImportStatus::Completed),
            "failed" => Ok(ImportStatus::Failed),
            "rolled_back" => Ok(ImportStatus::RolledBack),
            other => Err(Error::validation(format!("Unknown import status: {}", other))),
        }
    }
}

/// Entity types an import can create; the key of the entity registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Member,
    Checkout,
    Donation,
    Program,
    Attendee,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Member => "Member",
            EntityKind::Checkout => "Checkout",
            EntityKind::Donation => "Donation",
            EntityKind::Program => "Program",
            EntityKind::Attendee => "Attendee",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    pub total_rows: i64,
    pub successful: i64,
    pub failed: i64,
    pub skipped: i64,
}

/// A row-level (or run-level, `row == 0`) failure recorded on the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportErrorEntry {
    pub row: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub error: String,
}

/// One manifest entry: a record created by the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedRecord {
    pub model: EntityKind,
    pub record_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportHistory {
    pub id: Uuid,
    pub import_type: ImportType,
    pub imported_by: String,
    pub source: ImportSource,
    pub file_name: Option<String>,
    pub stats: ImportStats,
    pub errors: Vec<ImportErrorEntry>,
    pub imported_records: Vec<ImportedRecord>,
    pub status: ImportStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportHistory {
    /// Start a new CSV import run in the `pending` state
    pub fn new(import_type: ImportType, imported_by: impl Into<String>, file_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            import_type,
            imported_by: imported_by.into(),
            source: ImportSource::Csv,
            file_name,
            stats: ImportStats::default(),
            errors: Vec::new(),
            imported_records: Vec::new(),
            status: ImportStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Record a run-level failure and close the run
    pub fn fail(&mut self, message: impl Into<String>) {
        self.errors.push(ImportErrorEntry {
            row: 0,
            data: None,
            error: message.into(),
        });
        self.status = ImportStatus::Failed;
        self.completed_at = Some(Utc::now());
    }

    pub fn complete(&mut self) {
        self.status = ImportStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    pub fn is_rolled_back(&self) -> bool {
        self.status == ImportStatus::RolledBack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_type_from_str() {
        assert_eq!("members".parse::<ImportType>().unwrap(), ImportType::Members);
        assert_eq!(" Attendees ".parse::<ImportType>().unwrap(), ImportType::Attendees);
        assert!("volunteers".parse::<ImportType>().is_err());
    }

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in [
            ImportStatus::Pending,
            ImportStatus::Processing,
            ImportStatus::Completed,
            ImportStatus::Failed,
            ImportStatus::RolledBack,
        ] {
            assert_eq!(status.as_str().parse::<ImportStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_fail_appends_row_zero_error() {
        let mut history = ImportHistory::new(ImportType::Members, "staff-1", None);
        history.fail("boom");

        assert_eq!(history.status, ImportStatus::Failed);
        assert!(history.completed_at.is_some());
        assert_eq!(history.errors.len(), 1);
        assert_eq!(history.errors[0].row, 0);
        assert_eq!(history.errors[0].error, "boom");
    }

    #[test]
    fn test_manifest_serializes_with_model_names() {
        let record = ImportedRecord {
            model: EntityKind::Member,
            record_id: Uuid::nil(),
        };
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["model"], "Member");
        assert_eq!(json["recordId"], Uuid::nil().to_string());
    }
}
