//! Result and error types for the core library

use thiserror::Error;
use uuid::Uuid;

/// Why a rollback request was refused before anything was touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackRefusal {
    NotFound,
    AlreadyRolledBack,
}

/// Core library error type
///
/// Services return `anyhow::Result`; run-level failures are raised as one of
/// these variants so callers can `downcast_ref::<Error>()` to tell them apart.
#[derive(Error, Debug)]
pub enum Error {
    #[error("CSV parse error: {0}")]
    Parse(String),

    #[error("Unsupported import type: {0}")]
    UnsupportedImportType(String),

    #[error("{}", rollback_message(.refusal, .import_id))]
    RollbackState {
        import_id: Uuid,
        refusal: RollbackRefusal,
    },

    #[error("{0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn rollback_message(refusal: &RollbackRefusal, import_id: &Uuid) -> String {
    match refusal {
        RollbackRefusal::NotFound => format!("Import {} not found", import_id),
        RollbackRefusal::AlreadyRolledBack => {
            format!("Import {} is already rolled back", import_id)
        }
    }
}

impl Error {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an unsupported import type error
    pub fn unsupported_import_type(import_type: impl Into<String>) -> Self {
        Self::UnsupportedImportType(import_type.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn rollback_not_found(import_id: Uuid) -> Self {
        Self::RollbackState {
            import_id,
            refusal: RollbackRefusal::NotFound,
        }
    }

    pub fn already_rolled_back(import_id: Uuid) -> Self {
        Self::RollbackState {
            import_id,
            refusal: RollbackRefusal::AlreadyRolledBack,
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_messages() {
        let id = Uuid::new_v4();
        assert!(Error::rollback_not_found(id).to_string().contains("not found"));
        assert!(Error::already_rolled_back(id)
            .to_string()
            .contains("already rolled back"));
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = Error::unsupported_import_type("metrics").into();
        match err.downcast_ref::<Error>() {
            Some(Error::UnsupportedImportType(t)) => assert_eq!(t, "metrics"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_message_is_verbatim() {
        let err = Error::Duplicate("Member with email a@b.org already exists".to_string());
        assert_eq!(err.to_string(), "Member with email a@b.org already exists");
    }
}
