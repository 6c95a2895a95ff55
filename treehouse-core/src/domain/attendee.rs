//! Attendee domain model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A child (or adult) enrolled in a program
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub id: Uuid,
    pub program_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub parent_name: Option<String>,
    pub parent_email: Option<String>,
    pub parent_phone: Option<String>,
    /// Member record this attendee is synced to (classroom programs)
    pub member_id: Option<Uuid>,
    pub notes: Option<String>,
    pub import_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Attendee {
    pub fn new(program_id: Uuid, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            program_id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            date_of_birth: None,
            parent_name: None,
            parent_email: None,
            parent_phone: None,
            member_id: None,
            notes: None,
            import_id: None,
            created_at: Utc::now(),
        }
    }
}
