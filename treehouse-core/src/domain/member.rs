//! Member domain model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A library member; adults are keyed by email, children usually have none
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Stored lowercased; unique when present
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub membership_type: Option<String>,
    /// Set on child members created from attendee rows
    pub parent_email: Option<String>,
    pub notes: Option<String>,
    /// Import run that created this member, if any
    pub import_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Member {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            phone: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            date_of_birth: None,
            membership_type: None,
            parent_email: None,
            notes: None,
            import_id: None,
            created_at: Utc::now(),
        }
    }

    /// Set the email, normalized for natural-key lookups
    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(normalize_email(email));
        self
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Emails are compared case-insensitively everywhere
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
