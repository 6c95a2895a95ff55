//! Donation domain model

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A book donation; optionally linked to a member by donor email
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: Uuid,
    pub donor_name: String,
    pub donor_email: Option<String>,
    pub member_id: Option<Uuid>,
    pub donated_at: NaiveDate,
    pub number_of_books: Option<i32>,
    /// Weight in pounds
    pub weight: Option<Decimal>,
    pub book_condition: Option<String>,
    pub notes: Option<String>,
    pub import_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Donation {
    pub fn new(donor_name: impl Into<String>, donated_at: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            donor_name: donor_name.into(),
            donor_email: None,
            member_id: None,
            donated_at,
            number_of_books: None,
            weight: None,
            book_condition: None,
            notes: None,
            import_id: None,
            created_at: Utc::now(),
        }
    }
}
