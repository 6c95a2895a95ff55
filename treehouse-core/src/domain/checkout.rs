//! Checkout domain model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A book checkout event; every row is a new record, never deduplicated
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkout {
    pub id: Uuid,
    pub member_id: Uuid,
    pub book_title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub checkout_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub number_of_books: i32,
    pub notes: Option<String>,
    pub import_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Checkout {
    pub fn new(member_id: Uuid, book_title: impl Into<String>, checkout_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            book_title: book_title.into(),
            author: None,
            isbn: None,
            checkout_date,
            due_date: None,
            return_date: None,
            number_of_books: 1,
            notes: None,
            import_id: None,
            created_at: Utc::now(),
        }
    }
}
