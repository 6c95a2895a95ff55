//! Program domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Program category; classroom programs can mirror attendees into members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramType {
    Classroom,
    Event,
    Outreach,
    Other,
}

impl ProgramType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramType::Classroom => "classroom",
            ProgramType::Event => "event",
            ProgramType::Outreach => "outreach",
            ProgramType::Other => "other",
        }
    }
}

impl fmt::Display for ProgramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgramType {
    type Err = std::convert::Infallible;

    /// Unrecognized categories fall back to `Other`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "classroom" | "class" => ProgramType::Classroom,
            "event" => ProgramType::Event,
            "outreach" => ProgramType::Outreach,
            _ => ProgramType::Other,
        })
    }
}

/// A volunteer-run program; names are unique
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: Uuid,
    pub name: String,
    pub program_type: ProgramType,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub auto_sync_attendees: bool,
    pub import_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Program {
    pub fn new(name: impl Into<String>, program_type: ProgramType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            program_type,
            description: None,
            location: None,
            start_date: None,
            end_date: None,
            auto_sync_attendees: false,
            import_id: None,
            created_at: Utc::now(),
        }
    }

    /// Whether attendees of this program should also become members
    pub fn syncs_attendees(&self) -> bool {
        self.program_type == ProgramType::Classroom && self.auto_sync_attendees
    }
}
