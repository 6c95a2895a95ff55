//! Reference lookup port - natural-key reads used by the importers

use std::fmt;

use anyhow::Result;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{Member, Program};

/// A business-meaningful key used for duplicate detection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NaturalKey {
    /// Lowercased member email
    MemberEmail(String),
    /// Exact program name
    ProgramName(String),
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NaturalKey::MemberEmail(email) => write!(f, "Member with email {}", email),
            NaturalKey::ProgramName(name) => write!(f, "Program with name {}", name),
        }
    }
}

/// Reads (and the one link update) the import core needs from the domain
pub trait ReferenceLookup: Send + Sync {
    fn find_member_by_email(&self, email: &str) -> Result<Option<Member>>;

    fn find_member_by_name_and_birth_date(
        &self,
        first_name: &str,
        last_name: &str,
        date_of_birth: Option<NaiveDate>,
    ) -> Result<Option<Member>>;

    fn find_program_by_name(&self, name: &str) -> Result<Option<Program>>;

    /// Point an attendee at the member record it was synced to
    fn link_attendee_member(&self, attendee_id: Uuid, member_id: Uuid) -> Result<()>;

    fn natural_key_exists(&self, key: &NaturalKey) -> Result<bool> {
        Ok(match key {
            NaturalKey::MemberEmail(email) => self.find_member_by_email(email)?.is_some(),
            NaturalKey::ProgramName(name) => self.find_program_by_name(name)?.is_some(),
        })
    }
}
