//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with small normalization helpers - no I/O or external dependencies.

mod attendee;
mod checkout;
mod donation;
pub mod import_history;
mod member;
mod program;
mod record;
pub mod result;

pub use attendee::Attendee;
pub use checkout::Checkout;
pub use donation::Donation;
pub use import_history::{
    EntityKind, ImportErrorEntry, ImportHistory, ImportSource, ImportStats, ImportStatus,
    ImportType, ImportedRecord,
};
pub use member::{normalize_email, Member};
pub use program::{Program, ProgramType};
pub use record::Record;
