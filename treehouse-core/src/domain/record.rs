//! A record of any importable entity type
//!
//! Importers build a `Record`; the entity registry routes it to the store
//! registered for its `EntityKind`.

use uuid::Uuid;

use super::{Attendee, Checkout, Donation, EntityKind, Member, Program};

#[derive(Debug, Clone)]
pub enum Record {
    Member(Member),
    Checkout(Checkout),
    Donation(Donation),
    Program(Program),
    Attendee(Attendee),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Member(_) => EntityKind::Member,
            Record::Checkout(_) => EntityKind::Checkout,
            Record::Donation(_) => EntityKind::Donation,
            Record::Program(_) => EntityKind::Program,
            Record::Attendee(_) => EntityKind::Attendee,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Record::Member(m) => m.id,
            Record::Checkout(c) => c.id,
            Record::Donation(d) => d.id,
            Record::Program(p) => p.id,
            Record::Attendee(a) => a.id,
        }
    }
}
