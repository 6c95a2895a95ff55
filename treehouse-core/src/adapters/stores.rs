//! DuckDB-backed entity stores
//!
//! One `TableStore` per entity kind, all sharing the repository connection.

use std::sync::Arc;

use anyhow::{bail, Result};
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::{EntityKind, Record};
use crate::ports::{EntityRegistry, EntityStore};

pub struct TableStore {
    repository: Arc<DuckDbRepository>,
    kind: EntityKind,
}

impl TableStore {
    pub fn new(repository: Arc<DuckDbRepository>, kind: EntityKind) -> Self {
        Self { repository, kind }
    }
}

impl EntityStore for TableStore {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn create(&self, record: &Record) -> Result<Uuid> {
        if record.kind() != self.kind {
            bail!("{} store cannot persist a {} record", self.kind, record.kind());
        }
        match record {
            Record::Member(m) => self.repository.insert_member(m)?,
            Record::Checkout(c) => self.repository.insert_checkout(c)?,
            Record::Donation(d) => self.repository.insert_donation(d)?,
            Record::Program(p) => self.repository.insert_program(p)?,
            Record::Attendee(a) => self.repository.insert_attendee(a)?,
        }
        Ok(record.id())
    }

    fn delete_by_id(&self, id: Uuid) -> Result<bool> {
        self.repository.delete_entity(self.kind, id)
    }

    fn count(&self) -> Result<i64> {
        self.repository.count_entities(self.kind)
    }
}

/// Registry with a store for every importable entity kind
pub fn default_registry(repository: &Arc<DuckDbRepository>) -> EntityRegistry {
    let mut registry = EntityRegistry::new();
    for kind in [
        EntityKind::Member,
        EntityKind::Checkout,
        EntityKind::Donation,
        EntityKind::Program,
        EntityKind::Attendee,
    ] {
        registry.register(Arc::new(TableStore::new(Arc::clone(repository), kind)));
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Member, Program, ProgramType};
    use tempfile::TempDir;

    #[test]
    fn test_store_rejects_mismatched_record() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(DuckDbRepository::new(&dir.path().join("t.duckdb")).unwrap());
        repo.ensure_schema().unwrap();

        let store = TableStore::new(Arc::clone(&repo), EntityKind::Program);
        let err = store
            .create(&Record::Member(Member::new("Ada", "Lovelace")))
            .unwrap_err();
        assert!(err.to_string().contains("Program store"));
    }

    #[test]
    fn test_default_registry_covers_every_kind() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(DuckDbRepository::new(&dir.path().join("t.duckdb")).unwrap());
        repo.ensure_schema().unwrap();

        let registry = default_registry(&repo);
        assert_eq!(registry.kinds().len(), 5);

        let program = Program::new("Story Hour", ProgramType::Event);
        let id = registry.create(&Record::Program(program)).unwrap();
        assert_eq!(registry.store(EntityKind::Program).unwrap().count().unwrap(), 1);
        assert!(registry.delete_by_id(EntityKind::Program, id).unwrap());
    }
}
