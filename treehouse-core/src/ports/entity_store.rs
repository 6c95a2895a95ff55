//! Entity store port and the registry that maps entity tags to stores
//!
//! The rollback engine never names a table: it asks the registry for the
//! store registered under a manifest entry's `EntityKind`.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use uuid::Uuid;

use crate::domain::{EntityKind, Record};

/// Create/delete capability for one entity type
pub trait EntityStore: Send + Sync {
    /// Entity type this store persists
    fn kind(&self) -> EntityKind;

    /// Persist a new record, returning its id
    fn create(&self, record: &Record) -> Result<Uuid>;

    /// Delete by id; `Ok(false)` when no such record exists
    fn delete_by_id(&self, id: Uuid) -> Result<bool>;

    /// Number of stored records
    fn count(&self) -> Result<i64>;
}

/// Startup-populated map from `EntityKind` to its store
#[derive(Default, Clone)]
pub struct EntityRegistry {
    stores: HashMap<EntityKind, Arc<dyn EntityStore>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a store under the kind it reports; replaces any previous one
    pub fn register(&mut self, store: Arc<dyn EntityStore>) {
        self.stores.insert(store.kind(), store);
    }

    pub fn store(&self, kind: EntityKind) -> Result<&Arc<dyn EntityStore>> {
        self.stores
            .get(&kind)
            .ok_or_else(|| anyhow!("No store registered for {}", kind))
    }

    pub fn create(&self, record: &Record) -> Result<Uuid> {
        self.store(record.kind())?.create(record)
    }

    pub fn delete_by_id(&self, kind: EntityKind, id: Uuid) -> Result<bool> {
        self.store(kind)?.delete_by_id(id)
    }

    /// Registered kinds, in a stable order
    pub fn kinds(&self) -> Vec<EntityKind> {
        let mut kinds: Vec<EntityKind> = self.stores.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::domain::Member;

    /// In-memory store used to exercise the registry wiring
    struct MemoryStore {
        kind: EntityKind,
        ids: Mutex<Vec<Uuid>>,
    }

    impl EntityStore for MemoryStore {
        fn kind(&self) -> EntityKind {
            self.kind
        }

        fn create(&self, record: &Record) -> Result<Uuid> {
            self.ids.lock().unwrap().push(record.id());
            Ok(record.id())
        }

        fn delete_by_id(&self, id: Uuid) -> Result<bool> {
            let mut ids = self.ids.lock().unwrap();
            let before = ids.len();
            ids.retain(|existing| *existing != id);
            Ok(ids.len() < before)
        }

        fn count(&self) -> Result<i64> {
            Ok(self.ids.lock().unwrap().len() as i64)
        }
    }

    #[test]
    fn test_registry_routes_by_kind() {
        let store = Arc::new(MemoryStore {
            kind: EntityKind::Member,
            ids: Mutex::new(Vec::new()),
        });
        let mut registry = EntityRegistry::new();
        registry.register(store.clone());

        let member = Member::new("Ada", "Lovelace");
        let id = registry.create(&Record::Member(member)).unwrap();
        assert_eq!(store.count().unwrap(), 1);

        assert!(registry.delete_by_id(EntityKind::Member, id).unwrap());
        assert!(!registry.delete_by_id(EntityKind::Member, id).unwrap());
    }

    #[test]
    fn test_unregistered_kind_is_an_error() {
        let registry = EntityRegistry::new();
        let err = registry.delete_by_id(EntityKind::Donation, Uuid::new_v4()).unwrap_err();
        assert!(err.to_string().contains("Donation"));
    }
}
