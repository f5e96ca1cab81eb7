use super::AuditStore;
use crate::model::{ConfirmationRecord, GenerationId, GenerationRecord};
use crate::{AuditError, AuditResult};
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-process store. Records vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    generations: RwLock<Vec<GenerationRecord>>,
    confirmations: RwLock<HashMap<GenerationId, ConfirmationRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditStore for MemoryStore {
    fn put_generation(&self, record: &GenerationRecord) -> AuditResult<()> {
        let mut generations = self.generations.write();
        if generations.iter().any(|g| g.id == record.id) {
            return Err(AuditError::DuplicateRecord(record.id.to_string()));
        }
        generations.push(record.clone());
        Ok(())
    }

    fn get_generation(&self, id: &GenerationId) -> AuditResult<Option<GenerationRecord>> {
        let generations = self.generations.read();
        Ok(generations.iter().find(|g| &g.id == id).cloned())
    }

    fn list_generations(&self) -> AuditResult<Vec<GenerationRecord>> {
        let generations = self.generations.read();
        Ok(generations.clone())
    }

    fn insert_confirmation(&self, record: &ConfirmationRecord) -> AuditResult<()> {
        let mut confirmations = self.confirmations.write();
        if let Some(existing) = confirmations.get(&record.generation_id) {
            return Err(AuditError::Conflict {
                generation_id: record.generation_id.to_string(),
                confirmed_at: existing.confirmed_at,
            });
        }
        confirmations.insert(record.generation_id.clone(), record.clone());
        Ok(())
    }

    fn get_confirmation(
        &self,
        generation_id: &GenerationId,
    ) -> AuditResult<Option<ConfirmationRecord>> {
        let confirmations = self.confirmations.read();
        Ok(confirmations.get(generation_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{confirmation, generation};

    #[test]
    fn test_put_and_get_generation() {
        let store = MemoryStore::new();
        let record = generation(None, Some(42));
        store.put_generation(&record).unwrap();

        assert_eq!(store.get_generation(&record.id).unwrap(), Some(record.clone()));
        assert!(matches!(
            store.put_generation(&record),
            Err(AuditError::DuplicateRecord(_))
        ));
        assert_eq!(store.get_generation(&GenerationId::new()).unwrap(), None);
    }

    #[test]
    fn test_list_keeps_insertion_order() {
        let store = MemoryStore::new();
        let first = generation(None, Some(42));
        let second = generation(Some(first.id.clone()), Some(43));
        store.put_generation(&first).unwrap();
        store.put_generation(&second).unwrap();

        let ids: Vec<_> = store
            .list_generations()
            .unwrap()
            .into_iter()
            .map(|g| g.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[test]
    fn test_second_confirmation_conflicts_with_first_timestamp() {
        let store = MemoryStore::new();
        let gen_id = GenerationId::new();
        let first = confirmation(&gen_id);
        store.insert_confirmation(&first).unwrap();

        match store.insert_confirmation(&confirmation(&gen_id)) {
            Err(AuditError::Conflict { confirmed_at, .. }) => {
                assert_eq!(confirmed_at, first.confirmed_at)
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(store.get_confirmation(&gen_id).unwrap(), Some(first));
    }

    #[test]
    fn test_concurrent_confirmations_store_exactly_one() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let gen_id = GenerationId::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let record = confirmation(&gen_id);
                std::thread::spawn(move || store.insert_confirmation(&record).is_ok())
            })
            .collect();
        let stored = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(stored, 1);
        assert!(store.get_confirmation(&gen_id).unwrap().is_some());
    }
}
