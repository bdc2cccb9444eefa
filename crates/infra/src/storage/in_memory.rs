use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use insti_core::ExpectedRevision;

use super::{KeyValueStore, StoreError, Versioned, check_revision};

/// In-memory key/value store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    inner: RwLock<HashMap<String, Versioned<JsonValue>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        let mut keys: Vec<_> = map.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Versioned<JsonValue>>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn put(
        &self,
        key: &str,
        value: JsonValue,
        expected: ExpectedRevision,
    ) -> Result<u64, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let current = map.get(key).map(|v| v.revision).unwrap_or(0);
        check_revision(key, expected, current)?;

        let revision = current + 1;
        map.insert(key.to_string(), Versioned { value, revision });
        Ok(revision)
    }

    fn remove(&self, key: &str, expected: ExpectedRevision) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let current = map.get(key).map(|v| v.revision).unwrap_or(0);
        check_revision(key, expected, current)?;
        map.remove(key);
        Ok(())
    }
}
