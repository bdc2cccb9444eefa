//! Versioned key/value storage for the persisted collections.
//!
//! Each key holds one JSON document and a revision counter. Revision `0`
//! means the key is absent; every successful write bumps it by one. Writers
//! pass an [`ExpectedRevision`] so a stale read-modify-write cycle fails with
//! [`StoreError::Conflict`] instead of overwriting someone else's change.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;

use insti_core::ExpectedRevision;

pub mod file;
pub mod in_memory;

pub use file::FileKeyValueStore;
pub use in_memory::InMemoryKeyValueStore;

/// A stored document with its revision.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<V> {
    pub value: V,
    pub revision: u64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt record '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    #[error("write conflict on '{key}' (expected {expected:?}, found revision {actual})")]
    Conflict {
        key: String,
        expected: ExpectedRevision,
        actual: u64,
    },

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Key/value storage abstraction.
///
/// Implementations must make `put`/`remove` atomic with respect to their own
/// revision check.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Versioned<JsonValue>>, StoreError>;

    /// Write `value`, returning the new revision.
    fn put(&self, key: &str, value: JsonValue, expected: ExpectedRevision)
    -> Result<u64, StoreError>;

    /// Delete `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str, expected: ExpectedRevision) -> Result<(), StoreError>;

    fn revision(&self, key: &str) -> Result<u64, StoreError> {
        Ok(self.get(key)?.map(|v| v.revision).unwrap_or(0))
    }
}

impl<S> KeyValueStore for Arc<S>
where
    S: KeyValueStore + ?Sized,
{
    fn get(&self, key: &str) -> Result<Option<Versioned<JsonValue>>, StoreError> {
        (**self).get(key)
    }

    fn put(
        &self,
        key: &str,
        value: JsonValue,
        expected: ExpectedRevision,
    ) -> Result<u64, StoreError> {
        (**self).put(key, value, expected)
    }

    fn remove(&self, key: &str, expected: ExpectedRevision) -> Result<(), StoreError> {
        (**self).remove(key, expected)
    }
}

/// The backend chosen by configuration.
#[derive(Debug)]
pub enum Backend {
    Memory(InMemoryKeyValueStore),
    File(FileKeyValueStore),
}

impl KeyValueStore for Backend {
    fn get(&self, key: &str) -> Result<Option<Versioned<JsonValue>>, StoreError> {
        match self {
            Backend::Memory(s) => s.get(key),
            Backend::File(s) => s.get(key),
        }
    }

    fn put(
        &self,
        key: &str,
        value: JsonValue,
        expected: ExpectedRevision,
    ) -> Result<u64, StoreError> {
        match self {
            Backend::Memory(s) => s.put(key, value, expected),
            Backend::File(s) => s.put(key, value, expected),
        }
    }

    fn remove(&self, key: &str, expected: ExpectedRevision) -> Result<(), StoreError> {
        match self {
            Backend::Memory(s) => s.remove(key, expected),
            Backend::File(s) => s.remove(key, expected),
        }
    }
}

pub(crate) fn check_revision(
    key: &str,
    expected: ExpectedRevision,
    actual: u64,
) -> Result<(), StoreError> {
    if expected.matches(actual) {
        Ok(())
    } else {
        Err(StoreError::Conflict {
            key: key.to_string(),
            expected,
            actual,
        })
    }
}
