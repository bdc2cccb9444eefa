//! One JSON file per key inside a data directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use insti_core::ExpectedRevision;

use super::{KeyValueStore, StoreError, Versioned, check_revision};

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    revision: u64,
    value: JsonValue,
}

/// File-backed key/value store.
///
/// Writes go to a temporary sibling and are renamed into place, so readers
/// never observe a half-written document. Revision checks are serialized per
/// handle; two handles on one directory are only as safe as the rename.
#[derive(Debug)]
pub struct FileKeyValueStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// Open (and create, if needed) `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' | '.' => c,
                _ => '_',
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }

    fn read(&self, key: &str) -> Result<Option<Record>, StoreError> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    key: key.to_string(),
                    source,
                });
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn current_revision(&self, key: &str) -> Result<u64, StoreError> {
        Ok(self.read(key)?.map(|r| r.revision).unwrap_or(0))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Versioned<JsonValue>>, StoreError> {
        Ok(self.read(key)?.map(|r| Versioned {
            value: r.value,
            revision: r.revision,
        }))
    }

    fn put(
        &self,
        key: &str,
        value: JsonValue,
        expected: ExpectedRevision,
    ) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let current = self.current_revision(key)?;
        check_revision(key, expected, current)?;

        let record = Record {
            revision: current + 1,
            value,
        };
        let bytes = serde_json::to_vec_pretty(&record).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let io = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        fs::write(&tmp, bytes).map_err(io)?;
        fs::rename(&tmp, &path).map_err(io)?;

        Ok(record.revision)
    }

    fn remove(&self, key: &str, expected: ExpectedRevision) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let current = self.current_revision(key)?;
        check_revision(key, expected, current)?;

        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}
