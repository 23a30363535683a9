//! redb-backed memory store.
//!
//! Typed wrapper over the byte-level [`RecordStorage`]: each record is kept as
//! a JSON envelope holding the value and its timestamps.

use std::path::Path;

use anyhow::{Context, Result};
use atodo_storage::{RecordStorage, Storage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{MemoryStore, Namespace, StoredRecord};

#[derive(Serialize, Deserialize)]
struct Envelope {
    value: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RedbMemoryStore {
    inner: RecordStorage,
}

impl RedbMemoryStore {
    pub fn new(storage: &Storage) -> Self {
        Self {
            inner: storage.records.clone(),
        }
    }

    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let storage = Storage::new(path)
            .with_context(|| format!("Failed to open memory database at {}", path.display()))?;
        Ok(Self::new(&storage))
    }

    fn decode(namespace: &Namespace, key: String, bytes: &[u8]) -> Result<StoredRecord> {
        let envelope: Envelope = serde_json::from_slice(bytes)
            .with_context(|| format!("Corrupt record {namespace}/{key}"))?;
        Ok(StoredRecord {
            namespace: namespace.clone(),
            key,
            value: envelope.value,
            created_at: envelope.created_at,
            updated_at: envelope.updated_at,
        })
    }
}

impl MemoryStore for RedbMemoryStore {
    fn put(&self, namespace: &Namespace, key: &str, value: Value) -> Result<()> {
        let now = Utc::now();
        let created_at = self
            .get(namespace, key)?
            .map(|existing| existing.created_at)
            .unwrap_or(now);

        let envelope = Envelope {
            value,
            created_at,
            updated_at: now,
        };
        let bytes = serde_json::to_vec(&envelope)?;
        self.inner.put_raw(&namespace.segments(), key, &bytes)
    }

    fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<StoredRecord>> {
        match self.inner.get_raw(&namespace.segments(), key)? {
            Some(bytes) => Ok(Some(Self::decode(namespace, key.to_string(), &bytes)?)),
            None => Ok(None),
        }
    }

    fn search(&self, namespace: &Namespace) -> Result<Vec<StoredRecord>> {
        self.inner
            .list_raw(&namespace.segments())?
            .into_iter()
            .map(|(key, bytes)| Self::decode(namespace, key, &bytes))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemoryType;
    use crate::store::contract;
    use serde_json::json;
    use tempfile::{TempDir, tempdir};

    fn open_store() -> (TempDir, RedbMemoryStore) {
        let dir = tempdir().unwrap();
        let store = RedbMemoryStore::open(dir.path().join("atodo.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_last_write_wins() {
        let (_dir, store) = open_store();
        contract::last_write_wins(&store);
    }

    #[test]
    fn test_search_is_exact_and_sorted() {
        let (_dir, store) = open_store();
        contract::search_is_exact_and_sorted(&store);
    }

    #[test]
    fn test_unknown_namespace_is_empty() {
        let (_dir, store) = open_store();
        contract::unknown_namespace_is_empty(&store);
    }

    #[test]
    fn test_created_at_survives_overwrite() {
        let (_dir, store) = open_store();
        contract::created_at_survives_overwrite(&store);
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("atodo.db");
        let namespace = Namespace::new(MemoryType::UserProfile, "general", "u1");

        {
            let store = RedbMemoryStore::open(&path).unwrap();
            store.put(&namespace, "p1", json!({"name": "Dan"})).unwrap();
        }

        let store = RedbMemoryStore::open(&path).unwrap();
        let records = store.search(&namespace).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, json!({"name": "Dan"}));
    }

    #[test]
    fn test_namespace_with_separator_is_rejected() {
        let (_dir, store) = open_store();
        let namespace = Namespace::new(MemoryType::Todo, "general", "a/b");
        assert!(store.put(&namespace, "t1", json!({})).is_err());
    }
}
