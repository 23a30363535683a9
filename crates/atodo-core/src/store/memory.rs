use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;

use super::{MemoryStore, Namespace, StoredRecord};

/// Process-lifetime store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<BTreeMap<Namespace, BTreeMap<String, StoredRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryStore for InMemoryStore {
    fn put(&self, namespace: &Namespace, key: &str, value: Value) -> Result<()> {
        let now = Utc::now();
        let mut records = self.records.write();
        let entries = records.entry(namespace.clone()).or_default();
        match entries.get_mut(key) {
            Some(existing) => {
                existing.value = value;
                existing.updated_at = now;
            }
            None => {
                entries.insert(
                    key.to_string(),
                    StoredRecord {
                        namespace: namespace.clone(),
                        key: key.to_string(),
                        value,
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
        Ok(())
    }

    fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<StoredRecord>> {
        Ok(self
            .records
            .read()
            .get(namespace)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn search(&self, namespace: &Namespace) -> Result<Vec<StoredRecord>> {
        Ok(self
            .records
            .read()
            .get(namespace)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default())
    }
}
