//! Long-term memory store.
//!
//! Records live under a [`Namespace`] of (partition, assistant type, user id)
//! and are addressed by key within it. Lookups never cross namespaces.

mod durable;
mod memory;

use std::fmt;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AssistantConfig;
use crate::models::MemoryType;

pub use durable::RedbMemoryStore;
pub use memory::InMemoryStore;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Namespace {
    pub partition: MemoryType,
    pub assistant_type: String,
    pub user_id: String,
}

impl Namespace {
    pub fn new(
        partition: MemoryType,
        assistant_type: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            partition,
            assistant_type: assistant_type.into(),
            user_id: user_id.into(),
        }
    }

    pub fn for_config(partition: MemoryType, config: &AssistantConfig) -> Self {
        Self::new(partition, &config.assistant_type, &config.user_id)
    }

    pub fn segments(&self) -> [&str; 3] {
        [
            self.partition.as_str(),
            self.assistant_type.as_str(),
            self.user_id.as_str(),
        ]
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.partition, self.assistant_type, self.user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub namespace: Namespace,
    pub key: String,
    pub value: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Namespaced key-value store of JSON records.
pub trait MemoryStore: Send + Sync {
    /// Upsert; `created_at` of an existing record is kept.
    fn put(&self, namespace: &Namespace, key: &str, value: Value) -> Result<()>;

    fn get(&self, namespace: &Namespace, key: &str) -> Result<Option<StoredRecord>>;

    /// All records of exactly this namespace, sorted by key. Unknown namespaces are empty.
    fn search(&self, namespace: &Namespace) -> Result<Vec<StoredRecord>>;
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every backend must share.

    use super::*;
    use serde_json::json;

    fn ns(partition: MemoryType, user: &str) -> Namespace {
        Namespace::new(partition, "general", user)
    }

    pub fn last_write_wins(store: &dyn MemoryStore) {
        let namespace = ns(MemoryType::Todo, "u1");
        for n in 0..5 {
            store.put(&namespace, "t1", json!({"task": "x", "n": n})).unwrap();
        }

        let record = store.get(&namespace, "t1").unwrap().unwrap();
        assert_eq!(record.value["n"], 4);
        assert_eq!(record.namespace, namespace);
        assert!(record.created_at <= record.updated_at);
        assert_eq!(store.search(&namespace).unwrap().len(), 1);
    }

    pub fn search_is_exact_and_sorted(store: &dyn MemoryStore) {
        let namespace = ns(MemoryType::Todo, "u1");
        store.put(&namespace, "b", json!({"task": "b"})).unwrap();
        store.put(&namespace, "a", json!({"task": "a"})).unwrap();
        store.put(&ns(MemoryType::Todo, "u10"), "c", json!({})).unwrap();
        store.put(&ns(MemoryType::UserProfile, "u1"), "p", json!({})).unwrap();
        store
            .put(&Namespace::new(MemoryType::Todo, "work", "u1"), "d", json!({}))
            .unwrap();

        let keys: Vec<String> = store
            .search(&namespace)
            .unwrap()
            .into_iter()
            .map(|record| record.key)
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    pub fn unknown_namespace_is_empty(store: &dyn MemoryStore) {
        let namespace = ns(MemoryType::Instructions, "nobody");
        assert!(store.search(&namespace).unwrap().is_empty());
        assert!(store.get(&namespace, "user_instructions").unwrap().is_none());
    }

    pub fn created_at_survives_overwrite(store: &dyn MemoryStore) {
        let namespace = ns(MemoryType::Instructions, "u1");
        store.put(&namespace, "k", json!({"memory": "one"})).unwrap();
        let first = store.get(&namespace, "k").unwrap().unwrap();
        store.put(&namespace, "k", json!({"memory": "two"})).unwrap();
        let second = store.get(&namespace, "k").unwrap().unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at >= first.updated_at);
        assert_eq!(second.value, json!({"memory": "two"}));
    }
}
