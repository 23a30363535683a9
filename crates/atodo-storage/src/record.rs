//! Record storage - byte-level API for namespaced long-term memory records.
//!
//! A namespace is an ordered list of segments (for the assistant:
//! partition, assistant type, user id). Records live in a single table keyed
//! by `{segment}/{segment}/.../{key}`, so listing a namespace is a prefix
//! scan. Segments and keys must be non-empty and must not contain `/`,
//! which keeps a scan from ever reaching into a sibling namespace.

use anyhow::{Result, bail};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

use crate::range_utils::prefix_range;

const RECORD_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("memory_records");

const SEPARATOR: char = '/';

/// Low-level record storage with byte-level API
#[derive(Debug, Clone)]
pub struct RecordStorage {
    db: Arc<Database>,
}

impl RecordStorage {
    /// Create a new RecordStorage instance
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(RECORD_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Store raw bytes under `namespace/key`, replacing any previous value.
    pub fn put_raw(&self, namespace: &[&str], key: &str, data: &[u8]) -> Result<()> {
        let full_key = record_key(namespace, key)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RECORD_TABLE)?;
            table.insert(full_key.as_str(), data)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get raw bytes stored under `namespace/key`.
    pub fn get_raw(&self, namespace: &[&str], key: &str) -> Result<Option<Vec<u8>>> {
        let full_key = record_key(namespace, key)?;
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORD_TABLE)?;

        if let Some(value) = table.get(full_key.as_str())? {
            Ok(Some(value.value().to_vec()))
        } else {
            Ok(None)
        }
    }

    /// List all `(key, data)` pairs in exactly this namespace, sorted by key.
    ///
    /// An unknown namespace yields an empty list.
    pub fn list_raw(&self, namespace: &[&str]) -> Result<Vec<(String, Vec<u8>)>> {
        let prefix = namespace_prefix(namespace)?;
        let (start, end) = prefix_range(&prefix);

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORD_TABLE)?;

        let mut records = Vec::new();
        for item in table.range(start.as_str()..end.as_str())? {
            let (key, value) = item?;
            let Some(record_key) = key.value().strip_prefix(prefix.as_str()) else {
                continue;
            };
            // Deeper namespaces share the prefix; keys never contain the separator.
            if record_key.contains(SEPARATOR) {
                continue;
            }
            records.push((record_key.to_string(), value.value().to_vec()));
        }

        Ok(records)
    }

    /// Count records in exactly this namespace.
    pub fn count(&self, namespace: &[&str]) -> Result<usize> {
        Ok(self.list_raw(namespace)?.len())
    }
}

fn validate_segment(kind: &str, segment: &str) -> Result<()> {
    if segment.is_empty() {
        bail!("{kind} must not be empty");
    }
    if segment.contains(SEPARATOR) {
        bail!("{kind} '{segment}' must not contain '{SEPARATOR}'");
    }
    Ok(())
}

fn namespace_prefix(namespace: &[&str]) -> Result<String> {
    if namespace.is_empty() {
        bail!("namespace must have at least one segment");
    }
    let mut prefix = String::new();
    for segment in namespace {
        validate_segment("namespace segment", segment)?;
        prefix.push_str(segment);
        prefix.push(SEPARATOR);
    }
    Ok(prefix)
}

fn record_key(namespace: &[&str], key: &str) -> Result<String> {
    validate_segment("record key", key)?;
    let mut full_key = namespace_prefix(namespace)?;
    full_key.push_str(key);
    Ok(full_key)
}
