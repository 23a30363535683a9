//! ATodo Storage - Low-level persistence for long-term assistant memory
//!
//! This crate provides the durable layer behind the assistant's memory store,
//! using redb as the embedded database. It exposes byte-level APIs so it does
//! not depend on the record schemas defined in atodo-core.
//!
//! # Tables
//!
//! - `memory_records` - `{namespace segments joined by '/'}/{key}` -> record bytes

pub mod paths;
mod range_utils;
pub mod record;

use anyhow::Result;
use redb::Database;
use std::path::Path;
use std::sync::Arc;

pub use record::RecordStorage;

/// Central storage manager that initializes all storage subsystems
#[derive(Debug, Clone)]
pub struct Storage {
    pub records: RecordStorage,
}

impl Storage {
    /// Open (or create) the database at the given path and initialize all
    /// required tables.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let db = Arc::new(Database::create(path)?);
        let records = RecordStorage::new(db)?;
        tracing::debug!(path = %path.display(), "Opened memory database");

        Ok(Self { records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_storage_creates_parent_dirs() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("atodo.db");

        let storage = Storage::new(&db_path).unwrap();
        storage
            .records
            .put_raw(&["todo", "general", "u1"], "k1", b"{}")
            .unwrap();

        assert!(db_path.exists());
    }

    #[test]
    fn test_storage_reopen_keeps_records() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("atodo.db");

        {
            let storage = Storage::new(&db_path).unwrap();
            storage
                .records
                .put_raw(&["user_profile", "general", "u1"], "p1", b"data")
                .unwrap();
        }

        let storage = Storage::new(&db_path).unwrap();
        let value = storage
            .records
            .get_raw(&["user_profile", "general", "u1"], "p1")
            .unwrap();
        assert_eq!(value.as_deref(), Some(&b"data"[..]));
    }
}
