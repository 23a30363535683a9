//! Path utilities for ATodo directory resolution.

use anyhow::Result;
use std::path::PathBuf;

const ATODO_DIR: &str = ".atodo";
const DB_FILE: &str = "atodo.db";
const LOGS_DIR: &str = "logs";

/// Environment variable to override the ATodo directory.
const ATODO_DIR_ENV: &str = "ATODO_DIR";

/// Resolve the ATodo data directory.
/// Priority: ATODO_DIR env var > ~/.atodo/
pub fn resolve_atodo_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ATODO_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(ATODO_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Ensure the ATodo directory exists and return its path.
pub fn ensure_atodo_dir() -> Result<PathBuf> {
    let dir = resolve_atodo_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Get the database path: ~/.atodo/atodo.db
pub fn database_path() -> Result<PathBuf> {
    Ok(resolve_atodo_dir()?.join(DB_FILE))
}

/// Ensure the logs directory exists and return its path: ~/.atodo/logs
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let dir = ensure_atodo_dir()?.join(LOGS_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
