//! Persistent configuration values using redb.
//!
//! # Table design
//!
//! Each configuration section (namespace) is its own redb table with
//! `&str` keys and `&str` values. The action-status table is just the
//! `Plugins` section. A section that has never been written has no table;
//! reads treat that as "no value".
//!
//! Every write is its own committed transaction, so a crash between two
//! writes loses at most the second one.

use std::fmt::Display;
use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition, TableError};

use crate::error::{HostInitError, Result};

fn db_err(e: impl Display) -> HostInitError {
    HostInitError::StatusDb(e.to_string())
}

fn section_table(section: &str) -> TableDefinition<'_, &'static str, &'static str> {
    TableDefinition::new(section)
}

/// Durable key/value store backing `OsUtils::{get,set}_config_value`.
pub struct ConfigDb {
    db: Database,
}

impl ConfigDb {
    /// Open or create the redb database at `path`, creating parent
    /// directories as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::io::ensure_dir(parent)?;
        }
        let db = Database::create(path).map_err(db_err)?;
        Ok(Self { db })
    }

    pub fn get(&self, section: &str, key: &str) -> Result<Option<String>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = match rt.open_table(section_table(section)) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(db_err(e)),
        };
        let value = table.get(key).map_err(db_err)?;
        Ok(value.map(|v| v.value().to_string()))
    }

    pub fn set(&self, section: &str, key: &str, value: &str) -> Result<()> {
        let wt = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = wt.open_table(section_table(section)).map_err(db_err)?;
            table.insert(key, value).map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(())
    }

    /// Remove `key` from `section`. Returns true if a value was present.
    pub fn remove(&self, section: &str, key: &str) -> Result<bool> {
        let wt = self.db.begin_write().map_err(db_err)?;
        let removed = {
            let mut table = wt.open_table(section_table(section)).map_err(db_err)?;
            let old = table.remove(key).map_err(db_err)?;
            old.is_some()
        };
        wt.commit().map_err(db_err)?;
        Ok(removed)
    }

    /// All `(key, value)` pairs in `section`, in key order.
    pub fn entries(&self, section: &str) -> Result<Vec<(String, String)>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let table = match rt.open_table(section_table(section)) {
            Ok(t) => t,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(db_err(e)),
        };
        let mut result = Vec::new();
        for entry in table.iter().map_err(db_err)? {
            let (k, v) = entry.map_err(db_err)?;
            result.push((k.value().to_string(), v.value().to_string()));
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
