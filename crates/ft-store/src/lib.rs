//! Durable storage for the focus tracker's usage ledger.
//!
//! A small key/value layer over `rusqlite`. The ledger is stored under a
//! single key as a JSON object mapping target to accumulated minutes, so a
//! process restart (clean or not) recovers exactly what was pending.
//!
//! # Thread Safety
//!
//! [`LedgerStore`] wraps a `rusqlite::Connection`, which is `Send` but not
//! `Sync`. The engine owns its store on a single task; no external
//! synchronization is needed there. For any other sharing, wrap it in a
//! `Mutex` or open separate stores.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

/// The key the serialized ledger lives under.
const LEDGER_KEY: &str = "usage_ledger";

/// Storage errors.
///
/// Persistence is best-effort for the running engine: callers log these and
/// carry on rather than halting the process.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The persisted ledger could not be encoded or decoded.
    #[error("invalid ledger payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Key/value store backing the usage ledger.
pub struct LedgerStore {
    conn: Connection,
}

impl LedgerStore {
    /// Opens a store at the given path, creating it if necessary.
    ///
    /// The schema is initialized on first open; reopening is idempotent.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Opens an in-memory store, destroyed when dropped. Useful for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Reads a raw value, `None` when the key is absent.
    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Writes a raw value, replacing any previous one.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Loads the persisted ledger, empty when none was saved yet.
    pub fn load_ledger(&self) -> Result<HashMap<String, f64>, StoreError> {
        match self.get(LEDGER_KEY)? {
            Some(payload) => Ok(serde_json::from_str(&payload)?),
            None => Ok(HashMap::new()),
        }
    }

    /// Persists the current ledger map.
    pub fn save_ledger(&self, entries: &HashMap<String, f64>) -> Result<(), StoreError> {
        let payload = serde_json::to_string(entries)?;
        self.set(LEDGER_KEY, &payload)?;
        tracing::trace!(targets = entries.len(), "ledger persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_absent_key_returns_none() {
        let store = LedgerStore::open_in_memory().unwrap();
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn set_replaces_existing_value() {
        let store = LedgerStore::open_in_memory().unwrap();
        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn empty_store_loads_empty_ledger() {
        let store = LedgerStore::open_in_memory().unwrap();
        assert!(store.load_ledger().unwrap().is_empty());
    }

    #[test]
    fn ledger_round_trips() {
        let store = LedgerStore::open_in_memory().unwrap();
        let mut entries = HashMap::new();
        entries.insert("foo.com".to_string(), 2.5);
        entries.insert("bar.net".to_string(), 0.75);

        store.save_ledger(&entries).unwrap();
        assert_eq!(store.load_ledger().unwrap(), entries);
    }

    #[test]
    fn ledger_survives_reopen() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ledger.db");

        let mut entries = HashMap::new();
        entries.insert("foo.com".to_string(), 4.0);
        {
            let store = LedgerStore::open(&path).unwrap();
            store.save_ledger(&entries).unwrap();
        }

        let store = LedgerStore::open(&path).unwrap();
        assert_eq!(store.load_ledger().unwrap(), entries);
    }

    #[test]
    fn corrupt_payload_surfaces_as_payload_error() {
        let store = LedgerStore::open_in_memory().unwrap();
        store.set("usage_ledger", "not-json").unwrap();
        assert!(matches!(
            store.load_ledger(),
            Err(StoreError::Payload(_))
        ));
    }
}
