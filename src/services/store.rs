use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::db::Database;
use crate::error::PersistenceError;
use crate::models::Ledger;

/// Key the ledger snapshot is stored under.
pub const SNAPSHOT_KEY: &str = "iciv-data";

pub trait BlobStore: Send {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

impl BlobStore for Database {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.get_blob(key)?)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        Ok(self.put_blob(key, value)?)
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(key: &str, value: &str) -> Self {
        let store = Self::default();
        if let Ok(mut blobs) = store.blobs.lock() {
            blobs.insert(key.to_string(), value.to_string());
        }
        store
    }
}

impl BlobStore for MemoryBlobStore {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let blobs = self.blobs.lock().map_err(|_| PersistenceError::Poisoned)?;
        Ok(blobs.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut blobs = self.blobs.lock().map_err(|_| PersistenceError::Poisoned)?;
        blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn try_save(store: &dyn BlobStore, ledger: &Ledger) -> Result<(), PersistenceError> {
    let raw = serde_json::to_string(ledger)?;
    store.write(SNAPSHOT_KEY, &raw)
}

/// Writes the whole ledger as one blob. Failures are logged and swallowed.
pub fn save_snapshot(store: &dyn BlobStore, ledger: &Ledger) {
    match try_save(store, ledger) {
        Ok(()) => debug!(
            invoices = ledger.invoices.len(),
            receipts = ledger.receipts.len(),
            "Snapshot saved"
        ),
        Err(err) => warn!(error = %err, "Could not save ledger snapshot"),
    }
}

fn try_load(store: &dyn BlobStore) -> Result<Option<Ledger>, PersistenceError> {
    match store.read(SNAPSHOT_KEY)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Reads the ledger snapshot, falling back to an empty ledger when it is
/// missing or unreadable.
pub fn load_snapshot(store: &dyn BlobStore) -> Ledger {
    let mut ledger = match try_load(store) {
        Ok(Some(ledger)) => ledger,
        Ok(None) => Ledger::default(),
        Err(err) => {
            warn!(error = %err, "Discarding unreadable ledger snapshot");
            Ledger::default()
        }
    };
    let repaired = ledger.normalize();
    if repaired > 0 {
        warn!(repaired, "Corrected balances or counters in loaded snapshot");
    }
    ledger
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Client, SequenceCounters};

    struct BrokenStore;

    impl BlobStore for BrokenStore {
        fn read(&self, _key: &str) -> Result<Option<String>, PersistenceError> {
            Err(PersistenceError::Poisoned)
        }

        fn write(&self, _key: &str, _value: &str) -> Result<(), PersistenceError> {
            Err(PersistenceError::Poisoned)
        }
    }

    fn sample_ledger() -> Ledger {
        let mut ledger = Ledger::default();
        ledger.sequence_counters = SequenceCounters { invoice: 12, receipt: 4 };
        ledger.clients.push(Client {
            id: "c-1".to_string(),
            name: "Constructora Norte".to_string(),
            tax_id: Some("30-70000000-1".to_string()),
            email: None,
            phone: Some("351-4000000".to_string()),
            address: None,
        });
        ledger
    }

    #[test]
    fn snapshot_survives_a_sqlite_store() {
        let db = Database::open_in_memory().unwrap();
        let ledger = sample_ledger();
        save_snapshot(&db, &ledger);
        assert_eq!(load_snapshot(&db), ledger);
    }

    #[test]
    fn missing_snapshot_loads_empty_ledger() {
        let store = MemoryBlobStore::new();
        assert_eq!(load_snapshot(&store), Ledger::default());
    }

    #[test]
    fn corrupt_snapshot_loads_empty_ledger() {
        let store = MemoryBlobStore::with_blob(SNAPSHOT_KEY, "{not json");
        assert_eq!(load_snapshot(&store), Ledger::default());
    }

    #[test]
    fn store_failures_are_not_surfaced() {
        save_snapshot(&BrokenStore, &sample_ledger());
        assert_eq!(load_snapshot(&BrokenStore), Ledger::default());
    }

    #[test]
    fn older_snapshot_keeps_default_counters() {
        let store = MemoryBlobStore::with_blob(SNAPSHOT_KEY, r#"{"clients":[{"id":"c-9","name":"Obra"}]}"#);
        let ledger = load_snapshot(&store);
        assert_eq!(ledger.clients.len(), 1);
        assert_eq!(ledger.sequence_counters, SequenceCounters::default());
    }

    #[test]
    fn snapshot_uses_camel_case_fields() {
        let store = MemoryBlobStore::new();
        save_snapshot(&store, &sample_ledger());
        let raw = store.read(SNAPSHOT_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["sequenceCounters"]["invoice"], 12);
        assert_eq!(value["clients"][0]["taxId"], "30-70000000-1");
    }
}
