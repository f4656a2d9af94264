//! redb-backed local store: named JSON collections with secondary indexes.
//!
//! # Layout
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `<collection>` | record id | JSON-serialized record |
//! | `idx_<collection>_<field>` | `(field value, record id)` | `()` |
//! | `schema_meta` | `"version"` | `u64` schema version |
//!
//! Records are the same camelCase JSON documents the cloud store holds.
//! Writes are last-write-wins locally; redb's single-writer transactions
//! are what make the repositories' check-then-act invariants atomic.
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate`: copy-on-write with an atomic
//! pointer swap, so the file stays consistent through power loss. A store
//! that cannot open (corruption, failed migration) is a fatal error; the
//! caller must not run on a partial schema.

pub mod migrations;
pub mod schema;

pub use schema::Collection;

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::models::record::ID_FIELD;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Migration {0} failed: {1}")]
    Migration(u64, String),

    #[error("Record in '{0}' has no string 'id' field")]
    MissingId(Collection),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Handle to the on-device database. Cheap to clone; all clones share the
/// same underlying redb instance.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Database>,
}

impl LocalStore {
    /// Open (or create) the store at `path` and bring the schema up to
    /// date. Every pending migration is applied in ascending order, each
    /// in its own committed transaction.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;
        migrations::run(&db)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// In-memory store with the full schema applied. Used by tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        migrations::run(&db)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction. redb serializes writers, so everything
    /// done before `commit()` is atomic with respect to other writers.
    pub fn begin_write(&self) -> StoreResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Current schema version.
    pub fn schema_version(&self) -> StoreResult<u64> {
        let read_txn = self.db.begin_read()?;
        migrations::current_version_read(&read_txn)
    }

    // ========== Raw (JSON document) access ==========

    pub fn get_raw(&self, collection: Collection, id: &str) -> StoreResult<Option<Value>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(collection.table())?;
        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_raw_in(
        &self,
        txn: &WriteTransaction,
        collection: Collection,
        id: &str,
    ) -> StoreResult<Option<Value>> {
        let table = txn.open_table(collection.table())?;
        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_all_raw(&self, collection: Collection) -> StoreResult<Vec<Value>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(collection.table())?;
        let mut records = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(records)
    }

    pub fn get_all_raw_in(
        &self,
        txn: &WriteTransaction,
        collection: Collection,
    ) -> StoreResult<Vec<Value>> {
        let table = txn.open_table(collection.table())?;
        let mut records = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(records)
    }

    /// Upsert a record (last-write-wins) and refresh its index entries.
    pub fn put_raw_in(
        &self,
        txn: &WriteTransaction,
        collection: Collection,
        record: &Value,
    ) -> StoreResult<()> {
        let id = record
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .ok_or(StoreError::MissingId(collection))?
            .to_string();
        let bytes = serde_json::to_vec(record)?;

        let mut table = txn.open_table(collection.table())?;
        let previous: Option<Value> = table
            .get(id.as_str())?
            .map(|guard| serde_json::from_slice(guard.value()))
            .transpose()?;
        table.insert(id.as_str(), bytes.as_slice())?;
        drop(table);

        for field in collection.indexes() {
            let name = schema::index_table_name(collection, field);
            let mut index = txn.open_table(schema::index_table(&name))?;
            if let Some(old_key) = previous.as_ref().and_then(|p| index_key_of(p, field)) {
                index.remove((old_key.as_str(), id.as_str()))?;
            }
            if let Some(new_key) = index_key_of(record, field) {
                index.insert((new_key.as_str(), id.as_str()), ())?;
            }
        }
        Ok(())
    }

    pub fn put_raw(&self, collection: Collection, record: &Value) -> StoreResult<()> {
        let txn = self.begin_write()?;
        self.put_raw_in(&txn, collection, record)?;
        txn.commit()?;
        Ok(())
    }

    /// Remove a record and its index entries. Returns whether it existed.
    pub fn delete_in(
        &self,
        txn: &WriteTransaction,
        collection: Collection,
        id: &str,
    ) -> StoreResult<bool> {
        let mut table = txn.open_table(collection.table())?;
        let previous: Option<Value> = table
            .get(id)?
            .map(|guard| serde_json::from_slice(guard.value()))
            .transpose()?;
        table.remove(id)?;
        drop(table);

        let Some(previous) = previous else {
            return Ok(false);
        };
        for field in collection.indexes() {
            if let Some(key) = index_key_of(&previous, field) {
                let name = schema::index_table_name(collection, field);
                let mut index = txn.open_table(schema::index_table(&name))?;
                index.remove((key.as_str(), id))?;
            }
        }
        Ok(true)
    }

    pub fn get_all_by_index_raw(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> StoreResult<Vec<Value>> {
        let read_txn = self.db.begin_read()?;
        let name = schema::index_table_name(collection, field);
        let index = read_txn.open_table(schema::index_table(&name))?;
        let table = read_txn.open_table(collection.table())?;

        let mut records = Vec::new();
        for result in index.range((value, "")..)? {
            let (key, _) = result?;
            let (indexed, id) = key.value();
            if indexed != value {
                break;
            }
            if let Some(guard) = table.get(id)? {
                records.push(serde_json::from_slice(guard.value())?);
            }
        }
        Ok(records)
    }

    /// Records whose indexed value falls in `[from, to)`, ordered by value.
    pub fn get_range_by_index_raw(
        &self,
        collection: Collection,
        field: &str,
        from: &str,
        to: &str,
    ) -> StoreResult<Vec<Value>> {
        let read_txn = self.db.begin_read()?;
        let name = schema::index_table_name(collection, field);
        let index = read_txn.open_table(schema::index_table(&name))?;
        let table = read_txn.open_table(collection.table())?;

        let mut records = Vec::new();
        for result in index.range((from, "")..(to, ""))? {
            let (key, _) = result?;
            let (_, id) = key.value();
            if let Some(guard) = table.get(id)? {
                records.push(serde_json::from_slice(guard.value())?);
            }
        }
        Ok(records)
    }

    fn index_bound(
        &self,
        collection: Collection,
        field: &str,
        last: bool,
    ) -> StoreResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let name = schema::index_table_name(collection, field);
        let index = read_txn.open_table(schema::index_table(&name))?;
        let entry = if last { index.last()? } else { index.first()? };
        Ok(entry.map(|(key, _)| key.value().0.to_string()))
    }

    /// Smallest indexed value in the collection (e.g. the oldest date).
    pub fn index_min(&self, collection: Collection, field: &str) -> StoreResult<Option<String>> {
        self.index_bound(collection, field, false)
    }

    /// Largest indexed value in the collection (e.g. the newest date).
    pub fn index_max(&self, collection: Collection, field: &str) -> StoreResult<Option<String>> {
        self.index_bound(collection, field, true)
    }

    // ========== Typed access ==========

    pub fn get<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &str,
    ) -> StoreResult<Option<T>> {
        self.get_raw(collection, id)?
            .map(|v| serde_json::from_value(v).map_err(StoreError::from))
            .transpose()
    }

    pub fn get_in<T: DeserializeOwned>(
        &self,
        txn: &WriteTransaction,
        collection: Collection,
        id: &str,
    ) -> StoreResult<Option<T>> {
        self.get_raw_in(txn, collection, id)?
            .map(|v| serde_json::from_value(v).map_err(StoreError::from))
            .transpose()
    }

    pub fn get_all<T: DeserializeOwned>(&self, collection: Collection) -> StoreResult<Vec<T>> {
        self.get_all_raw(collection)?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(StoreError::from))
            .collect()
    }

    pub fn put<T: Serialize>(&self, collection: Collection, record: &T) -> StoreResult<()> {
        self.put_raw(collection, &serde_json::to_value(record)?)
    }

    pub fn put_in<T: Serialize>(
        &self,
        txn: &WriteTransaction,
        collection: Collection,
        record: &T,
    ) -> StoreResult<()> {
        self.put_raw_in(txn, collection, &serde_json::to_value(record)?)
    }

    pub fn get_all_by_index<T: DeserializeOwned>(
        &self,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> StoreResult<Vec<T>> {
        self.get_all_by_index_raw(collection, field, value)?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(StoreError::from))
            .collect()
    }

    pub fn get_range_by_index<T: DeserializeOwned>(
        &self,
        collection: Collection,
        field: &str,
        from: &str,
        to: &str,
    ) -> StoreResult<Vec<T>> {
        self.get_range_by_index_raw(collection, field, from, to)?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(StoreError::from))
            .collect()
    }

    /// Index lookup inside a write transaction (invariant checks).
    pub fn get_all_by_index_in<T: DeserializeOwned>(
        &self,
        txn: &WriteTransaction,
        collection: Collection,
        field: &str,
        value: &str,
    ) -> StoreResult<Vec<T>> {
        let name = schema::index_table_name(collection, field);
        let index = txn.open_table(schema::index_table(&name))?;
        let table = txn.open_table(collection.table())?;

        let mut records = Vec::new();
        for result in index.range((value, "")..)? {
            let (key, _) = result?;
            let (indexed, id) = key.value();
            if indexed != value {
                break;
            }
            if let Some(guard) = table.get(id)? {
                records.push(serde_json::from_value(serde_json::from_slice(
                    guard.value(),
                )?)?);
            }
        }
        Ok(records)
    }
}

/// Index key for a JSON field. Strings index as-is; numbers and booleans
/// by their canonical rendering; anything else is not indexed.
fn index_key_of(record: &Value, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// Re-exported for migrations and tests that poke at tables directly.
pub(crate) const META_TABLE: TableDefinition<'static, &'static str, u64> =
    TableDefinition::new("schema_meta");

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_get_roundtrip() {
        let store = LocalStore::open_in_memory().unwrap();
        let record = json!({"id": "p1", "name": "Yerba", "price": 1500.0, "syncStatus": "PENDING"});
        store.put_raw(Collection::Products, &record).unwrap();

        let loaded = store.get_raw(Collection::Products, "p1").unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(store.get_raw(Collection::Products, "p2").unwrap().is_none());
    }

    #[test]
    fn put_without_id_is_rejected() {
        let store = LocalStore::open_in_memory().unwrap();
        let err = store
            .put_raw(Collection::Products, &json!({"name": "sin id"}))
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingId(Collection::Products)));
    }

    #[test]
    fn index_follows_updates() {
        let store = LocalStore::open_in_memory().unwrap();
        let open = json!({"id": "s1", "status": "OPEN", "userId": "u1"});
        store.put_raw(Collection::Shifts, &open).unwrap();

        let hits = store
            .get_all_by_index_raw(Collection::Shifts, "status", "OPEN")
            .unwrap();
        assert_eq!(hits.len(), 1);

        // Re-put under the same id with a new status: the old index entry
        // must disappear.
        let closed = json!({"id": "s1", "status": "CLOSED", "userId": "u1"});
        store.put_raw(Collection::Shifts, &closed).unwrap();

        assert!(
            store
                .get_all_by_index_raw(Collection::Shifts, "status", "OPEN")
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            store
                .get_all_by_index_raw(Collection::Shifts, "status", "CLOSED")
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn index_bounds_give_watermarks() {
        let store = LocalStore::open_in_memory().unwrap();
        for (id, date) in [
            ("v2", "2025-03-02T10:00:00.000Z"),
            ("v1", "2025-03-01T09:00:00.000Z"),
            ("v3", "2025-03-03T11:00:00.000Z"),
        ] {
            store
                .put_raw(
                    Collection::Sales,
                    &json!({"id": id, "date": date, "total": 1.0}),
                )
                .unwrap();
        }

        assert_eq!(
            store.index_min(Collection::Sales, "date").unwrap().unwrap(),
            "2025-03-01T09:00:00.000Z"
        );
        assert_eq!(
            store.index_max(Collection::Sales, "date").unwrap().unwrap(),
            "2025-03-03T11:00:00.000Z"
        );
    }

    #[test]
    fn delete_clears_index_entries() {
        let store = LocalStore::open_in_memory().unwrap();
        store
            .put_raw(
                Collection::CashMovements,
                &json!({"id": "m1", "shiftId": "s1", "date": "2025-03-01T09:00:00.000Z"}),
            )
            .unwrap();

        let txn = store.begin_write().unwrap();
        assert!(store.delete_in(&txn, Collection::CashMovements, "m1").unwrap());
        assert!(!store.delete_in(&txn, Collection::CashMovements, "m1").unwrap());
        txn.commit().unwrap();

        assert!(
            store
                .get_all_by_index_raw(Collection::CashMovements, "shiftId", "s1")
                .unwrap()
                .is_empty()
        );
    }
}
