//! Ordered, idempotent, additive-only schema migrations.
//!
//! The stored version is a monotonically increasing integer in
//! `schema_meta`. Opening the store applies every migration whose version
//! exceeds it, ascending, each committed together with its version bump so
//! a crash mid-upgrade resumes cleanly.

use super::schema::{self, Collection};
use super::{META_TABLE, StoreError, StoreResult};
use redb::{Database, ReadTransaction, ReadableTable, WriteTransaction};
use serde_json::Value;
use shared::models::record::SYNC_STATUS_FIELD;

const VERSION_KEY: &str = "version";

/// Version the code expects; `run` brings any older store up to this.
pub const SCHEMA_VERSION: u64 = 4;

struct Migration {
    version: u64,
    name: &'static str,
    apply: fn(&WriteTransaction) -> StoreResult<()>,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "base collections",
        apply: migrate_base_collections,
    },
    Migration {
        version: 2,
        name: "kardex movements",
        apply: migrate_kardex,
    },
    Migration {
        version: 3,
        name: "explicit sync status",
        apply: migrate_sync_status_backfill,
    },
    Migration {
        version: 4,
        name: "users and config",
        apply: migrate_users_config,
    },
];

pub(crate) fn run(db: &Database) -> StoreResult<()> {
    let txn = db.begin_write()?;
    let current = {
        let table = txn.open_table(META_TABLE)?;
        table.get(VERSION_KEY)?.map(|g| g.value()).unwrap_or(0)
    };
    txn.commit()?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let txn = db.begin_write()?;
        (migration.apply)(&txn)
            .map_err(|e| StoreError::Migration(migration.version, e.to_string()))?;
        {
            let mut table = txn.open_table(META_TABLE)?;
            table.insert(VERSION_KEY, migration.version)?;
        }
        txn.commit()?;
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "applied schema migration"
        );
    }
    Ok(())
}

pub(crate) fn current_version_read(txn: &ReadTransaction) -> StoreResult<u64> {
    let table = txn.open_table(META_TABLE)?;
    Ok(table.get(VERSION_KEY)?.map(|g| g.value()).unwrap_or(0))
}

/// Open a collection's table and every index table it declares. Opening
/// is creation-if-missing, which is what keeps migrations idempotent.
fn ensure_collection(txn: &WriteTransaction, collection: Collection) -> StoreResult<()> {
    let _ = txn.open_table(collection.table())?;
    for field in collection.indexes() {
        let name = schema::index_table_name(collection, field);
        let _ = txn.open_table(schema::index_table(&name))?;
    }
    Ok(())
}

fn migrate_base_collections(txn: &WriteTransaction) -> StoreResult<()> {
    for collection in [
        Collection::Products,
        Collection::Sales,
        Collection::Clients,
        Collection::Shifts,
        Collection::CashMovements,
        Collection::Categories,
        Collection::Brands,
        Collection::Suppliers,
    ] {
        ensure_collection(txn, collection)?;
    }
    Ok(())
}

fn migrate_kardex(txn: &WriteTransaction) -> StoreResult<()> {
    ensure_collection(txn, Collection::Movements)
}

/// Records written before the sync flag existed carried no `syncStatus`
/// field; queries used to treat absence as "pending" everywhere. Stamp
/// them once here so the tri-state never leaks past this version.
fn migrate_sync_status_backfill(txn: &WriteTransaction) -> StoreResult<()> {
    for collection in [
        Collection::Products,
        Collection::Sales,
        Collection::Clients,
        Collection::Shifts,
        Collection::CashMovements,
        Collection::Movements,
        Collection::Categories,
        Collection::Brands,
        Collection::Suppliers,
    ] {
        let mut table = txn.open_table(collection.table())?;

        let mut stamped: Vec<(String, Vec<u8>)> = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            let mut record: Value = serde_json::from_slice(value.value())?;
            if record.get(SYNC_STATUS_FIELD).is_none() {
                record[SYNC_STATUS_FIELD] = Value::String("PENDING".to_string());
                stamped.push((key.value().to_string(), serde_json::to_vec(&record)?));
            }
        }

        let count = stamped.len();
        for (id, bytes) in &stamped {
            table.insert(id.as_str(), bytes.as_slice())?;
        }
        if count > 0 {
            tracing::info!(collection = %collection, count, "backfilled syncStatus=PENDING");
        }
    }
    Ok(())
}

fn migrate_users_config(txn: &WriteTransaction) -> StoreResult<()> {
    ensure_collection(txn, Collection::Users)?;
    ensure_collection(txn, Collection::Config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;
    use serde_json::json;

    #[test]
    fn fresh_store_is_at_latest_version() {
        let store = LocalStore::open_in_memory().unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn reopen_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terminal.redb");

        {
            let store = LocalStore::open(&path).unwrap();
            store
                .put_raw(Collection::Products, &json!({"id": "p1", "name": "Fideos"}))
                .unwrap();
        }

        let store = LocalStore::open(&path).unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
        assert!(store.get_raw(Collection::Products, "p1").unwrap().is_some());
    }

    #[test]
    fn sync_status_backfill_stamps_legacy_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.redb");

        // Hand-build a v2-era store: collections exist, records carry no
        // syncStatus, version says 2.
        {
            let db = redb::Database::create(&path).unwrap();
            let txn = db.begin_write().unwrap();
            migrate_base_collections(&txn).unwrap();
            migrate_kardex(&txn).unwrap();
            {
                let mut products = txn.open_table(Collection::Products.table()).unwrap();
                let legacy = serde_json::to_vec(&json!({"id": "p1", "name": "Aceite"})).unwrap();
                products.insert("p1", legacy.as_slice()).unwrap();

                let mut meta = txn.open_table(META_TABLE).unwrap();
                meta.insert(VERSION_KEY, 2u64).unwrap();
            }
            txn.commit().unwrap();
        }

        let store = LocalStore::open(&path).unwrap();
        assert_eq!(store.schema_version().unwrap(), SCHEMA_VERSION);
        let record = store.get_raw(Collection::Products, "p1").unwrap().unwrap();
        assert_eq!(record["syncStatus"], "PENDING");
    }
}
