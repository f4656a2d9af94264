//! Config Repository
//!
//! Key/value device and company settings. Entries ride the same sync
//! machinery as every other collection, which is how the master PIN
//! propagates to all of a company's terminals.

use super::{RepoError, RepoResult};
use crate::store::{Collection, LocalStore};
use shared::models::{ConfigEntry, MASTER_PIN_KEY, SyncStatus};
use shared::util;

#[derive(Clone)]
pub struct ConfigRepository {
    store: LocalStore,
}

impl ConfigRepository {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn get(&self, key: &str) -> RepoResult<Option<ConfigEntry>> {
        Ok(self.store.get(Collection::Config, key)?)
    }

    pub fn set(&self, key: &str, value: serde_json::Value) -> RepoResult<ConfigEntry> {
        if key.trim().is_empty() {
            return Err(RepoError::Validation("Config key is required".into()));
        }
        let entry = ConfigEntry {
            id: key.to_string(),
            value,
            updated_at: util::now(),
            sync_status: SyncStatus::Pending,
            synced_at: None,
        };
        self.store.put(Collection::Config, &entry)?;
        Ok(entry)
    }

    pub fn master_pin(&self) -> RepoResult<Option<String>> {
        Ok(self
            .get(MASTER_PIN_KEY)?
            .and_then(|entry| entry.value.as_str().map(str::to_string)))
    }

    pub fn set_master_pin(&self, pin: &str) -> RepoResult<()> {
        if pin.len() < 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(RepoError::Validation(
                "Master PIN must be at least 4 digits".into(),
            ));
        }
        self.set(MASTER_PIN_KEY, serde_json::Value::String(pin.to_string()))?;
        Ok(())
    }
}
