//! Device/company configuration entries, synced like any other collection.

use super::record::SyncStatus;
use super::serde_helpers;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Config key holding the master PIN used for privileged operations.
pub const MASTER_PIN_KEY: &str = "master_pin";

/// One key/value config record. The key doubles as the record id, so the
/// same entry converges across devices by identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntry {
    /// The config key
    pub id: String,

    pub value: serde_json::Value,

    #[serde(with = "serde_helpers::iso_millis")]
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub sync_status: SyncStatus,

    #[serde(
        default,
        with = "serde_helpers::option_iso_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub synced_at: Option<DateTime<Utc>>,
}
