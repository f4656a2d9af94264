//! Sync metadata shared by every record collection.

use serde::{Deserialize, Serialize};

/// Has this local mutation been durably mirrored to the cloud store?
///
/// Defaults to `Pending` so documents written before the flag existed (or
/// fetched from sources that never stamp it) deserialize as not-yet-synced
/// rather than silently synced.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    #[default]
    Pending,
    Synced,
}

impl SyncStatus {
    pub fn is_synced(self) -> bool {
        matches!(self, SyncStatus::Synced)
    }
}

// JSON field names the sync engine reads when it works on raw documents.
pub const ID_FIELD: &str = "id";
pub const NAME_FIELD: &str = "name";
pub const DATE_FIELD: &str = "date";
pub const SYNC_STATUS_FIELD: &str = "syncStatus";
pub const SYNCED_AT_FIELD: &str = "syncedAt";
pub const SYNCED: &str = "SYNCED";
pub const PENDING: &str = "PENDING";
