//! Small reference collections: categories, brands, suppliers.
//!
//! Their `name` is the duplicate-fusion key — two devices creating
//! "Bebidas" independently converge onto one cloud identifier.

use super::record::SyncStatus;
use super::serde_helpers;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! reference_record {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            pub id: String,
            pub name: String,

            #[serde(default)]
            pub sync_status: SyncStatus,

            #[serde(
                default,
                with = "serde_helpers::option_iso_millis",
                skip_serializing_if = "Option::is_none"
            )]
            pub synced_at: Option<DateTime<Utc>>,
        }

        impl $name {
            pub fn new(name: impl Into<String>) -> Self {
                Self {
                    id: crate::util::record_id(),
                    name: name.into(),
                    sync_status: SyncStatus::Pending,
                    synced_at: None,
                }
            }
        }
    };
}

reference_record!(Category);
reference_record!(Brand);
reference_record!(Supplier);
