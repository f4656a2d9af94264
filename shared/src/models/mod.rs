//! Record collections mirrored between the local store and the cloud.
//!
//! Every record serializes to camelCase JSON with ISO-8601 UTC dates —
//! the exact document shape the cloud store holds, so a record can travel
//! local → cloud → another device without translation.

pub mod cash_movement;
pub mod catalog;
pub mod client;
pub mod config;
pub mod product;
pub mod record;
pub mod sale;
pub mod serde_helpers;
pub mod shift;

pub use cash_movement::{CashMovement, MovementKind, OPENING_FLOAT_REF};
pub use catalog::{Brand, Category, Supplier};
pub use client::{Client, LedgerEntry, LedgerEntryKind};
pub use config::{ConfigEntry, MASTER_PIN_KEY};
pub use product::{Product, StockMovement, StockMovementKind};
pub use record::SyncStatus;
pub use sale::{FiscalAuthorization, FiscalInfo, FiscalStatus, Sale, SaleItem, SalePayment, SaleStatus};
pub use shift::{Shift, ShiftClose, ShiftOpen, ShiftStatus};
