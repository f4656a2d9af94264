//! Shared domain types for the caja terminal.
//!
//! Everything that crosses a crate boundary lives here: the record
//! collections mirrored between the local store and the cloud store, the
//! sync metadata they carry, and the time/id/money helpers both sides use.

pub mod models;
pub mod util;

// Re-export the types almost every consumer needs
pub use models::{
    CashMovement, Client, ConfigEntry, MovementKind, Sale, SaleStatus, Shift, ShiftStatus,
    SyncStatus,
};
