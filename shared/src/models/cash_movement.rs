//! Append-only ledger of cash in and out of the drawer.

use super::record::SyncStatus;
use super::serde_helpers;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference tag on the synthetic deposit created when a shift opens.
/// The ledger excludes it from "additional deposits" tallies.
pub const OPENING_FLOAT_REF: &str = "opening-float";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    Deposit,
    Withdrawal,
    Sale,
    Expense,
}

/// One immutable ledger entry scoped to a shift.
///
/// Movements are never updated or deleted after creation; corrections are
/// made by inserting an offsetting movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashMovement {
    pub id: String,

    /// The shift this movement belongs to
    pub shift_id: String,

    #[serde(rename = "type")]
    pub kind: MovementKind,

    /// Payment channel, e.g. "cash", "mercadopago"
    pub method: String,

    /// Always positive; the kind carries the sign
    pub amount: f64,

    pub description: String,

    #[serde(with = "serde_helpers::iso_millis")]
    pub date: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default)]
    pub sync_status: SyncStatus,

    #[serde(
        default,
        with = "serde_helpers::option_iso_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub synced_at: Option<DateTime<Utc>>,
}

impl CashMovement {
    pub fn is_opening_float(&self) -> bool {
        self.reference.as_deref() == Some(OPENING_FLOAT_REF)
    }
}
