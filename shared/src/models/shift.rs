//! Register shift: the unit of cash accountability.

use super::record::SyncStatus;
use super::serde_helpers;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shift status. `Closed` is terminal: a closed shift is never reopened.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftStatus {
    #[default]
    Open,
    Closed,
}

/// One cash-register session, from open to close.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub id: String,

    #[serde(default)]
    pub status: ShiftStatus,

    /// Operator who opened the shift
    pub user_id: String,

    #[serde(with = "serde_helpers::iso_millis")]
    pub opened_at: DateTime<Utc>,

    /// None while the shift is open
    #[serde(
        default,
        with = "serde_helpers::option_iso_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub closed_at: Option<DateTime<Utc>>,

    /// Opening float counted into the drawer
    #[serde(default)]
    pub initial_amount: f64,

    /// Cash declared by the operator at close (blind count)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_cash: Option<f64>,

    /// System-computed expected cash, stamped at close
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_cash: Option<f64>,

    /// final_cash - expected_cash
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difference: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(default)]
    pub sync_status: SyncStatus,

    #[serde(
        default,
        with = "serde_helpers::option_iso_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub synced_at: Option<DateTime<Utc>>,
}

impl Shift {
    pub fn is_open(&self) -> bool {
        self.status == ShiftStatus::Open
    }
}

/// Open-shift payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftOpen {
    pub user_id: String,
    #[serde(default)]
    pub initial_amount: f64,
    pub note: Option<String>,
}

/// Close-shift payload. `declared_cash` is the operator's blind count; the
/// expected figure is computed inside the close, never supplied by the
/// caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftClose {
    pub declared_cash: f64,
    pub note: Option<String>,
}
