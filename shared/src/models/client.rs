//! Clients and their running-account ledger.

use super::record::SyncStatus;
use super::serde_helpers;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryKind {
    /// Increases what the client owes
    SaleDebt,
    /// Decreases what the client owes
    Payment,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LedgerEntryKind,
    /// Always positive; the kind carries the sign
    pub amount: f64,
    #[serde(with = "serde_helpers::iso_millis")]
    pub date: DateTime<Utc>,
    /// Sale or receipt this entry stems from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Cached running total. Must always equal [`Client::ledger_sum`];
    /// [`Client::apply_entry`] is the only writer.
    #[serde(default)]
    pub balance: f64,

    #[serde(default)]
    pub ledger: Vec<LedgerEntry>,

    #[serde(default)]
    pub sync_status: SyncStatus,

    #[serde(
        default,
        with = "serde_helpers::option_iso_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub synced_at: Option<DateTime<Utc>>,
}

impl Client {
    /// Signed sum of the ledger to date.
    pub fn ledger_sum(&self) -> f64 {
        let raw: f64 = self
            .ledger
            .iter()
            .map(|e| match e.kind {
                LedgerEntryKind::SaleDebt => e.amount,
                LedgerEntryKind::Payment => -e.amount,
            })
            .sum();
        crate::util::round_money(raw)
    }

    /// Append an entry and refresh the cached balance.
    pub fn apply_entry(&mut self, entry: LedgerEntry) {
        self.ledger.push(entry);
        self.balance = self.ledger_sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util;

    fn entry(kind: LedgerEntryKind, amount: f64) -> LedgerEntry {
        LedgerEntry {
            id: util::record_id(),
            kind,
            amount,
            date: util::now(),
            reference: None,
        }
    }

    #[test]
    fn balance_tracks_ledger_sum() {
        let mut client = Client {
            id: "c1".into(),
            name: "Mostrador".into(),
            document: None,
            phone: None,
            email: None,
            balance: 0.0,
            ledger: vec![],
            sync_status: SyncStatus::Pending,
            synced_at: None,
        };

        client.apply_entry(entry(LedgerEntryKind::SaleDebt, 150.0));
        client.apply_entry(entry(LedgerEntryKind::SaleDebt, 49.99));
        client.apply_entry(entry(LedgerEntryKind::Payment, 100.0));

        assert_eq!(client.balance, 99.99);
        assert_eq!(client.balance, client.ledger_sum());
    }
}
