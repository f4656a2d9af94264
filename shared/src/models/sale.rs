//! Sales and their fiscal (AFIP) authorization state.

use super::record::SyncStatus;
use super::serde_helpers;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    #[default]
    Completed,
    Cancelled,
}

/// Where the sale stands with the tax authority.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FiscalStatus {
    /// No invoice requested for this sale
    #[default]
    Skipped,
    /// Submitted but not yet authorized (offline, or authority error)
    Pending,
    Approved,
    Voided,
}

/// Result shape returned by the remote billing collaborator. The engine
/// only consumes this; the tax protocol itself lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiscalAuthorization {
    pub cae: String,
    pub numero: i64,
    pub tipo: String,
    pub qr_data: String,
    /// CAE expiry (vencimiento), as the authority reports it
    pub vto: String,
}

/// Fiscal sub-object persisted on the sale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiscalInfo {
    #[serde(default)]
    pub status: FiscalStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cae: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vto: Option<String>,
}

impl FiscalInfo {
    pub fn approved(auth: FiscalAuthorization) -> Self {
        Self {
            status: FiscalStatus::Approved,
            cae: Some(auth.cae),
            numero: Some(auth.numero),
            tipo: Some(auth.tipo),
            qr_data: Some(auth.qr_data),
            vto: Some(auth.vto),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    /// None for ad-hoc line items not backed by a catalog product
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub name: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl SaleItem {
    pub fn line_total(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

/// One entry of the payment breakdown. `amount_debt` goes to the client's
/// running account instead of the drawer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalePayment {
    pub method: String,
    #[serde(default)]
    pub amount_paid: f64,
    #[serde(default)]
    pub amount_debt: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    /// Local identifier, also the cloud document key (idempotent re-upload)
    pub id: String,

    #[serde(with = "serde_helpers::iso_millis")]
    pub date: DateTime<Utc>,

    /// The shift the sale was registered under
    pub shift_id: String,

    #[serde(default)]
    pub status: SaleStatus,

    pub total: f64,

    pub items: Vec<SaleItem>,

    pub payments: Vec<SalePayment>,

    /// None for anonymous sales
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default)]
    pub fiscal: FiscalInfo,

    #[serde(default)]
    pub sync_status: SyncStatus,

    #[serde(
        default,
        with = "serde_helpers::option_iso_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub synced_at: Option<DateTime<Utc>>,
}

impl Sale {
    pub fn paid_total(&self) -> f64 {
        self.payments.iter().map(|p| p.amount_paid).sum()
    }

    pub fn debt_total(&self) -> f64 {
        self.payments.iter().map(|p| p.amount_debt).sum()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == SaleStatus::Cancelled
    }
}
