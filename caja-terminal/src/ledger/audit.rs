//! End-of-shift audit report.
//!
//! Deliberately computed twice, two ways: the sales side comes from the
//! sales table restricted to the shift's time window, while expected cash
//! comes from the movement log. A gap between the two paths points at a
//! bug or at tampering, not at a rounding artifact.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::models::serde_helpers::to_wire;
use shared::models::{FiscalStatus, Sale, Shift};
use shared::util::{self, round_money};
use std::collections::BTreeMap;

use super::{CashLedger, LedgerError, LedgerResult, ShiftBalance, reduce_movements};
use crate::store::Collection;

/// Closing report for one shift.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftAudit {
    pub shift_id: String,
    #[serde(with = "shared::models::serde_helpers::iso_millis")]
    pub opened_at: DateTime<Utc>,
    #[serde(
        with = "shared::models::serde_helpers::option_iso_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub closed_at: Option<DateTime<Utc>>,

    /// Non-cancelled sales dated inside the shift window
    pub sale_count: usize,
    pub total_sales: f64,
    /// Collected amounts per payment method (debt excluded)
    pub sales_by_method: BTreeMap<String, f64>,

    /// Sales total carrying an approved authorization
    pub fiscal_approved_total: f64,
    /// Sales total still waiting on the authority
    pub fiscal_pending_total: f64,

    /// Movement-log side of the cross-check
    pub balance: ShiftBalance,
    pub expected_cash: f64,
    /// Declared count if the shift closed, live expected otherwise
    pub actual_cash: f64,
    pub deviation: f64,
}

impl CashLedger {
    /// Build the closing report. Sales are selected by their own dates —
    /// `[opened_at, closed_at)`, with "now" standing in while the shift is
    /// still open — independent of the movement log.
    pub fn shift_audit(&self, shift_id: &str) -> LedgerResult<ShiftAudit> {
        let shift: Shift = self
            .store
            .get(Collection::Shifts, shift_id)?
            .ok_or_else(|| LedgerError::ShiftNotFound(shift_id.to_string()))?;

        // Wire dates are truncated to milliseconds, so push the exclusive
        // end one millisecond past the boundary: a sale stamped in the
        // same millisecond as the close still belongs to the shift.
        let window_end =
            shift.closed_at.unwrap_or_else(util::now) + chrono::Duration::milliseconds(1);
        let sales: Vec<Sale> = self.store.get_range_by_index(
            Collection::Sales,
            "date",
            &to_wire(&shift.opened_at),
            &to_wire(&window_end),
        )?;

        let mut total_sales = 0.0;
        let mut fiscal_approved_total = 0.0;
        let mut fiscal_pending_total = 0.0;
        let mut by_method: BTreeMap<String, f64> = BTreeMap::new();
        let mut sale_count = 0;

        for sale in sales.iter().filter(|s| !s.is_cancelled()) {
            sale_count += 1;
            total_sales += sale.total;
            match sale.fiscal.status {
                FiscalStatus::Approved => fiscal_approved_total += sale.total,
                FiscalStatus::Pending => fiscal_pending_total += sale.total,
                FiscalStatus::Skipped | FiscalStatus::Voided => {}
            }
            for payment in &sale.payments {
                if payment.amount_paid > 0.0 {
                    *by_method.entry(payment.method.clone()).or_insert(0.0) +=
                        payment.amount_paid;
                }
            }
        }
        for amount in by_method.values_mut() {
            *amount = round_money(*amount);
        }

        let movements = self
            .store
            .get_all_by_index(Collection::CashMovements, "shiftId", shift_id)?;
        let balance = reduce_movements(shift.initial_amount, &movements);

        let expected_cash = balance.total_cash;
        let actual_cash = match shift.final_cash {
            Some(declared) => declared,
            None => expected_cash,
        };

        Ok(ShiftAudit {
            shift_id: shift.id,
            opened_at: shift.opened_at,
            closed_at: shift.closed_at,
            sale_count,
            total_sales: round_money(total_sales),
            sales_by_method: by_method,
            fiscal_approved_total: round_money(fiscal_approved_total),
            fiscal_pending_total: round_money(fiscal_pending_total),
            expected_cash,
            actual_cash: round_money(actual_cash),
            deviation: round_money(actual_cash - expected_cash),
            balance,
        })
    }
}
