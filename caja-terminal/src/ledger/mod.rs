//! Cash ledger: derived balances over the append-only movement stream.
//!
//! Balances are always recomputed from the full movement set — the sum is
//! commutative, so the result is deterministic regardless of insertion
//! order, and there is no cached figure to drift.

pub mod audit;

pub use audit::ShiftAudit;

use serde::Serialize;
use shared::models::{CashMovement, MovementKind, Shift};
use shared::util::round_money;
use thiserror::Error;

use crate::store::{Collection, LocalStore, StoreError};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Shift {0} not found")]
    ShiftNotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Which side of the drawer a payment method lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentChannel {
    Cash,
    Digital,
}

/// Classify a payment method string. Unknown methods default to cash on
/// purpose: an unrecognized channel is conservatively treated as money in
/// the drawer, so it shows up in the count rather than vanishing.
pub fn classify_method(method: &str) -> PaymentChannel {
    let method = method.trim().to_lowercase();
    if method.contains("mercado")
        || method.contains("clover")
        || method.contains("card")
        || method == "point"
    {
        PaymentChannel::Digital
    } else {
        PaymentChannel::Cash
    }
}

/// Live balance of one shift, all figures rounded to 2 decimals.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftBalance {
    /// Expected drawer content: opening float + cash in − cash out
    pub total_cash: f64,
    /// Money that went to digital channels, never in the drawer
    pub total_digital: f64,
    pub sales_cash: f64,
    pub sales_digital: f64,
    /// Deposits besides the opening float
    pub deposits: f64,
    pub withdrawals: f64,
    pub expenses: f64,
}

/// Reduce a shift's movement set into its balance. Pure; shift-close and
/// the audit report both go through here so the two paths can't diverge.
pub fn reduce_movements(initial_amount: f64, movements: &[CashMovement]) -> ShiftBalance {
    let mut total_cash = initial_amount;
    let mut total_digital = 0.0;
    let mut sales_cash = 0.0;
    let mut sales_digital = 0.0;
    let mut deposits = 0.0;
    let mut withdrawals = 0.0;
    let mut expenses = 0.0;

    for movement in movements {
        match movement.kind {
            MovementKind::Sale => match classify_method(&movement.method) {
                PaymentChannel::Cash => {
                    total_cash += movement.amount;
                    sales_cash += movement.amount;
                }
                PaymentChannel::Digital => {
                    total_digital += movement.amount;
                    sales_digital += movement.amount;
                }
            },
            MovementKind::Deposit => {
                // The opening float is already the starting balance.
                if !movement.is_opening_float() {
                    total_cash += movement.amount;
                    deposits += movement.amount;
                }
            }
            MovementKind::Withdrawal => {
                total_cash -= movement.amount;
                withdrawals += movement.amount;
            }
            MovementKind::Expense => {
                total_cash -= movement.amount;
                expenses += movement.amount;
            }
        }
    }

    ShiftBalance {
        total_cash: round_money(total_cash),
        total_digital: round_money(total_digital),
        sales_cash: round_money(sales_cash),
        sales_digital: round_money(sales_digital),
        deposits: round_money(deposits),
        withdrawals: round_money(withdrawals),
        expenses: round_money(expenses),
    }
}

/// Read-side of the cash ledger.
#[derive(Clone)]
pub struct CashLedger {
    store: LocalStore,
}

impl CashLedger {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Live balance of a shift, computed from its movement set.
    pub fn shift_balance(&self, shift_id: &str) -> LedgerResult<ShiftBalance> {
        let shift: Shift = self
            .store
            .get(Collection::Shifts, shift_id)?
            .ok_or_else(|| LedgerError::ShiftNotFound(shift_id.to_string()))?;
        let movements: Vec<CashMovement> =
            self.store
                .get_all_by_index(Collection::CashMovements, "shiftId", shift_id)?;
        Ok(reduce_movements(shift.initial_amount, &movements))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{OPENING_FLOAT_REF, SyncStatus};
    use shared::util;

    fn movement(kind: MovementKind, method: &str, amount: f64) -> CashMovement {
        CashMovement {
            id: util::record_id(),
            shift_id: "s1".into(),
            kind,
            method: method.into(),
            amount,
            description: String::new(),
            date: util::now(),
            reference: None,
            user_id: None,
            sync_status: SyncStatus::Pending,
            synced_at: None,
        }
    }

    fn opening(amount: f64) -> CashMovement {
        CashMovement {
            reference: Some(OPENING_FLOAT_REF.into()),
            ..movement(MovementKind::Deposit, "cash", amount)
        }
    }

    #[test]
    fn cash_sale_raises_drawer_total() {
        let balance = reduce_movements(
            1000.0,
            &[opening(1000.0), movement(MovementKind::Sale, "cash", 500.0)],
        );
        assert_eq!(balance.total_cash, 1500.0);
        assert_eq!(balance.sales_cash, 500.0);
        assert_eq!(balance.total_digital, 0.0);
    }

    #[test]
    fn digital_sale_leaves_drawer_untouched() {
        let balance = reduce_movements(
            200.0,
            &[
                opening(200.0),
                movement(MovementKind::Sale, "mercadopago", 300.0),
            ],
        );
        assert_eq!(balance.total_cash, 200.0);
        assert_eq!(balance.total_digital, 300.0);
        assert_eq!(balance.sales_digital, 300.0);
    }

    #[test]
    fn balance_identity_holds_to_two_decimals() {
        let movements = vec![
            opening(100.0),
            movement(MovementKind::Sale, "cash", 10.10),
            movement(MovementKind::Sale, "efectivo", 0.1),
            movement(MovementKind::Deposit, "cash", 50.0),
            movement(MovementKind::Withdrawal, "cash", 30.55),
            movement(MovementKind::Expense, "cash", 19.99),
        ];
        let balance = reduce_movements(100.0, &movements);
        // 100 + 50 + 10.20 - 30.55 - 19.99
        assert_eq!(balance.total_cash, 109.66);
        assert_eq!(balance.deposits, 50.0);
        assert_eq!(balance.withdrawals, 30.55);
        assert_eq!(balance.expenses, 19.99);
    }

    #[test]
    fn reduction_is_order_independent() {
        let mut movements = vec![
            opening(100.0),
            movement(MovementKind::Sale, "cash", 12.34),
            movement(MovementKind::Expense, "cash", 5.0),
            movement(MovementKind::Sale, "card", 40.0),
        ];
        let forward = reduce_movements(100.0, &movements);
        movements.reverse();
        let backward = reduce_movements(100.0, &movements);
        assert_eq!(forward.total_cash, backward.total_cash);
        assert_eq!(forward.total_digital, backward.total_digital);
    }

    #[test]
    fn unknown_methods_count_as_cash() {
        assert_eq!(classify_method("cash"), PaymentChannel::Cash);
        assert_eq!(classify_method("efectivo"), PaymentChannel::Cash);
        assert_eq!(classify_method("qr-del-barrio"), PaymentChannel::Cash);
        assert_eq!(classify_method("MercadoPago"), PaymentChannel::Digital);
        assert_eq!(classify_method(" clover "), PaymentChannel::Digital);
        assert_eq!(classify_method("debit card"), PaymentChannel::Digital);
        assert_eq!(classify_method("point"), PaymentChannel::Digital);
        // "pointless" only *contains* point; the rule is equality
        assert_eq!(classify_method("pointless"), PaymentChannel::Cash);
    }
}
