//! Sale Repository
//!
//! A sale fans out in one transaction: the sale record, one SALE movement
//! per collected payment entry, the client's running-account debt, and the
//! kardex/stock decrement per catalog item. Either all of it commits or
//! none of it does.

use super::cash_movement::{CashMovementCreate, CashMovementRepository};
use super::{RepoError, RepoResult, validate_positive_amount};
use crate::ledger::{PaymentChannel, classify_method};
use crate::store::{Collection, LocalStore, StoreError};
use shared::models::serde_helpers::to_wire;
use shared::models::{
    Client, FiscalAuthorization, FiscalInfo, FiscalStatus, LedgerEntry, LedgerEntryKind,
    MovementKind, Product, Sale, SaleItem, SalePayment, SaleStatus, Shift, StockMovement,
    StockMovementKind, SyncStatus,
};
use shared::util::{self, round_money};

/// Tolerance for comparing a payment breakdown against the item total.
const PAYMENT_TOLERANCE: f64 = 0.005;

#[derive(Debug, Clone)]
pub struct SaleCreate {
    pub items: Vec<SaleItem>,
    pub payments: Vec<SalePayment>,
    pub client_id: Option<String>,
    /// Ask the tax authority for an invoice (leaves fiscal PENDING until
    /// the billing collaborator answers)
    pub request_invoice: bool,
    pub user_id: Option<String>,
}

#[derive(Clone)]
pub struct SaleRepository {
    store: LocalStore,
}

impl SaleRepository {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn find_by_id(&self, id: &str) -> RepoResult<Option<Sale>> {
        Ok(self.store.get(Collection::Sales, id)?)
    }

    /// Sales dated in `[from, to)`, oldest first.
    pub fn find_in_range(
        &self,
        from: &chrono::DateTime<chrono::Utc>,
        to: &chrono::DateTime<chrono::Utc>,
    ) -> RepoResult<Vec<Sale>> {
        Ok(self
            .store
            .get_range_by_index(Collection::Sales, "date", &to_wire(from), &to_wire(to))?)
    }

    pub fn create(&self, data: SaleCreate) -> RepoResult<Sale> {
        if data.items.is_empty() {
            return Err(RepoError::Validation("Sale needs at least one item".into()));
        }
        for item in &data.items {
            validate_positive_amount(item.quantity, "Item quantity")?;
        }

        let total = round_money(data.items.iter().map(SaleItem::line_total).sum());
        let paid = round_money(data.payments.iter().map(|p| p.amount_paid).sum());
        let debt = round_money(data.payments.iter().map(|p| p.amount_debt).sum());
        if (paid + debt - total).abs() > PAYMENT_TOLERANCE {
            return Err(RepoError::Validation(format!(
                "Payment breakdown {} does not cover total {total}",
                round_money(paid + debt)
            )));
        }
        if debt > 0.0 && data.client_id.is_none() {
            return Err(RepoError::Validation(
                "Debt payments need a client account".into(),
            ));
        }

        let txn = self.store.begin_write()?;

        let shift: Option<Shift> = self
            .store
            .get_all_by_index_in::<Shift>(&txn, Collection::Shifts, "status", "OPEN")?
            .into_iter()
            .next();
        let shift =
            shift.ok_or_else(|| RepoError::Validation("No open shift to register the sale".into()))?;

        let now = util::now();
        let sale = Sale {
            id: util::record_id(),
            date: now,
            shift_id: shift.id.clone(),
            status: SaleStatus::Completed,
            total,
            items: data.items,
            payments: data.payments,
            client_id: data.client_id,
            fiscal: FiscalInfo {
                status: if data.request_invoice {
                    FiscalStatus::Pending
                } else {
                    FiscalStatus::Skipped
                },
                ..FiscalInfo::default()
            },
            sync_status: SyncStatus::Pending,
            synced_at: None,
        };
        self.store.put_in(&txn, Collection::Sales, &sale)?;

        // One drawer entry per collected payment channel.
        let movements = CashMovementRepository::new(self.store.clone());
        for payment in sale.payments.iter().filter(|p| p.amount_paid > 0.0) {
            movements.add_in(
                &txn,
                CashMovementCreate {
                    shift_id: shift.id.clone(),
                    kind: MovementKind::Sale,
                    method: payment.method.clone(),
                    amount: payment.amount_paid,
                    description: format!("Sale {}", sale.id),
                    reference: Some(sale.id.clone()),
                    user_id: data.user_id.clone(),
                },
            )?;
        }

        // Running account: debt lands on the client's ledger.
        if debt > 0.0
            && let Some(client_id) = &sale.client_id
        {
            let mut client: Client = self
                .store
                .get_in(&txn, Collection::Clients, client_id)?
                .ok_or_else(|| RepoError::NotFound(format!("Client {client_id} not found")))?;
            client.apply_entry(LedgerEntry {
                id: util::record_id(),
                kind: LedgerEntryKind::SaleDebt,
                amount: debt,
                date: now,
                reference: Some(sale.id.clone()),
            });
            client.sync_status = SyncStatus::Pending;
            client.synced_at = None;
            self.store.put_in(&txn, Collection::Clients, &client)?;
        }

        // Kardex + stock, for items backed by the catalog.
        for item in &sale.items {
            let Some(product_id) = &item.product_id else {
                continue;
            };
            let Some(mut product) =
                self.store
                    .get_in::<Product>(&txn, Collection::Products, product_id)?
            else {
                continue;
            };
            product.stock -= item.quantity;
            product.sync_status = SyncStatus::Pending;
            product.synced_at = None;
            self.store.put_in(&txn, Collection::Products, &product)?;
            self.store.put_in(
                &txn,
                Collection::Movements,
                &StockMovement {
                    id: util::record_id(),
                    product_id: product_id.clone(),
                    kind: StockMovementKind::Out,
                    quantity: item.quantity,
                    date: now,
                    reference: Some(sale.id.clone()),
                    sync_status: SyncStatus::Pending,
                    synced_at: None,
                },
            )?;
        }

        txn.commit().map_err(StoreError::from)?;
        tracing::info!(sale_id = %sale.id, total, paid, debt, "sale registered");
        Ok(sale)
    }

    /// Cancel a sale while its shift is still open. The movement log is
    /// append-only, so the undo is a set of offsetting entries: a
    /// WITHDRAWAL per cash payment (digital refunds reverse at the
    /// provider, not in the drawer), a PAYMENT ledger entry against the
    /// client debt, and a kardex IN per restocked item.
    pub fn cancel(&self, id: &str) -> RepoResult<Sale> {
        let txn = self.store.begin_write()?;
        let mut sale: Sale = self
            .store
            .get_in(&txn, Collection::Sales, id)?
            .ok_or_else(|| RepoError::NotFound(format!("Sale {id} not found")))?;
        if sale.is_cancelled() {
            return Err(RepoError::Validation(format!(
                "Sale {id} is already cancelled"
            )));
        }

        let shift: Shift = self
            .store
            .get_in(&txn, Collection::Shifts, &sale.shift_id)?
            .ok_or_else(|| RepoError::NotFound(format!("Shift {} not found", sale.shift_id)))?;
        if !shift.is_open() {
            return Err(RepoError::Validation(format!(
                "Sale {id} belongs to a closed shift; issue a credit note instead"
            )));
        }

        let movements = CashMovementRepository::new(self.store.clone());
        for payment in sale.payments.iter().filter(|p| p.amount_paid > 0.0) {
            if classify_method(&payment.method) != PaymentChannel::Cash {
                continue;
            }
            movements.add_in(
                &txn,
                CashMovementCreate {
                    shift_id: sale.shift_id.clone(),
                    kind: MovementKind::Withdrawal,
                    method: payment.method.clone(),
                    amount: payment.amount_paid,
                    description: format!("Void of sale {id}"),
                    reference: Some(format!("void:{id}")),
                    user_id: None,
                },
            )?;
        }

        let debt = sale.debt_total();
        if debt > 0.0
            && let Some(client_id) = &sale.client_id
            && let Some(mut client) =
                self.store
                    .get_in::<Client>(&txn, Collection::Clients, client_id)?
        {
            client.apply_entry(LedgerEntry {
                id: util::record_id(),
                kind: LedgerEntryKind::Payment,
                amount: debt,
                date: util::now(),
                reference: Some(format!("void:{id}")),
            });
            client.sync_status = SyncStatus::Pending;
            client.synced_at = None;
            self.store.put_in(&txn, Collection::Clients, &client)?;
        }

        for item in &sale.items {
            let Some(product_id) = &item.product_id else {
                continue;
            };
            let Some(mut product) =
                self.store
                    .get_in::<Product>(&txn, Collection::Products, product_id)?
            else {
                continue;
            };
            product.stock += item.quantity;
            product.sync_status = SyncStatus::Pending;
            product.synced_at = None;
            self.store.put_in(&txn, Collection::Products, &product)?;
            self.store.put_in(
                &txn,
                Collection::Movements,
                &StockMovement {
                    id: util::record_id(),
                    product_id: product_id.clone(),
                    kind: StockMovementKind::In,
                    quantity: item.quantity,
                    date: util::now(),
                    reference: Some(format!("void:{id}")),
                    sync_status: SyncStatus::Pending,
                    synced_at: None,
                },
            )?;
        }

        sale.status = SaleStatus::Cancelled;
        if sale.fiscal.status == FiscalStatus::Approved {
            sale.fiscal.status = FiscalStatus::Voided;
        }
        sale.sync_status = SyncStatus::Pending;
        sale.synced_at = None;
        self.store.put_in(&txn, Collection::Sales, &sale)?;
        txn.commit().map_err(StoreError::from)?;

        tracing::info!(sale_id = %id, "sale cancelled");
        Ok(sale)
    }

    /// Record the billing collaborator's approval on the sale.
    pub fn apply_fiscal_authorization(
        &self,
        id: &str,
        auth: FiscalAuthorization,
    ) -> RepoResult<Sale> {
        let txn = self.store.begin_write()?;
        let mut sale: Sale = self
            .store
            .get_in(&txn, Collection::Sales, id)?
            .ok_or_else(|| RepoError::NotFound(format!("Sale {id} not found")))?;
        sale.fiscal = FiscalInfo::approved(auth);
        sale.sync_status = SyncStatus::Pending;
        sale.synced_at = None;
        self.store.put_in(&txn, Collection::Sales, &sale)?;
        txn.commit().map_err(StoreError::from)?;
        Ok(sale)
    }

    /// The authority was unreachable or errored; leave the sale queued for
    /// a later authorization attempt.
    pub fn mark_fiscal_pending(&self, id: &str) -> RepoResult<Sale> {
        let txn = self.store.begin_write()?;
        let mut sale: Sale = self
            .store
            .get_in(&txn, Collection::Sales, id)?
            .ok_or_else(|| RepoError::NotFound(format!("Sale {id} not found")))?;
        sale.fiscal.status = FiscalStatus::Pending;
        sale.sync_status = SyncStatus::Pending;
        sale.synced_at = None;
        self.store.put_in(&txn, Collection::Sales, &sale)?;
        txn.commit().map_err(StoreError::from)?;
        Ok(sale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::CashLedger;
    use crate::repository::{ClientCreate, ClientRepository, ShiftRepository};
    use shared::models::ShiftOpen;

    struct Fixture {
        store: LocalStore,
        sales: SaleRepository,
        shifts: ShiftRepository,
        clients: ClientRepository,
        shift_id: String,
    }

    fn setup() -> Fixture {
        let store = LocalStore::open_in_memory().unwrap();
        let shifts = ShiftRepository::new(store.clone());
        let shift = shifts
            .open(ShiftOpen {
                user_id: "u1".into(),
                initial_amount: 1000.0,
                note: None,
            })
            .unwrap();
        Fixture {
            sales: SaleRepository::new(store.clone()),
            clients: ClientRepository::new(store.clone()),
            shifts,
            shift_id: shift.id,
            store,
        }
    }

    fn item(name: &str, qty: f64, price: f64) -> SaleItem {
        SaleItem {
            product_id: None,
            name: name.into(),
            quantity: qty,
            unit_price: price,
        }
    }

    fn cash_payment(amount: f64) -> SalePayment {
        SalePayment {
            method: "cash".into(),
            amount_paid: amount,
            amount_debt: 0.0,
        }
    }

    #[test]
    fn cash_sale_lands_in_the_drawer() {
        let fx = setup();
        fx.sales
            .create(SaleCreate {
                items: vec![item("Yerba", 1.0, 500.0)],
                payments: vec![cash_payment(500.0)],
                client_id: None,
                request_invoice: false,
                user_id: None,
            })
            .unwrap();

        let balance = CashLedger::new(fx.store.clone())
            .shift_balance(&fx.shift_id)
            .unwrap();
        assert_eq!(balance.total_cash, 1500.0);
        assert_eq!(balance.sales_cash, 500.0);
    }

    #[test]
    fn breakdown_must_cover_total() {
        let fx = setup();
        let err = fx
            .sales
            .create(SaleCreate {
                items: vec![item("Yerba", 1.0, 500.0)],
                payments: vec![cash_payment(400.0)],
                client_id: None,
                request_invoice: false,
                user_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }

    #[test]
    fn sale_without_open_shift_is_rejected() {
        let fx = setup();
        fx.shifts
            .close(
                &fx.shift_id,
                shared::models::ShiftClose {
                    declared_cash: 1000.0,
                    note: None,
                },
            )
            .unwrap();

        let err = fx
            .sales
            .create(SaleCreate {
                items: vec![item("Yerba", 1.0, 500.0)],
                payments: vec![cash_payment(500.0)],
                client_id: None,
                request_invoice: false,
                user_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
    }

    #[test]
    fn debt_goes_to_the_client_ledger() {
        let fx = setup();
        let client = fx
            .clients
            .create(ClientCreate {
                name: "Don Mario".into(),
                document: None,
                phone: None,
                email: None,
            })
            .unwrap();

        fx.sales
            .create(SaleCreate {
                items: vec![item("Harina", 2.0, 100.0)],
                payments: vec![SalePayment {
                    method: "cash".into(),
                    amount_paid: 50.0,
                    amount_debt: 150.0,
                }],
                client_id: Some(client.id.clone()),
                request_invoice: false,
                user_id: None,
            })
            .unwrap();

        let reloaded = fx.clients.find_by_id(&client.id).unwrap().unwrap();
        assert_eq!(reloaded.balance, 150.0);
        assert_eq!(reloaded.ledger.len(), 1);
        assert_eq!(reloaded.balance, reloaded.ledger_sum());
    }

    #[test]
    fn cancel_offsets_cash_and_debt() {
        let fx = setup();
        let client = fx
            .clients
            .create(ClientCreate {
                name: "Doña Rosa".into(),
                document: None,
                phone: None,
                email: None,
            })
            .unwrap();

        let sale = fx
            .sales
            .create(SaleCreate {
                items: vec![item("Vino", 1.0, 900.0)],
                payments: vec![SalePayment {
                    method: "cash".into(),
                    amount_paid: 600.0,
                    amount_debt: 300.0,
                }],
                client_id: Some(client.id.clone()),
                request_invoice: false,
                user_id: None,
            })
            .unwrap();

        let cancelled = fx.sales.cancel(&sale.id).unwrap();
        assert!(cancelled.is_cancelled());

        // Drawer back at the opening float, debt paid back down to zero.
        let balance = CashLedger::new(fx.store.clone())
            .shift_balance(&fx.shift_id)
            .unwrap();
        assert_eq!(balance.total_cash, 1000.0);
        let reloaded = fx.clients.find_by_id(&client.id).unwrap().unwrap();
        assert_eq!(reloaded.balance, 0.0);

        // Cancelling twice is an error.
        assert!(matches!(
            fx.sales.cancel(&sale.id).unwrap_err(),
            RepoError::Validation(_)
        ));
    }

    #[test]
    fn fiscal_authorization_is_recorded() {
        let fx = setup();
        let sale = fx
            .sales
            .create(SaleCreate {
                items: vec![item("Pan", 1.0, 200.0)],
                payments: vec![cash_payment(200.0)],
                client_id: None,
                request_invoice: true,
                user_id: None,
            })
            .unwrap();
        assert_eq!(sale.fiscal.status, FiscalStatus::Pending);

        let updated = fx
            .sales
            .apply_fiscal_authorization(
                &sale.id,
                FiscalAuthorization {
                    cae: "71234567890123".into(),
                    numero: 482,
                    tipo: "B".into(),
                    qr_data: "https://www.afip.gob.ar/fe/qr/?p=...".into(),
                    vto: "2025-04-10".into(),
                },
            )
            .unwrap();
        assert_eq!(updated.fiscal.status, FiscalStatus::Approved);
        assert_eq!(updated.fiscal.cae.as_deref(), Some("71234567890123"));
        assert_eq!(updated.sync_status, SyncStatus::Pending);
    }
}
