//! Cash Movement Repository
//!
//! Append-only by construction: there is no update or delete surface. A
//! wrong entry is corrected by inserting an offsetting movement.

use super::{RepoError, RepoResult, validate_positive_amount};
use crate::store::{Collection, LocalStore, StoreError};
use redb::WriteTransaction;
use shared::models::{CashMovement, MovementKind, Shift, SyncStatus};
use shared::util;

#[derive(Debug, Clone)]
pub struct CashMovementCreate {
    pub shift_id: String,
    pub kind: MovementKind,
    pub method: String,
    pub amount: f64,
    pub description: String,
    pub reference: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Clone)]
pub struct CashMovementRepository {
    store: LocalStore,
}

impl CashMovementRepository {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Append a movement to an OPEN shift.
    pub fn add(&self, data: CashMovementCreate) -> RepoResult<CashMovement> {
        let txn = self.store.begin_write()?;
        let movement = self.add_in(&txn, data)?;
        txn.commit().map_err(StoreError::from)?;
        Ok(movement)
    }

    /// Same as [`add`](Self::add) inside an existing transaction, so
    /// callers (sales, client payments) stay atomic with their own writes.
    pub(crate) fn add_in(
        &self,
        txn: &WriteTransaction,
        data: CashMovementCreate,
    ) -> RepoResult<CashMovement> {
        validate_positive_amount(data.amount, "Movement amount")?;

        let shift: Shift = self
            .store
            .get_in(txn, Collection::Shifts, &data.shift_id)?
            .ok_or_else(|| RepoError::NotFound(format!("Shift {} not found", data.shift_id)))?;
        if !shift.is_open() {
            return Err(RepoError::Validation(format!(
                "Shift {} is not open; movements only attach to the open shift",
                data.shift_id
            )));
        }

        let movement = CashMovement {
            id: util::record_id(),
            shift_id: data.shift_id,
            kind: data.kind,
            method: data.method,
            amount: data.amount,
            description: data.description,
            date: util::now(),
            reference: data.reference,
            user_id: data.user_id,
            sync_status: SyncStatus::Pending,
            synced_at: None,
        };
        self.store
            .put_in(txn, Collection::CashMovements, &movement)?;
        tracing::debug!(
            movement_id = %movement.id,
            shift_id = %movement.shift_id,
            kind = ?movement.kind,
            amount = movement.amount,
            "cash movement appended"
        );
        Ok(movement)
    }

    /// A shift's full history is exactly this set.
    pub fn for_shift(&self, shift_id: &str) -> RepoResult<Vec<CashMovement>> {
        let mut movements: Vec<CashMovement> =
            self.store
                .get_all_by_index(Collection::CashMovements, "shiftId", shift_id)?;
        movements.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(movements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::ShiftRepository;
    use shared::models::{ShiftClose, ShiftOpen};

    fn setup() -> (CashMovementRepository, ShiftRepository, String) {
        let store = LocalStore::open_in_memory().unwrap();
        let shifts = ShiftRepository::new(store.clone());
        let shift = shifts
            .open(ShiftOpen {
                user_id: "u1".into(),
                initial_amount: 100.0,
                note: None,
            })
            .unwrap();
        (CashMovementRepository::new(store), shifts, shift.id)
    }

    fn deposit(shift_id: &str, amount: f64) -> CashMovementCreate {
        CashMovementCreate {
            shift_id: shift_id.into(),
            kind: MovementKind::Deposit,
            method: "cash".into(),
            amount,
            description: "till top-up".into(),
            reference: None,
            user_id: None,
        }
    }

    #[test]
    fn add_appends_to_open_shift() {
        let (movements, _, shift_id) = setup();
        movements.add(deposit(&shift_id, 50.0)).unwrap();

        let history = movements.for_shift(&shift_id).unwrap();
        // Opening float + deposit
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn add_rejects_nonpositive_amount() {
        let (movements, _, shift_id) = setup();
        assert!(matches!(
            movements.add(deposit(&shift_id, 0.0)).unwrap_err(),
            RepoError::Validation(_)
        ));
    }

    #[test]
    fn add_rejects_unknown_shift() {
        let (movements, _, _) = setup();
        assert!(matches!(
            movements.add(deposit("ghost", 10.0)).unwrap_err(),
            RepoError::NotFound(_)
        ));
    }

    #[test]
    fn add_rejects_closed_shift() {
        let (movements, shifts, shift_id) = setup();
        shifts
            .close(
                &shift_id,
                ShiftClose {
                    declared_cash: 100.0,
                    note: None,
                },
            )
            .unwrap();

        assert!(matches!(
            movements.add(deposit(&shift_id, 10.0)).unwrap_err(),
            RepoError::Validation(_)
        ));
    }
}
