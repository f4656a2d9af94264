//! Shift Repository

use super::{RepoError, RepoResult, validate_cash_amount};
use crate::ledger::reduce_movements;
use crate::store::{Collection, LocalStore, StoreError};
use redb::WriteTransaction;
use shared::models::{
    CashMovement, MovementKind, OPENING_FLOAT_REF, Shift, ShiftClose, ShiftOpen, ShiftStatus,
    SyncStatus,
};
use shared::util::{self, round_money};

#[derive(Clone)]
pub struct ShiftRepository {
    store: LocalStore,
}

impl ShiftRepository {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn find_by_id(&self, id: &str) -> RepoResult<Option<Shift>> {
        Ok(self.store.get(Collection::Shifts, id)?)
    }

    /// The single OPEN shift, if any.
    pub fn current_open(&self) -> RepoResult<Option<Shift>> {
        let open: Vec<Shift> = self
            .store
            .get_all_by_index(Collection::Shifts, "status", "OPEN")?;
        Ok(open.into_iter().next())
    }

    pub(crate) fn current_open_in(&self, txn: &WriteTransaction) -> RepoResult<Option<Shift>> {
        let open: Vec<Shift> =
            self.store
                .get_all_by_index_in(txn, Collection::Shifts, "status", "OPEN")?;
        Ok(open.into_iter().next())
    }

    /// All shifts, most recently opened first.
    pub fn find_all(&self) -> RepoResult<Vec<Shift>> {
        let mut shifts: Vec<Shift> = self.store.get_all(Collection::Shifts)?;
        shifts.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
        Ok(shifts)
    }

    /// Open a shift. The uniqueness check and both inserts share one write
    /// transaction: either the shift and its opening float both exist, or
    /// neither does, and two concurrent openers serialize.
    pub fn open(&self, data: ShiftOpen) -> RepoResult<Shift> {
        validate_cash_amount(data.initial_amount, "Initial amount")?;

        let txn = self.store.begin_write()?;

        // Global single shift: only one OPEN shift allowed at a time
        if self.current_open_in(&txn)?.is_some() {
            return Err(RepoError::Duplicate("A shift is already open".into()));
        }

        let now = util::now();
        let shift = Shift {
            id: util::record_id(),
            status: ShiftStatus::Open,
            user_id: data.user_id.clone(),
            opened_at: now,
            closed_at: None,
            initial_amount: data.initial_amount,
            final_cash: None,
            expected_cash: None,
            difference: None,
            note: data.note,
            sync_status: SyncStatus::Pending,
            synced_at: None,
        };
        self.store.put_in(&txn, Collection::Shifts, &shift)?;

        if data.initial_amount > 0.0 {
            let float = CashMovement {
                id: util::record_id(),
                shift_id: shift.id.clone(),
                kind: MovementKind::Deposit,
                method: "cash".into(),
                amount: data.initial_amount,
                description: "Opening float".into(),
                date: now,
                reference: Some(OPENING_FLOAT_REF.into()),
                user_id: Some(data.user_id),
                sync_status: SyncStatus::Pending,
                synced_at: None,
            };
            self.store.put_in(&txn, Collection::CashMovements, &float)?;
        }

        txn.commit().map_err(StoreError::from)?;
        tracing::info!(
            shift_id = %shift.id,
            user_id = %shift.user_id,
            initial_amount = shift.initial_amount,
            "shift opened"
        );
        Ok(shift)
    }

    /// Close a shift against the operator's declared count. Expected cash
    /// and the difference are computed inside the commit — the blind-count
    /// protocol means no API hands the expected figure out beforehand.
    /// Closing is terminal; a closed shift accepts no further movements.
    pub fn close(&self, id: &str, data: ShiftClose) -> RepoResult<Shift> {
        validate_cash_amount(data.declared_cash, "Declared cash")?;

        let txn = self.store.begin_write()?;
        let mut shift: Shift = self
            .store
            .get_in(&txn, Collection::Shifts, id)?
            .ok_or_else(|| RepoError::NotFound(format!("Shift {id} not found")))?;
        if !shift.is_open() {
            return Err(RepoError::Validation(format!(
                "Shift {id} is already closed"
            )));
        }

        let movements: Vec<CashMovement> =
            self.store
                .get_all_by_index_in(&txn, Collection::CashMovements, "shiftId", id)?;
        let expected = reduce_movements(shift.initial_amount, &movements).total_cash;
        let declared = round_money(data.declared_cash);

        shift.status = ShiftStatus::Closed;
        shift.closed_at = Some(util::now());
        shift.final_cash = Some(declared);
        shift.expected_cash = Some(expected);
        shift.difference = Some(round_money(declared - expected));
        if data.note.is_some() {
            shift.note = data.note;
        }
        shift.sync_status = SyncStatus::Pending;
        shift.synced_at = None;
        self.store.put_in(&txn, Collection::Shifts, &shift)?;
        txn.commit().map_err(StoreError::from)?;

        tracing::info!(
            shift_id = %id,
            declared,
            expected,
            difference = shift.difference,
            "shift closed"
        );
        Ok(shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::ShiftStatus;

    fn repo() -> ShiftRepository {
        ShiftRepository::new(LocalStore::open_in_memory().unwrap())
    }

    fn open_payload(initial: f64) -> ShiftOpen {
        ShiftOpen {
            user_id: "u1".into(),
            initial_amount: initial,
            note: None,
        }
    }

    #[test]
    fn open_creates_shift_and_opening_float() {
        let repo = repo();
        let shift = repo.open(open_payload(1000.0)).unwrap();
        assert_eq!(shift.status, ShiftStatus::Open);

        let movements: Vec<CashMovement> = repo
            .store
            .get_all_by_index(Collection::CashMovements, "shiftId", &shift.id)
            .unwrap();
        assert_eq!(movements.len(), 1);
        assert!(movements[0].is_opening_float());
        assert_eq!(movements[0].amount, 1000.0);
    }

    #[test]
    fn open_with_zero_float_creates_no_movement() {
        let repo = repo();
        let shift = repo.open(open_payload(0.0)).unwrap();
        let movements: Vec<CashMovement> = repo
            .store
            .get_all_by_index(Collection::CashMovements, "shiftId", &shift.id)
            .unwrap();
        assert!(movements.is_empty());
    }

    #[test]
    fn second_open_is_rejected() {
        let repo = repo();
        repo.open(open_payload(100.0)).unwrap();

        let err = repo.open(open_payload(50.0)).unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));

        // Exactly one OPEN shift remains.
        let open: Vec<Shift> = repo
            .store
            .get_all_by_index(Collection::Shifts, "status", "OPEN")
            .unwrap();
        assert_eq!(open.len(), 1);
    }

    #[test]
    fn close_computes_difference_and_is_terminal() {
        let repo = repo();
        let shift = repo.open(open_payload(1000.0)).unwrap();

        // Simulate a cash sale so expected lands at 1500.
        let sale = CashMovement {
            id: util::record_id(),
            shift_id: shift.id.clone(),
            kind: MovementKind::Sale,
            method: "cash".into(),
            amount: 500.0,
            description: "test".into(),
            date: util::now(),
            reference: None,
            user_id: None,
            sync_status: SyncStatus::Pending,
            synced_at: None,
        };
        repo.store.put(Collection::CashMovements, &sale).unwrap();

        let closed = repo
            .close(
                &shift.id,
                ShiftClose {
                    declared_cash: 1480.0,
                    note: None,
                },
            )
            .unwrap();
        assert_eq!(closed.status, ShiftStatus::Closed);
        assert_eq!(closed.expected_cash, Some(1500.0));
        assert_eq!(closed.difference, Some(-20.0));
        assert_eq!(closed.sync_status, SyncStatus::Pending);

        // Closed is terminal.
        let err = repo
            .close(
                &shift.id,
                ShiftClose {
                    declared_cash: 1480.0,
                    note: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));

        // And a new shift may open again afterwards.
        repo.open(open_payload(200.0)).unwrap();
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let repo = repo();
        assert!(matches!(
            repo.open(open_payload(-1.0)).unwrap_err(),
            RepoError::Validation(_)
        ));

        let shift = repo.open(open_payload(10.0)).unwrap();
        assert!(matches!(
            repo.close(
                &shift.id,
                ShiftClose {
                    declared_cash: -5.0,
                    note: None
                }
            )
            .unwrap_err(),
            RepoError::Validation(_)
        ));
    }
}
