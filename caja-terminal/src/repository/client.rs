//! Client Repository

use super::cash_movement::{CashMovementCreate, CashMovementRepository};
use super::{RepoError, RepoResult, validate_positive_amount};
use crate::store::{Collection, LocalStore, StoreError};
use shared::models::{Client, LedgerEntry, LedgerEntryKind, MovementKind, Shift, SyncStatus};
use shared::util;

#[derive(Debug, Clone)]
pub struct ClientCreate {
    pub name: String,
    pub document: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct ClientRepository {
    store: LocalStore,
}

impl ClientRepository {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn find_by_id(&self, id: &str) -> RepoResult<Option<Client>> {
        Ok(self.store.get(Collection::Clients, id)?)
    }

    pub fn find_all(&self) -> RepoResult<Vec<Client>> {
        let mut clients: Vec<Client> = self.store.get_all(Collection::Clients)?;
        clients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(clients)
    }

    pub fn create(&self, data: ClientCreate) -> RepoResult<Client> {
        if data.name.trim().is_empty() {
            return Err(RepoError::Validation("Client name is required".into()));
        }
        let client = Client {
            id: util::record_id(),
            name: data.name.trim().to_string(),
            document: data.document,
            phone: data.phone,
            email: data.email,
            balance: 0.0,
            ledger: Vec::new(),
            sync_status: SyncStatus::Pending,
            synced_at: None,
        };
        self.store.put(Collection::Clients, &client)?;
        Ok(client)
    }

    /// Receive money against the client's running account. The payment
    /// enters the drawer as a DEPOSIT on the open shift, so the count at
    /// close includes it.
    pub fn record_payment(&self, client_id: &str, amount: f64, method: &str) -> RepoResult<Client> {
        validate_positive_amount(amount, "Payment amount")?;

        let txn = self.store.begin_write()?;
        let mut client: Client = self
            .store
            .get_in(&txn, Collection::Clients, client_id)?
            .ok_or_else(|| RepoError::NotFound(format!("Client {client_id} not found")))?;

        let shift: Option<Shift> = self
            .store
            .get_all_by_index_in::<Shift>(&txn, Collection::Shifts, "status", "OPEN")?
            .into_iter()
            .next();
        let shift = shift.ok_or_else(|| {
            RepoError::Validation("No open shift to receive the payment".into())
        })?;

        client.apply_entry(LedgerEntry {
            id: util::record_id(),
            kind: LedgerEntryKind::Payment,
            amount,
            date: util::now(),
            reference: None,
        });
        client.sync_status = SyncStatus::Pending;
        client.synced_at = None;
        self.store.put_in(&txn, Collection::Clients, &client)?;

        CashMovementRepository::new(self.store.clone()).add_in(
            &txn,
            CashMovementCreate {
                shift_id: shift.id,
                kind: MovementKind::Deposit,
                method: method.to_string(),
                amount,
                description: format!("Account payment from {}", client.name),
                reference: Some(format!("client-payment:{client_id}")),
                user_id: None,
            },
        )?;

        txn.commit().map_err(StoreError::from)?;
        tracing::info!(client_id = %client_id, amount, "account payment received");
        Ok(client)
    }
}
