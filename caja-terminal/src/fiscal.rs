//! Remote billing collaborator (tax authority).
//!
//! The terminal performs no part of the fiscal protocol. It hands a sale
//! to whatever sits behind [`BillingService`] and consumes the returned
//! authorization shape — or, when the authority is unreachable, leaves the
//! sale PENDING for a later attempt.

use async_trait::async_trait;
use shared::models::{FiscalAuthorization, Sale};
use thiserror::Error;

use crate::repository::{RepoError, RepoResult, SaleRepository};

#[derive(Debug, Error)]
pub enum BillingError {
    /// The authority answered and said no (bad data, closed period, ...)
    #[error("Billing request rejected: {0}")]
    Rejected(String),

    /// Network/service failure; retry later
    #[error("Billing service unreachable: {0}")]
    Unreachable(String),
}

#[async_trait]
pub trait BillingService: Send + Sync {
    async fn emit_invoice(&self, sale: &Sale) -> Result<FiscalAuthorization, BillingError>;

    async fn emit_credit_note(&self, sale: &Sale) -> Result<FiscalAuthorization, BillingError>;
}

/// Ask the collaborator to authorize a sale and persist the outcome. Any
/// billing failure degrades to `PENDING` rather than losing the sale.
pub async fn authorize_sale(
    billing: &dyn BillingService,
    sales: &SaleRepository,
    sale_id: &str,
) -> RepoResult<Sale> {
    let sale = sales
        .find_by_id(sale_id)?
        .ok_or_else(|| RepoError::NotFound(format!("Sale {sale_id} not found")))?;

    match billing.emit_invoice(&sale).await {
        Ok(auth) => sales.apply_fiscal_authorization(sale_id, auth),
        Err(e) => {
            tracing::warn!(sale_id = %sale_id, error = %e, "invoice authorization deferred");
            sales.mark_fiscal_pending(sale_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{SaleCreate, ShiftRepository};
    use crate::store::LocalStore;
    use shared::models::{FiscalStatus, SaleItem, SalePayment, ShiftOpen};

    struct ApprovingAuthority;

    #[async_trait]
    impl BillingService for ApprovingAuthority {
        async fn emit_invoice(&self, _sale: &Sale) -> Result<FiscalAuthorization, BillingError> {
            Ok(FiscalAuthorization {
                cae: "70000000000001".into(),
                numero: 1,
                tipo: "B".into(),
                qr_data: "qr".into(),
                vto: "2025-05-01".into(),
            })
        }

        async fn emit_credit_note(
            &self,
            _sale: &Sale,
        ) -> Result<FiscalAuthorization, BillingError> {
            Err(BillingError::Rejected("not under test".into()))
        }
    }

    struct DownAuthority;

    #[async_trait]
    impl BillingService for DownAuthority {
        async fn emit_invoice(&self, _sale: &Sale) -> Result<FiscalAuthorization, BillingError> {
            Err(BillingError::Unreachable("connection refused".into()))
        }

        async fn emit_credit_note(
            &self,
            _sale: &Sale,
        ) -> Result<FiscalAuthorization, BillingError> {
            Err(BillingError::Unreachable("connection refused".into()))
        }
    }

    fn sale_fixture() -> (SaleRepository, String) {
        let store = LocalStore::open_in_memory().unwrap();
        ShiftRepository::new(store.clone())
            .open(ShiftOpen {
                user_id: "u1".into(),
                initial_amount: 0.0,
                note: None,
            })
            .unwrap();
        let sales = SaleRepository::new(store);
        let sale = sales
            .create(SaleCreate {
                items: vec![SaleItem {
                    product_id: None,
                    name: "Pan".into(),
                    quantity: 1.0,
                    unit_price: 200.0,
                }],
                payments: vec![SalePayment {
                    method: "cash".into(),
                    amount_paid: 200.0,
                    amount_debt: 0.0,
                }],
                client_id: None,
                request_invoice: true,
                user_id: None,
            })
            .unwrap();
        (sales, sale.id)
    }

    #[tokio::test]
    async fn approval_is_stored_on_the_sale() {
        let (sales, sale_id) = sale_fixture();
        let sale = authorize_sale(&ApprovingAuthority, &sales, &sale_id)
            .await
            .unwrap();
        assert_eq!(sale.fiscal.status, FiscalStatus::Approved);
        assert!(sale.fiscal.cae.is_some());
    }

    #[tokio::test]
    async fn unreachable_authority_leaves_sale_pending() {
        let (sales, sale_id) = sale_fixture();
        let sale = authorize_sale(&DownAuthority, &sales, &sale_id)
            .await
            .unwrap();
        assert_eq!(sale.fiscal.status, FiscalStatus::Pending);
    }
}
