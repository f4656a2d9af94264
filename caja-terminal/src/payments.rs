//! Payment-provider collaborator (card terminals, MercadoPago Point,
//! Clover). The engine only ever cares about the final committed amount
//! and method; transaction polling and its UX live with the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Payment provider unreachable: {0}")]
    Unreachable(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Approved,
    Waiting,
    Rejected,
    Canceled,
    Error,
}

impl PaymentStatus {
    /// Whether the provider can still move this transaction forward.
    pub fn is_final(self) -> bool {
        !matches!(self, PaymentStatus::Waiting)
    }
}

/// Provider-issued handle for a transaction in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReference {
    pub reference: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn init_transaction(
        &self,
        method: &str,
        amount: f64,
        device_id: Option<&str>,
    ) -> Result<PaymentReference, PaymentError>;

    async fn check_status(
        &self,
        reference: &str,
        method: &str,
    ) -> Result<PaymentStatus, PaymentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_is_the_only_non_final_status() {
        assert!(!PaymentStatus::Waiting.is_final());
        for status in [
            PaymentStatus::Approved,
            PaymentStatus::Rejected,
            PaymentStatus::Canceled,
            PaymentStatus::Error,
        ] {
            assert!(status.is_final());
        }
    }
}
