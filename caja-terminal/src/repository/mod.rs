//! Repository Module
//!
//! Typed accessors over the local store. Each repository enforces its
//! collection's invariants inside a single write transaction — redb
//! serializes writers, so a check-then-act pair here cannot race another
//! writer. Every write leaves the record `PENDING` for the sync engine.

pub mod app_config;
pub mod cash_movement;
pub mod client;
pub mod product;
pub mod sale;
pub mod shift;

pub use app_config::ConfigRepository;
pub use cash_movement::{CashMovementCreate, CashMovementRepository};
pub use client::{ClientCreate, ClientRepository};
pub use product::{ProductCreate, ProductRepository, ProductUpdate};
pub use sale::{SaleCreate, SaleRepository};
pub use shift::ShiftRepository;

use crate::store::StoreError;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<StoreError> for RepoError {
    fn from(err: StoreError) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

pub(crate) fn validate_cash_amount(amount: f64, field_name: &str) -> RepoResult<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(RepoError::Validation(format!(
            "{field_name} cannot be negative: {amount}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_positive_amount(amount: f64, field_name: &str) -> RepoResult<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(RepoError::Validation(format!(
            "{field_name} must be positive: {amount}"
        )));
    }
    Ok(())
}
