//! Cloud document store, as this terminal consumes it.
//!
//! The terminal never talks to the cloud's internals: it upserts documents
//! with field-level merge, reads whole collections, and runs bounded range
//! scans. Everything behind that contract — replication, multi-tenancy
//! storage — belongs to the cloud service.

pub mod http;
pub mod memory;

pub use http::HttpCloudStore;
pub use memory::MemoryCloudStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloudError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Cloud returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Collection '{0}' unavailable")]
    Unavailable(String),
}

impl From<reqwest::Error> for CloudError {
    fn from(err: reqwest::Error) -> Self {
        CloudError::Request(err.to_string())
    }
}

pub type CloudResult<T> = Result<T, CloudError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Bounded single-field range scan, ordered by the same field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudQuery {
    pub field: String,
    pub op: QueryOp,
    pub value: Value,
    pub order: SortOrder,
    pub limit: usize,
}

impl CloudQuery {
    pub fn range(
        field: impl Into<String>,
        op: QueryOp,
        value: impl Into<Value>,
        order: SortOrder,
        limit: usize,
    ) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
            order,
            limit,
        }
    }
}

/// The remote document store, partitioned by company.
///
/// Documents are keyed by the record's local identifier string; dates on
/// the wire are ISO-8601 strings. A document's presence in the cloud means
/// it is synced by definition — the store never holds `PENDING`.
#[async_trait]
pub trait CloudStore: Send + Sync {
    /// Upsert with field-level merge. A partial local record can never
    /// erase cloud-only fields.
    async fn set_merge(&self, collection: &str, id: &str, data: Value) -> CloudResult<()>;

    /// All-or-nothing batch of merge upserts. Callers keep batches at or
    /// below [`MAX_BATCH_DOCS`].
    async fn set_merge_batch(&self, collection: &str, docs: &[(String, Value)])
    -> CloudResult<()>;

    async fn get_all(&self, collection: &str) -> CloudResult<Vec<Value>>;

    async fn query(&self, collection: &str, query: CloudQuery) -> CloudResult<Vec<Value>>;
}

/// Hard backend limit on batch writes; the sync engine stays under it.
pub const MAX_BATCH_DOCS: usize = 500;
