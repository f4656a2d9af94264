//! Bidirectional reconciliation between the local store and the cloud.
//!
//! - [`engine`] — one sync cycle: upload pending records, mirror reference
//!   collections (with duplicate fusion), window-download time series.
//! - [`worker`] — drives cycles: on startup, on a timer, on connectivity
//!   restored.
//! - [`connectivity`] — probes the cloud and flips the online flag.

pub mod connectivity;
pub mod engine;
pub mod worker;

pub use connectivity::ConnectivityMonitor;
pub use engine::{SkipReason, SyncEngine, SyncError, SyncReport};
pub use worker::SyncWorker;
