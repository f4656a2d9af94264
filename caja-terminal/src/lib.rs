//! Caja Terminal — offline-first point-of-sale engine
//!
//! A terminal keeps every record in an embedded local store and stays
//! fully usable with zero connectivity. A background engine reconciles
//! with the company's cloud store whenever the network allows: pending
//! records go up in idempotent batches, reference collections mirror down
//! with duplicate fusion, and time-series collections backfill through
//! date windows. Cash accountability comes from an append-only movement
//! ledger reduced into per-shift balances and blind-count audit reports.
//!
//! # Module structure
//!
//! ```text
//! caja-terminal/src/
//! ├── core/          # Config, shared state, background tasks
//! ├── store/         # redb-backed local store + migrations
//! ├── cloud/         # Cloud document-store contract + clients
//! ├── sync/          # Reconciliation engine, worker, connectivity
//! ├── ledger/        # Cash balances and shift audits
//! ├── repository/    # Typed accessors enforcing collection invariants
//! ├── fiscal.rs      # Billing collaborator interface
//! ├── payments.rs    # Payment-provider interface
//! └── utils/         # Logging
//! ```

pub mod cloud;
pub mod core;
pub mod fiscal;
pub mod ledger;
pub mod payments;
pub mod repository;
pub mod store;
pub mod sync;
pub mod utils;

// Re-export public types
pub use cloud::{CloudStore, HttpCloudStore, MemoryCloudStore};
pub use self::core::{BackgroundTasks, Config, TaskKind, TerminalState};
pub use ledger::CashLedger;
pub use repository::{
    CashMovementRepository, ClientRepository, ConfigRepository, ProductRepository, SaleRepository,
    ShiftRepository,
};
pub use store::{Collection, LocalStore};
pub use sync::{ConnectivityMonitor, SyncEngine, SyncReport, SyncWorker};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
