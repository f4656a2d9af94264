//! Terminal lifecycle: configuration, shared state, background tasks.

pub mod config;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use state::{InitError, TerminalState};
pub use tasks::{BackgroundTasks, TaskKind};
