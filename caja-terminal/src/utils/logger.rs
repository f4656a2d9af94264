//! Logging Infrastructure
//!
//! Structured logging setup for both interactive and service use.

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize the logger with stderr output.
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize the logger, optionally writing daily-rolling files.
///
/// `RUST_LOG` wins over `log_level`; the default level is `info`.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.unwrap_or("info")));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_target(false);

    if let Some(dir) = log_dir
        && Path::new(dir).exists()
    {
        let file_appender = tracing_appender::rolling::daily(dir, "caja-terminal");
        subscriber.with_writer(file_appender).init();
        return;
    }

    subscriber.init();
}
