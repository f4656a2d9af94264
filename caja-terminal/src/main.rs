use std::sync::Arc;
use std::time::Duration;

use caja_terminal::{
    BackgroundTasks, Config, ConnectivityMonitor, SyncEngine, SyncWorker, TaskKind, TerminalState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    caja_terminal::init_logger_with_file(None, config.log_dir.as_deref());

    tracing::info!("Caja terminal starting...");

    // Fatal if the store cannot open or migrate: better to stop than to
    // run the register on a partial schema.
    let state = TerminalState::initialize(&config)?;

    let engine = Arc::new(SyncEngine::new(
        state.store().clone(),
        state.cloud(),
        state.online_watch(),
    ));

    let mut tasks = BackgroundTasks::new();
    let shutdown = tasks.shutdown_token();

    tasks.spawn(
        "connectivity_monitor",
        TaskKind::Periodic,
        ConnectivityMonitor::new(state.clone(), shutdown.clone())?.run(),
    );
    tasks.spawn(
        "cloud_sync",
        TaskKind::Worker,
        SyncWorker::new(
            engine,
            Duration::from_secs(config.sync_interval_secs),
            state.online_watch(),
            shutdown,
        )
        .run(),
    );

    tracing::info!(
        db = %config.db_path().display(),
        cloud = %config.cloud_url,
        company = %config.company_id,
        "terminal ready"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    tasks.shutdown().await;

    Ok(())
}
