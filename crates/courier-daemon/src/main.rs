mod config;
mod snapshot;
mod sync_loop;

use std::sync::Arc;

use courier_db::Database;
use tracing::info;

use crate::config::Config;
use crate::snapshot::SnapshotFile;
use crate::sync_loop::SyncContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    courier_sync::prepare_data_dir(&config.data_dir)?;
    let db = Arc::new(Database::open(&config.db_path)?);

    // Drafts left pending by a previous run will never be confirmed by it
    let failed = courier_sync::mark_all_pending_drafts_as_failed(db.as_ref())?;
    if failed > 0 {
        info!("{} draft(s) from the previous run marked as failed", failed);
    }

    let ctx = SyncContext {
        store: db,
        fetcher: Arc::new(SnapshotFile::new(config.snapshot_path.clone())),
        data_dir: config.data_dir.clone(),
    };

    info!("Courier daemon syncing {} every {}s", config.snapshot_path.display(), config.sync_interval_secs);
    sync_loop::run_sync_loop(ctx, config.sync_interval_secs, shutdown_signal()).await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::warn!("Cannot install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
