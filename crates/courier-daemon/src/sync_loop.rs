use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use courier_db::Store;
use courier_sync::{RemoteFetcher, SyncError};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Everything one sync pass needs, shared with the blocking worker.
#[derive(Clone)]
pub struct SyncContext {
    pub store: Arc<dyn Store>,
    pub fetcher: Arc<dyn RemoteFetcher>,
    pub data_dir: PathBuf,
}

/// Background task that converges the cache to the remote snapshot.
///
/// Runs one pass per tick. A failed pass is logged and the next tick starts
/// over. Returns once `shutdown` resolves; a pass already running is finished
/// first.
pub async fn run_sync_loop(ctx: SyncContext, interval_secs: u64, shutdown: impl Future<Output = ()>) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut shutdown => {
                info!("Sync loop stopped");
                return;
            }
        }

        match sync_pass(ctx.clone()).await {
            Ok(requeued) => {
                if requeued > 0 {
                    info!("Sync: {} missing file(s) requeued for download", requeued);
                }
            }
            Err(e) => match e.downcast_ref::<SyncError>() {
                Some(SyncError::Partial(failures)) => {
                    warn!("Sync: {} item(s) left for the next pass", failures.len())
                }
                _ => error!("Sync error: {:#}", e),
            },
        }
    }
}

/// Fetch, reconcile, then heal missing files, on a blocking thread.
///
/// Items skipped by the reconcile do not hold back the missing-file scan;
/// they are reported once the scan has run.
async fn sync_pass(ctx: SyncContext) -> anyhow::Result<usize> {
    let requeued = tokio::task::spawn_blocking(move || -> Result<usize, SyncError> {
        let store = ctx.store.as_ref();
        let synced = match courier_sync::sync_once(ctx.fetcher.as_ref(), store, &ctx.data_dir) {
            Ok(()) => Ok(()),
            Err(e @ SyncError::Partial(_)) => Err(e),
            Err(e) => return Err(e),
        };
        let requeued = courier_sync::update_missing_files(&ctx.data_dir, store)?;
        synced.map(|()| requeued)
    })
    .await??;
    Ok(requeued)
}
