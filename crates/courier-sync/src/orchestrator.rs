use std::path::Path;

use courier_db::Store;
use courier_types::{RemoteReply, RemoteSnapshot, RemoteSource, RemoteSubmission, SubmissionKind};
use tracing::{info, warn};

use crate::error::{ItemFailure, Result, SyncError};
use crate::replies::update_replies;
use crate::sources::update_sources;
use crate::submissions::{update_files, update_messages};

/// Supplies the server's current view. Network, authentication and retries
/// live behind this trait.
pub trait RemoteFetcher: Send + Sync {
    fn fetch(&self) -> std::result::Result<RemoteSnapshot, Box<dyn std::error::Error + Send + Sync>>;
}

/// Splits remote submissions into `(files, messages)` by filename.
pub fn split_submissions(
    submissions: &[RemoteSubmission],
) -> (Vec<RemoteSubmission>, Vec<RemoteSubmission>) {
    submissions.iter().cloned().partition(|s| !s.is_message())
}

/// Converges the local cache to one remote snapshot.
///
/// Kinds are reconciled in dependency order: sources, files, messages,
/// replies. Each kind commits on its own and reads the local rows fresh, so
/// children of a source deleted in the first step are already gone. Items
/// skipped for filesystem errors do not stop later kinds; they are collected
/// into one [`SyncError::Partial`]. Any other error ends the pass.
pub fn reconcile_all(
    remote_sources: &[RemoteSource],
    remote_submissions: &[RemoteSubmission],
    remote_replies: &[RemoteReply],
    store: &dyn Store,
    data_dir: &Path,
) -> Result<()> {
    let (files, messages) = split_submissions(remote_submissions);
    let mut failures: Vec<ItemFailure> = Vec::new();

    let mut collect = |result: Result<()>| match result {
        Ok(()) => Ok(()),
        Err(SyncError::Partial(mut items)) => {
            failures.append(&mut items);
            Ok(())
        }
        Err(e) => Err(e),
    };

    collect(update_sources(remote_sources, &store.sources()?, store, data_dir))?;
    collect(update_files(&files, &store.submissions(SubmissionKind::File)?, store, data_dir))?;
    collect(update_messages(
        &messages,
        &store.submissions(SubmissionKind::Message)?,
        store,
        data_dir,
    ))?;
    collect(update_replies(remote_replies, &store.replies()?, store, data_dir))?;

    if failures.is_empty() {
        Ok(())
    } else {
        warn!("Sync pass left {} item(s) for the next pass", failures.len());
        Err(SyncError::Partial(failures))
    }
}

/// One full cycle: fetch the snapshot and reconcile it.
pub fn sync_once(fetcher: &dyn RemoteFetcher, store: &dyn Store, data_dir: &Path) -> Result<()> {
    let snapshot = fetcher.fetch().map_err(SyncError::Fetch)?;
    info!(
        "Fetched {} source(s), {} submission(s), {} reply(ies)",
        snapshot.sources.len(),
        snapshot.submissions.len(),
        snapshot.replies.len()
    );
    reconcile_all(
        &snapshot.sources,
        &snapshot.submissions,
        &snapshot.replies,
        store,
        data_dir,
    )
}
