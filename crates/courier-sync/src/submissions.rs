use std::collections::{HashMap, HashSet};
use std::path::Path;

use courier_db::models::{NewSubmission, SubmissionRow};
use courier_db::{Change, Store};
use courier_types::{RemoteSubmission, SubmissionKind};
use tracing::{info, warn};

use crate::artifacts::{Artifacts, decrypted_name, parse_file_counter};
use crate::batch::Batch;
use crate::error::{ItemFailure, Result, SyncError};

pub fn update_files(
    remote_files: &[RemoteSubmission],
    local_files: &[SubmissionRow],
    store: &dyn Store,
    data_dir: &Path,
) -> Result<()> {
    update_submissions(SubmissionKind::File, remote_files, local_files, store, data_dir)
}

pub fn update_messages(
    remote_messages: &[RemoteSubmission],
    local_messages: &[SubmissionRow],
    store: &dyn Store,
    data_dir: &Path,
) -> Result<()> {
    update_submissions(SubmissionKind::Message, remote_messages, local_messages, store, data_dir)
}

fn update_submissions(
    kind: SubmissionKind,
    remote: &[RemoteSubmission],
    local: &[SubmissionRow],
    store: &dyn Store,
    data_dir: &Path,
) -> Result<()> {
    let artifacts = Artifacts::new(data_dir);
    let local_by_uuid: HashMap<&str, &SubmissionRow> =
        local.iter().map(|s| (s.uuid.as_str(), s)).collect();
    let mut remote_uuids = HashSet::with_capacity(remote.len());
    let source_ids = local_source_ids(store)?;
    let mut batch = Batch::default();

    for submission in remote {
        let uuid = submission.uuid.to_string();

        match local_by_uuid.get(uuid.as_str()) {
            Some(&existing) => {
                let mut updated = existing.clone();
                if existing.filename != submission.filename {
                    if let Err(source) = artifacts.rename(&existing.filename, &submission.filename) {
                        batch.fail(ItemFailure {
                            kind: kind.as_str(),
                            uuid: uuid.clone(),
                            path: data_dir.join(decrypted_name(&existing.filename)),
                            source,
                        });
                        remote_uuids.insert(uuid);
                        continue;
                    }
                    updated.filename = submission.filename.clone();
                    updated.file_counter =
                        parse_file_counter(&submission.filename).unwrap_or(existing.file_counter);
                }
                updated.size = submission.size;
                updated.is_read = submission.is_read;
                updated.download_url = submission.download_url.clone();

                if updated != *existing {
                    batch.stage(Change::UpdateSubmission(updated));
                }
            }
            None => {
                let source_uuid = submission.source_uuid.to_string();
                let Some(&source_id) = source_ids.get(&source_uuid) else {
                    return Err(SyncError::MissingParent {
                        kind: kind.as_str(),
                        uuid,
                        source_uuid,
                    });
                };

                let file_counter = parse_file_counter(&submission.filename).unwrap_or_else(|| {
                    warn!("No counter in filename {:?} of {} {}", submission.filename, kind, uuid);
                    0
                });
                info!("New {} {} for source {}", kind, uuid, source_uuid);
                batch.stage(Change::InsertSubmission(NewSubmission {
                    uuid: uuid.clone(),
                    kind,
                    source_id,
                    file_counter,
                    filename: submission.filename.clone(),
                    size: submission.size,
                    download_url: submission.download_url.clone(),
                    is_read: submission.is_read,
                }));
            }
        }
        remote_uuids.insert(uuid);
    }

    for gone in local.iter().filter(|s| !remote_uuids.contains(&s.uuid)) {
        match artifacts.delete(gone) {
            Ok(()) => {
                info!("Deleting {} {}", kind, gone.uuid);
                batch.stage(Change::DeleteSubmission(gone.id));
            }
            Err(failure) => batch.fail(failure),
        }
    }

    let what = match kind {
        SubmissionKind::File => "files",
        SubmissionKind::Message => "messages",
    };
    batch.commit(store, what)
}

/// Source uuid -> local id.
pub(crate) fn local_source_ids(store: &dyn Store) -> Result<HashMap<String, i64>> {
    Ok(store.sources()?.into_iter().map(|s| (s.uuid, s.id)).collect())
}
