use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use courier_db::models::{NewSource, SourceRow};
use courier_db::{Change, Store};
use courier_types::RemoteSource;
use tracing::info;

use crate::artifacts::Artifacts;
use crate::batch::Batch;
use crate::error::{Result, SyncError};

/// Brings local sources in line with the server's list.
///
/// Sources missing remotely are deleted together with their submissions,
/// replies and drafts, after every on-disk artifact of those children has been
/// removed. A source whose artifacts cannot be removed stays for the next pass.
pub fn update_sources(
    remote_sources: &[RemoteSource],
    local_sources: &[SourceRow],
    store: &dyn Store,
    data_dir: &Path,
) -> Result<()> {
    let artifacts = Artifacts::new(data_dir);
    let local_by_uuid: HashMap<&str, &SourceRow> =
        local_sources.iter().map(|s| (s.uuid.as_str(), s)).collect();
    let mut remote_uuids = HashSet::with_capacity(remote_sources.len());
    let mut batch = Batch::default();

    for remote in remote_sources {
        let uuid = remote.uuid.to_string();
        let last_updated = parse_last_updated(&uuid, &remote.last_updated)?;

        match local_by_uuid.get(uuid.as_str()) {
            Some(&local) => {
                let mut updated = local.clone();
                updated.journalist_designation = remote.journalist_designation.clone();
                updated.is_flagged = remote.is_flagged;
                updated.public_key = remote.key.public.clone();
                updated.interaction_count = remote.interaction_count;
                updated.is_starred = remote.is_starred;
                updated.last_updated = Some(last_updated);

                if updated != *local {
                    batch.stage(Change::UpdateSource(updated));
                }
            }
            None => {
                info!("New source {} ({})", remote.journalist_designation, uuid);
                batch.stage(Change::InsertSource(NewSource {
                    uuid: uuid.clone(),
                    journalist_designation: remote.journalist_designation.clone(),
                    is_flagged: remote.is_flagged,
                    public_key: remote.key.public.clone(),
                    interaction_count: remote.interaction_count,
                    is_starred: remote.is_starred,
                    last_updated: Some(last_updated),
                }));
            }
        }
        remote_uuids.insert(uuid);
    }

    for local in local_sources.iter().filter(|s| !remote_uuids.contains(&s.uuid)) {
        let submissions = store.submissions_for_source(local.id)?;
        let replies = store.replies_for_source(local.id)?;

        let removed = submissions
            .iter()
            .map(|s| artifacts.delete(s))
            .chain(replies.iter().map(|r| artifacts.delete(r)))
            .collect::<std::result::Result<(), _>>();

        match removed {
            Ok(()) => {
                info!(
                    "Deleting source {} with {} submission(s) and {} reply(ies)",
                    local.uuid,
                    submissions.len(),
                    replies.len()
                );
                batch.stage(Change::DeleteSource(local.id));
            }
            Err(failure) => batch.fail(failure),
        }
    }

    batch.commit(store, "sources")
}

fn parse_last_updated(uuid: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|source| SyncError::InvalidTimestamp {
            uuid: uuid.to_string(),
            value: value.to_string(),
            source,
        })
}
