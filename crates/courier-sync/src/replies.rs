use std::collections::{HashMap, HashSet};
use std::path::Path;

use courier_db::models::{NewReply, ReplyRow};
use courier_db::{Change, Store};
use courier_types::RemoteReply;
use tracing::{info, warn};

use crate::artifacts::{Artifacts, decrypted_name, parse_file_counter};
use crate::attribution::find_or_create_user;
use crate::batch::Batch;
use crate::error::{ItemFailure, Result, SyncError};
use crate::submissions::local_source_ids;

/// Brings local replies in line with the server's list.
///
/// A remote reply whose uuid matches a local draft confirms that draft: the
/// draft is removed and the reply takes its counter. Drafts queued behind it
/// share that counter and keep rendering right after the confirmed reply.
/// Drafts with no remote counterpart are left alone.
pub fn update_replies(
    remote_replies: &[RemoteReply],
    local_replies: &[ReplyRow],
    store: &dyn Store,
    data_dir: &Path,
) -> Result<()> {
    let artifacts = Artifacts::new(data_dir);
    let local_by_uuid: HashMap<&str, &ReplyRow> =
        local_replies.iter().map(|r| (r.uuid.as_str(), r)).collect();
    let source_ids = local_source_ids(store)?;
    let mut remote_uuids = HashSet::with_capacity(remote_replies.len());
    let mut batch = Batch::default();

    for reply in remote_replies {
        let uuid = reply.uuid.to_string();
        let user = find_or_create_user(
            &reply.journalist_uuid.to_string(),
            &reply.journalist_username,
            store,
        )?;

        match local_by_uuid.get(uuid.as_str()) {
            Some(&existing) => {
                let mut updated = existing.clone();
                if existing.filename != reply.filename {
                    if let Err(source) = artifacts.rename(&existing.filename, &reply.filename) {
                        batch.fail(ItemFailure {
                            kind: "reply",
                            uuid: uuid.clone(),
                            path: data_dir.join(decrypted_name(&existing.filename)),
                            source,
                        });
                        remote_uuids.insert(uuid);
                        continue;
                    }
                    updated.filename = reply.filename.clone();
                }
                updated.size = reply.size;
                updated.journalist_id = Some(user.id);

                if updated != *existing {
                    batch.stage(Change::UpdateReply(updated));
                }
            }
            None => {
                let source_uuid = reply.source_uuid.to_string();
                let Some(&source_id) = source_ids.get(&source_uuid) else {
                    return Err(SyncError::MissingParent {
                        kind: "reply",
                        uuid,
                        source_uuid,
                    });
                };

                let file_counter = match store.draft_by_uuid(&uuid)? {
                    Some(draft) => {
                        info!("Draft {} confirmed at counter {}", uuid, draft.file_counter);
                        batch.stage(Change::DeleteDraft(draft.id));
                        draft.file_counter
                    }
                    None => parse_file_counter(&reply.filename).unwrap_or_else(|| {
                        warn!("No counter in filename {:?} of reply {}", reply.filename, uuid);
                        0
                    }),
                };

                info!("New reply {} for source {}", uuid, source_uuid);
                batch.stage(Change::InsertReply(NewReply {
                    uuid: uuid.clone(),
                    source_id,
                    journalist_id: Some(user.id),
                    file_counter,
                    filename: reply.filename.clone(),
                    size: reply.size,
                }));
            }
        }
        remote_uuids.insert(uuid);
    }

    for gone in local_replies.iter().filter(|r| !remote_uuids.contains(&r.uuid)) {
        match artifacts.delete(gone) {
            Ok(()) => {
                info!("Deleting reply {}", gone.uuid);
                batch.stage(Change::DeleteReply(gone.id));
            }
            Err(failure) => batch.fail(failure),
        }
    }

    batch.commit(store, "replies")
}
