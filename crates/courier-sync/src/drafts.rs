use chrono::{DateTime, Utc};
use courier_db::models::{DraftReplyRow, NewDraftReply};
use courier_db::{Change, ChangeSet, Store};
use courier_types::ReplySendStatus;
use tracing::info;
use uuid::Uuid;

use crate::attribution::get_user;
use crate::error::{Result, SyncError};

/// Records an outgoing reply that the server has not confirmed yet.
///
/// The draft goes after everything already known for its source: it takes
/// the highest counter among the source's submissions, replies and drafts.
pub fn add_draft_reply(
    source_uuid: &str,
    user_uuid: &str,
    content: &str,
    timestamp: DateTime<Utc>,
    store: &dyn Store,
) -> Result<DraftReplyRow> {
    let uuid = Uuid::new_v4().to_string();
    let source = store
        .source_by_uuid(source_uuid)?
        .ok_or_else(|| SyncError::MissingParent {
            kind: "draft reply",
            uuid: uuid.clone(),
            source_uuid: source_uuid.to_string(),
        })?;
    let user = get_user(user_uuid, store)?;

    let file_counter = store
        .submissions_for_source(source.id)?
        .iter()
        .map(|s| s.file_counter)
        .chain(store.replies_for_source(source.id)?.iter().map(|r| r.file_counter))
        .chain(store.drafts_for_source(source.id)?.iter().map(|d| d.file_counter))
        .max()
        .unwrap_or(0);

    let draft = store.insert_draft(NewDraftReply {
        uuid,
        source_id: source.id,
        journalist_id: user.id,
        file_counter,
        timestamp,
        content: Some(content.to_string()),
        send_status: ReplySendStatus::Pending,
    })?;
    info!("Queued draft reply {} for source {}", draft.uuid, source.uuid);
    Ok(draft)
}

/// Demotes every pending draft to failed. Returns how many were changed.
pub fn mark_all_pending_drafts_as_failed(store: &dyn Store) -> Result<usize> {
    let mut changes = ChangeSet::new();
    for mut draft in store.drafts()? {
        if draft.send_status == ReplySendStatus::Pending {
            draft.send_status = ReplySendStatus::Failed;
            changes.push(Change::UpdateDraft(draft));
        }
    }

    let count = changes.len();
    store.commit(changes)?;
    if count > 0 {
        info!("Marked {} pending draft(s) as failed", count);
    }
    Ok(count)
}
