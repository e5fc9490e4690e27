use chrono::{DateTime, Utc};
use courier_db::Store;
use courier_db::models::{DraftReplyRow, ReplyRow, SubmissionRow};

use crate::error::{Result, SyncError};

/// One entry in a source's conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineItem {
    Submission(SubmissionRow),
    Reply(ReplyRow),
    Draft(DraftReplyRow),
}

impl TimelineItem {
    pub fn uuid(&self) -> &str {
        match self {
            TimelineItem::Submission(s) => &s.uuid,
            TimelineItem::Reply(r) => &r.uuid,
            TimelineItem::Draft(d) => &d.uuid,
        }
    }

    pub fn file_counter(&self) -> i64 {
        match self {
            TimelineItem::Submission(s) => s.file_counter,
            TimelineItem::Reply(r) => r.file_counter,
            TimelineItem::Draft(d) => d.file_counter,
        }
    }

    // Ids only order rows of the same table, so the kind rank comes first.
    fn sort_key(&self) -> (i64, u8, Option<DateTime<Utc>>, i64) {
        match self {
            TimelineItem::Submission(s) => (s.file_counter, 0, None, s.id),
            TimelineItem::Reply(r) => (r.file_counter, 1, None, r.id),
            TimelineItem::Draft(d) => (d.file_counter, 2, Some(d.timestamp), d.id),
        }
    }
}

/// Files, messages, replies and drafts of a source in display order.
///
/// Items are ordered by counter. At equal counters submissions come first,
/// then confirmed replies, then drafts in timestamp order. A promoted draft
/// keeps its counter, so the confirmed reply lands where the draft was and
/// the drafts queued behind it still follow it.
pub fn timeline(source_uuid: &str, store: &dyn Store) -> Result<Vec<TimelineItem>> {
    let source = store
        .source_by_uuid(source_uuid)?
        .ok_or_else(|| SyncError::NotFound {
            kind: "source",
            uuid: source_uuid.to_string(),
        })?;

    let mut items: Vec<TimelineItem> = store
        .submissions_for_source(source.id)?
        .into_iter()
        .map(TimelineItem::Submission)
        .chain(store.replies_for_source(source.id)?.into_iter().map(TimelineItem::Reply))
        .chain(store.drafts_for_source(source.id)?.into_iter().map(TimelineItem::Draft))
        .collect();
    items.sort_by_key(TimelineItem::sort_key);
    Ok(items)
}
