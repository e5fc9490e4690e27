use courier_db::Store;
use courier_db::models::{ReplyRow, SubmissionRow};
use courier_types::SubmissionKind;

use crate::error::{Result, SyncError};

pub fn source_exists(source_uuid: &str, store: &dyn Store) -> Result<bool> {
    Ok(store.source_by_uuid(source_uuid)?.is_some())
}

pub fn get_file(uuid: &str, store: &dyn Store) -> Result<SubmissionRow> {
    get_submission(SubmissionKind::File, uuid, store)
}

pub fn get_message(uuid: &str, store: &dyn Store) -> Result<SubmissionRow> {
    get_submission(SubmissionKind::Message, uuid, store)
}

pub fn get_reply(uuid: &str, store: &dyn Store) -> Result<ReplyRow> {
    store.reply_by_uuid(uuid)?.ok_or_else(|| SyncError::NotFound {
        kind: "reply",
        uuid: uuid.to_string(),
    })
}

fn get_submission(kind: SubmissionKind, uuid: &str, store: &dyn Store) -> Result<SubmissionRow> {
    store
        .submission_by_uuid(uuid)?
        .filter(|s| s.kind == kind)
        .ok_or_else(|| SyncError::NotFound {
            kind: kind.as_str(),
            uuid: uuid.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_db::models::{NewSource, NewSubmission};
    use courier_db::{Change, MemoryStore};

    #[test]
    fn lookups_respect_kind() {
        let store = MemoryStore::new();
        store
            .commit(
                Change::InsertSource(NewSource {
                    uuid: "source-1".into(),
                    journalist_designation: "foo".into(),
                    is_flagged: false,
                    public_key: None,
                    interaction_count: 0,
                    is_starred: false,
                    last_updated: None,
                })
                .into(),
            )
            .unwrap();
        let source_id = store.source_by_uuid("source-1").unwrap().unwrap().id;
        store
            .commit(
                Change::InsertSubmission(NewSubmission {
                    uuid: "m".into(),
                    kind: SubmissionKind::Message,
                    source_id,
                    file_counter: 1,
                    filename: "1-foo-msg.gpg".into(),
                    size: 1,
                    download_url: String::new(),
                    is_read: false,
                })
                .into(),
            )
            .unwrap();

        assert!(source_exists("source-1", &store).unwrap());
        assert!(!source_exists("source-2", &store).unwrap());
        assert_eq!(get_message("m", &store).unwrap().filename, "1-foo-msg.gpg");
        assert!(matches!(get_file("m", &store), Err(SyncError::NotFound { kind: "file", .. })));
        assert!(matches!(get_reply("m", &store), Err(SyncError::NotFound { kind: "reply", .. })));
    }
}
