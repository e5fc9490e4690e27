mod common;

use std::collections::{BTreeSet, HashSet};

use chrono::{TimeZone, Utc};
use common::{listing, reply, source, submission, touch};
use courier_db::models::NewDraftReply;
use courier_db::{Database, MemoryStore, Store};
use courier_sync::{
    SyncError, TimelineItem, add_draft_reply, find_or_create_user, reconcile_all, timeline,
    update_files,
};
use courier_types::{ReplySendStatus, SubmissionKind};
use uuid::Uuid;

#[test]
fn renamed_file_carries_its_decrypted_copy() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let src = source();
    let mut file = submission(&src, "1-old-msg.gpg");
    reconcile_all(&[src.clone()], &[], &[], &store, dir.path()).unwrap();
    update_files(&[file.clone()], &[], &store, dir.path()).unwrap();
    touch(dir.path(), "1-old-msg");

    file.filename = "1-new-msg.gpg".into();
    let local = store.submissions(SubmissionKind::File).unwrap();
    update_files(&[file.clone()], &local, &store, dir.path()).unwrap();

    let row = store.submission_by_uuid(&file.uuid.to_string()).unwrap().unwrap();
    assert_eq!(row.filename, "1-new-msg.gpg");
    assert!(dir.path().join("1-new-msg").exists());
    assert!(!dir.path().join("1-old-msg").exists());
}

#[test]
fn deleted_source_takes_everything_with_it_in_one_commit() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let src = source();
    let files = vec![
        submission(&src, "1-pericardial-surfacing-doc.gz.gpg"),
        submission(&src, "2-pericardial-surfacing-doc.gz.gpg"),
    ];
    let replies = vec![reply(&src, "3-pericardial-surfacing-reply.gpg", Uuid::new_v4())];
    reconcile_all(&[src.clone()], &files, &replies, &store, dir.path()).unwrap();

    for name in [
        "1-pericardial-surfacing-doc.gz.gpg",
        "1-pericardial-surfacing-doc.gz",
        "1-pericardial-surfacing-doc",
        "2-pericardial-surfacing-doc.gz.gpg",
        "2-pericardial-surfacing-doc.gz",
        "2-pericardial-surfacing-doc",
        "3-pericardial-surfacing-reply.gpg",
        "3-pericardial-surfacing-reply",
    ] {
        touch(dir.path(), name);
    }
    touch(dir.path(), "unrelated");
    let commits = store.commits();

    reconcile_all(&[], &[], &[], &store, dir.path()).unwrap();

    assert_eq!(store.commits(), commits + 1);
    assert!(store.sources().unwrap().is_empty());
    assert!(store.submissions(SubmissionKind::File).unwrap().is_empty());
    assert!(store.replies().unwrap().is_empty());
    assert_eq!(listing(dir.path()), BTreeSet::from(["unrelated".to_string()]));
}

fn promotion_keeps_draft_order(store: &dyn Store) {
    let dir = tempfile::tempdir().unwrap();
    let src = source();
    let journalist = Uuid::new_v4();
    reconcile_all(&[src.clone()], &[], &[], store, dir.path()).unwrap();
    let source_id = store.source_by_uuid(&src.uuid.to_string()).unwrap().unwrap().id;
    let user = find_or_create_user(&journalist.to_string(), "dellsberg", store).unwrap();

    let draft = |uuid: &str, counter: i64, year: i32| NewDraftReply {
        uuid: uuid.into(),
        source_id,
        journalist_id: user.id,
        file_counter: counter,
        timestamp: Utc.with_ymd_and_hms(year, 6, 6, 6, 0, 0).unwrap(),
        content: Some(format!("draft {}", uuid)),
        send_status: ReplySendStatus::Pending,
    };
    let confirmed = reply(&src, "5-pericardial-surfacing-reply.gpg", journalist);
    let confirmed_uuid = confirmed.uuid.to_string();
    store.insert_draft(draft("earlier", 2, 1999)).unwrap();
    store.insert_draft(draft(&confirmed_uuid, 3, 2000)).unwrap();
    store.insert_draft(draft("queued", 3, 2001)).unwrap();
    store.insert_draft(draft("later", 4, 2002)).unwrap();

    reconcile_all(&[src.clone()], &[], &[confirmed], store, dir.path()).unwrap();

    assert!(store.draft_by_uuid(&confirmed_uuid).unwrap().is_none());
    let promoted = store.reply_by_uuid(&confirmed_uuid).unwrap().unwrap();
    assert_eq!(promoted.file_counter, 3);
    assert_eq!(promoted.journalist_id, Some(user.id));
    assert_eq!(store.replies().unwrap().len(), 1);
    assert_eq!(store.draft_by_uuid("queued").unwrap().unwrap().file_counter, 3);

    let order: Vec<String> = timeline(&src.uuid.to_string(), store)
        .unwrap()
        .iter()
        .map(|item| item.uuid().to_string())
        .collect();
    assert_eq!(order, vec!["earlier", confirmed_uuid.as_str(), "queued", "later"]);
}

#[test]
fn confirmed_draft_keeps_its_place_in_memory() {
    promotion_keeps_draft_order(&MemoryStore::new());
}

#[test]
fn confirmed_draft_keeps_its_place_in_sqlite() {
    promotion_keeps_draft_order(&Database::open_in_memory().unwrap());
}

#[test]
fn confirmed_reply_stays_after_the_message_it_answers() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory().unwrap();
    let src = source();
    let source_uuid = src.uuid.to_string();
    let journalist = Uuid::new_v4();
    let messages = vec![
        submission(&src, "1-pericardial-surfacing-msg.gpg"),
        submission(&src, "2-pericardial-surfacing-msg.gpg"),
        submission(&src, "3-pericardial-surfacing-msg.gpg"),
    ];
    reconcile_all(&[src.clone()], &messages, &[], &db, dir.path()).unwrap();
    find_or_create_user(&journalist.to_string(), "dellsberg", &db).unwrap();

    let sent_at = Utc.with_ymd_and_hms(2020, 1, 1, 9, 0, 0).unwrap();
    let sent =
        add_draft_reply(&source_uuid, &journalist.to_string(), "thanks", sent_at, &db).unwrap();
    let queued_at = Utc.with_ymd_and_hms(2020, 1, 1, 10, 0, 0).unwrap();
    add_draft_reply(&source_uuid, &journalist.to_string(), "one more", queued_at, &db).unwrap();
    let uuids = |items: Vec<TimelineItem>| -> Vec<String> {
        items.iter().map(|item| item.uuid().to_string()).collect()
    };
    let before = uuids(timeline(&source_uuid, &db).unwrap());

    let mut confirmed = reply(&src, "4-pericardial-surfacing-reply.gpg", journalist);
    confirmed.uuid = sent.uuid.parse().unwrap();
    reconcile_all(&[src.clone()], &messages, &[confirmed], &db, dir.path()).unwrap();

    let after = timeline(&source_uuid, &db).unwrap();
    assert!(matches!(&after[3], TimelineItem::Reply(r) if r.uuid == sent.uuid));
    assert_eq!(uuids(after), before);
}

#[test]
fn second_pass_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let src = source();
    let other = source();
    let journalist = Uuid::new_v4();
    let submissions = vec![
        submission(&src, "1-pericardial-surfacing-msg.gpg"),
        submission(&src, "2-pericardial-surfacing-doc.gz.gpg"),
        submission(&other, "1-spotted-potato-msg.gpg"),
    ];
    let replies = vec![
        reply(&src, "3-pericardial-surfacing-reply.gpg", journalist),
        reply(&other, "2-spotted-potato-reply.gpg", journalist),
    ];
    let sources = vec![src, other];

    reconcile_all(&sources, &submissions, &replies, &store, dir.path()).unwrap();
    touch(dir.path(), "1-pericardial-surfacing-msg");
    touch(dir.path(), "2-pericardial-surfacing-doc");
    let writes = store.writes();
    let commits = store.commits();
    let files = listing(dir.path());

    reconcile_all(&sources, &submissions, &replies, &store, dir.path()).unwrap();

    assert_eq!(store.writes(), writes);
    assert_eq!(store.commits(), commits);
    assert_eq!(listing(dir.path()), files);
}

#[test]
fn local_uuids_match_the_snapshot_and_drafts_survive() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let kept = source();
    let dropped = source();
    let journalist = Uuid::new_v4();
    let first_subs = vec![
        submission(&kept, "1-a-msg.gpg"),
        submission(&kept, "2-a-doc.gz.gpg"),
        submission(&dropped, "1-b-msg.gpg"),
    ];
    let first_replies = vec![reply(&kept, "3-a-reply.gpg", journalist)];
    reconcile_all(
        &[kept.clone(), dropped.clone()],
        &first_subs,
        &first_replies,
        &store,
        dir.path(),
    )
    .unwrap();

    let source_id = store.source_by_uuid(&kept.uuid.to_string()).unwrap().unwrap().id;
    let user = find_or_create_user(&journalist.to_string(), "dellsberg", &store).unwrap();
    let draft = store
        .insert_draft(NewDraftReply {
            uuid: Uuid::new_v4().to_string(),
            source_id,
            journalist_id: user.id,
            file_counter: 3,
            timestamp: Utc::now(),
            content: Some("still sending".into()),
            send_status: ReplySendStatus::Failed,
        })
        .unwrap();

    let subs = vec![first_subs[0].clone(), submission(&kept, "4-a-msg.gpg")];
    let replies = vec![reply(&kept, "5-a-reply.gpg", journalist)];
    reconcile_all(&[kept.clone()], &subs, &replies, &store, dir.path()).unwrap();

    let uuids = |v: Vec<String>| v.into_iter().collect::<HashSet<_>>();
    assert_eq!(
        uuids(store.sources().unwrap().into_iter().map(|s| s.uuid).collect()),
        uuids(vec![kept.uuid.to_string()])
    );
    assert!(store.submissions(SubmissionKind::File).unwrap().is_empty());
    assert_eq!(
        uuids(
            store
                .submissions(SubmissionKind::Message)
                .unwrap()
                .into_iter()
                .map(|s| s.uuid)
                .collect()
        ),
        uuids(subs.iter().map(|s| s.uuid.to_string()).collect())
    );
    assert_eq!(
        uuids(store.replies().unwrap().into_iter().map(|r| r.uuid).collect()),
        uuids(vec![replies[0].uuid.to_string()])
    );
    assert_eq!(store.drafts().unwrap(), vec![draft]);
}

#[test]
fn stuck_artifact_does_not_block_other_kinds() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let src = source();
    let stuck = submission(&src, "1-a-doc.gz.gpg");
    reconcile_all(&[src.clone()], &[stuck.clone()], &[], &store, dir.path()).unwrap();
    // a directory where the decrypted file should be cannot be removed as a file
    std::fs::create_dir(dir.path().join("1-a-doc")).unwrap();

    let new_reply = reply(&src, "2-a-reply.gpg", Uuid::new_v4());
    let result = reconcile_all(&[src.clone()], &[], &[new_reply.clone()], &store, dir.path());

    match result {
        Err(SyncError::Partial(failures)) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].uuid, stuck.uuid.to_string());
            assert_eq!(failures[0].path, dir.path().join("1-a-doc"));
        }
        other => panic!("expected a partial failure, got {:?}", other),
    }
    assert!(store.submission_by_uuid(&stuck.uuid.to_string()).unwrap().is_some());
    assert!(store.reply_by_uuid(&new_reply.uuid.to_string()).unwrap().is_some());

    std::fs::remove_dir(dir.path().join("1-a-doc")).unwrap();
    reconcile_all(&[src], &[], &[new_reply], &store, dir.path()).unwrap();
    assert!(store.submission_by_uuid(&stuck.uuid.to_string()).unwrap().is_none());
}

#[test]
fn child_of_unknown_source_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let known = source();
    let unknown = source();
    let orphan = submission(&unknown, "1-x-msg.gpg");

    let result = reconcile_all(&[known], &[orphan.clone()], &[], &store, dir.path());

    match result {
        Err(SyncError::MissingParent { kind, uuid, source_uuid }) => {
            assert_eq!(kind, "message");
            assert_eq!(uuid, orphan.uuid.to_string());
            assert_eq!(source_uuid, unknown.uuid.to_string());
        }
        other => panic!("expected MissingParent, got {:?}", other),
    }
    assert_eq!(store.sources().unwrap().len(), 1);
    assert!(store.submissions(SubmissionKind::Message).unwrap().is_empty());
}

#[test]
fn sqlite_store_converges_and_cascades() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory().unwrap();
    let src = source();
    let subs = vec![submission(&src, "1-a-msg.gpg"), submission(&src, "2-a-doc.gz.gpg")];
    let replies = vec![reply(&src, "3-a-reply.gpg", Uuid::new_v4())];

    reconcile_all(&[src.clone()], &subs, &replies, &db, dir.path()).unwrap();
    reconcile_all(&[src.clone()], &subs, &replies, &db, dir.path()).unwrap();

    let items = timeline(&src.uuid.to_string(), &db).unwrap();
    let counters: Vec<i64> = items.iter().map(TimelineItem::file_counter).collect();
    assert_eq!(counters, vec![1, 2, 3]);
    let source_row = db.source_by_uuid(&src.uuid.to_string()).unwrap().unwrap();
    let expected = Utc.with_ymd_and_hms(2018, 9, 11, 11, 42, 31).unwrap()
        + chrono::Duration::microseconds(366649);
    assert_eq!(source_row.last_updated, Some(expected));

    reconcile_all(&[], &[], &[], &db, dir.path()).unwrap();

    assert!(db.sources().unwrap().is_empty());
    assert!(db.submissions(SubmissionKind::Message).unwrap().is_empty());
    assert!(db.submissions(SubmissionKind::File).unwrap().is_empty());
    assert!(db.replies().unwrap().is_empty());
}
