use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use courier_types::SubmissionKind;

use crate::models::{
    DraftReplyRow, NewDraftReply, NewUser, ReplyRow, SourceRow, SubmissionRow, UserRow,
};
use crate::store::{Change, ChangeSet, Result, Store, StoreError};

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: i64,
    sources: Vec<SourceRow>,
    users: Vec<UserRow>,
    submissions: Vec<SubmissionRow>,
    replies: Vec<ReplyRow>,
    drafts: Vec<DraftReplyRow>,
}

/// Store kept entirely in memory.
///
/// Enforces the same uniqueness and foreign-key rules as the SQLite schema,
/// applies each change set against a copy so a failure leaves nothing behind,
/// and counts commits and row writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    commits: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful non-empty commits, including immediate inserts.
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of rows inserted, updated or deleted through the store.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T> {
        let tables = self.tables.lock().map_err(|_| StoreError::Poisoned("memory store"))?;
        Ok(f(&tables))
    }

    fn write<T>(&self, writes: usize, f: impl FnOnce(&mut Tables) -> Result<T>) -> Result<T> {
        let mut tables = self.tables.lock().map_err(|_| StoreError::Poisoned("memory store"))?;
        let mut staged = tables.clone();
        let out = f(&mut staged)?;
        staged.check_integrity()?;
        *tables = staged;
        self.commits.fetch_add(1, Ordering::SeqCst);
        self.writes.fetch_add(writes, Ordering::SeqCst);
        Ok(out)
    }
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn apply(&mut self, change: Change) -> Result<()> {
        match change {
            Change::InsertSource(new) => {
                let id = self.next_id();
                self.sources.push(SourceRow {
                    id,
                    uuid: new.uuid,
                    journalist_designation: new.journalist_designation,
                    is_flagged: new.is_flagged,
                    public_key: new.public_key,
                    interaction_count: new.interaction_count,
                    is_starred: new.is_starred,
                    last_updated: new.last_updated,
                });
            }
            Change::UpdateSource(row) => replace(&mut self.sources, row, |r| r.id, "source")?,
            Change::DeleteSource(id) => {
                self.drafts.retain(|d| d.source_id != id);
                self.replies.retain(|r| r.source_id != id);
                self.submissions.retain(|s| s.source_id != id);
                remove(&mut self.sources, id, |r| r.id, "source")?;
            }
            Change::InsertSubmission(new) => {
                let id = self.next_id();
                self.submissions.push(SubmissionRow {
                    id,
                    uuid: new.uuid,
                    kind: new.kind,
                    source_id: new.source_id,
                    file_counter: new.file_counter,
                    filename: new.filename,
                    size: new.size,
                    download_url: new.download_url,
                    is_downloaded: Some(false),
                    is_decrypted: None,
                    is_read: new.is_read,
                    content: None,
                });
            }
            Change::UpdateSubmission(row) => {
                replace(&mut self.submissions, row, |r| r.id, "submission")?
            }
            Change::DeleteSubmission(id) => remove(&mut self.submissions, id, |r| r.id, "submission")?,
            Change::InsertReply(new) => {
                let id = self.next_id();
                self.replies.push(ReplyRow {
                    id,
                    uuid: new.uuid,
                    source_id: new.source_id,
                    journalist_id: new.journalist_id,
                    file_counter: new.file_counter,
                    filename: new.filename,
                    size: new.size,
                    is_downloaded: Some(false),
                    is_decrypted: None,
                    content: None,
                });
            }
            Change::UpdateReply(row) => replace(&mut self.replies, row, |r| r.id, "reply")?,
            Change::DeleteReply(id) => remove(&mut self.replies, id, |r| r.id, "reply")?,
            Change::UpdateUser(row) => replace(&mut self.users, row, |r| r.id, "user")?,
            Change::UpdateDraft(row) => replace(&mut self.drafts, row, |r| r.id, "draft reply")?,
            Change::DeleteDraft(id) => remove(&mut self.drafts, id, |r| r.id, "draft reply")?,
        }
        Ok(())
    }

    /// Mirrors the UNIQUE, CHECK, FOREIGN KEY and trigger rules of the schema.
    fn check_integrity(&self) -> Result<()> {
        unique(self.sources.iter().map(|r| r.uuid.as_str()), "sources")?;
        unique(self.users.iter().map(|r| r.uuid.as_str()), "users")?;
        unique(self.submissions.iter().map(|r| r.uuid.as_str()), "submissions")?;
        unique(
            self.replies
                .iter()
                .map(|r| r.uuid.as_str())
                .chain(self.drafts.iter().map(|d| d.uuid.as_str())),
            "replies/draft_replies",
        )?;

        let source_exists = |id: i64| self.sources.iter().any(|s| s.id == id);
        let user_exists = |id: i64| self.users.iter().any(|u| u.id == id);

        for s in &self.submissions {
            if !source_exists(s.source_id) {
                return Err(dangling("submission", &s.uuid, "source"));
            }
            if s.kind == SubmissionKind::Message
                && s.is_decrypted == Some(true)
                && s.content.as_deref().is_none_or(str::is_empty)
            {
                return Err(StoreError::Constraint(format!(
                    "message {} marked decrypted without content",
                    s.uuid
                )));
            }
        }
        for r in &self.replies {
            if !source_exists(r.source_id) {
                return Err(dangling("reply", &r.uuid, "source"));
            }
            if r.journalist_id.is_some_and(|id| !user_exists(id)) {
                return Err(dangling("reply", &r.uuid, "user"));
            }
            if r.is_decrypted == Some(true) && r.content.as_deref().is_none_or(str::is_empty) {
                return Err(StoreError::Constraint(format!(
                    "reply {} marked decrypted without content",
                    r.uuid
                )));
            }
        }
        for d in &self.drafts {
            if !source_exists(d.source_id) {
                return Err(dangling("draft reply", &d.uuid, "source"));
            }
            if !user_exists(d.journalist_id) {
                return Err(dangling("draft reply", &d.uuid, "user"));
            }
        }
        Ok(())
    }
}

fn replace<T>(rows: &mut [T], row: T, id: impl Fn(&T) -> i64, table: &str) -> Result<()> {
    let target = id(&row);
    match rows.iter_mut().find(|r| id(r) == target) {
        Some(slot) => {
            *slot = row;
            Ok(())
        }
        None => Err(StoreError::Constraint(format!("no {} row with id {}", table, target))),
    }
}

fn remove<T>(rows: &mut Vec<T>, target: i64, id: impl Fn(&T) -> i64, table: &str) -> Result<()> {
    let before = rows.len();
    rows.retain(|r| id(r) != target);
    if rows.len() == before {
        return Err(StoreError::Constraint(format!("no {} row with id {}", table, target)));
    }
    Ok(())
}

fn unique<'a>(uuids: impl Iterator<Item = &'a str>, table: &str) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for uuid in uuids {
        if !seen.insert(uuid) {
            return Err(StoreError::Constraint(format!("duplicate uuid {} in {}", uuid, table)));
        }
    }
    Ok(())
}

fn dangling(kind: &str, uuid: &str, parent: &str) -> StoreError {
    StoreError::Constraint(format!("{} {} references a missing {}", kind, uuid, parent))
}

impl Store for MemoryStore {
    fn sources(&self) -> Result<Vec<SourceRow>> {
        self.read(|t| t.sources.clone())
    }

    fn source_by_uuid(&self, uuid: &str) -> Result<Option<SourceRow>> {
        self.read(|t| t.sources.iter().find(|s| s.uuid == uuid).cloned())
    }

    fn submissions(&self, kind: SubmissionKind) -> Result<Vec<SubmissionRow>> {
        self.read(|t| t.submissions.iter().filter(|s| s.kind == kind).cloned().collect())
    }

    fn submission_by_uuid(&self, uuid: &str) -> Result<Option<SubmissionRow>> {
        self.read(|t| t.submissions.iter().find(|s| s.uuid == uuid).cloned())
    }

    fn submissions_for_source(&self, source_id: i64) -> Result<Vec<SubmissionRow>> {
        self.read(|t| {
            let mut rows: Vec<_> =
                t.submissions.iter().filter(|s| s.source_id == source_id).cloned().collect();
            rows.sort_by_key(|s| (s.file_counter, s.id));
            rows
        })
    }

    fn replies(&self) -> Result<Vec<ReplyRow>> {
        self.read(|t| t.replies.clone())
    }

    fn reply_by_uuid(&self, uuid: &str) -> Result<Option<ReplyRow>> {
        self.read(|t| t.replies.iter().find(|r| r.uuid == uuid).cloned())
    }

    fn replies_for_source(&self, source_id: i64) -> Result<Vec<ReplyRow>> {
        self.read(|t| {
            let mut rows: Vec<_> =
                t.replies.iter().filter(|r| r.source_id == source_id).cloned().collect();
            rows.sort_by_key(|r| (r.file_counter, r.id));
            rows
        })
    }

    fn drafts(&self) -> Result<Vec<DraftReplyRow>> {
        self.read(|t| t.drafts.clone())
    }

    fn draft_by_uuid(&self, uuid: &str) -> Result<Option<DraftReplyRow>> {
        self.read(|t| t.drafts.iter().find(|d| d.uuid == uuid).cloned())
    }

    fn drafts_for_source(&self, source_id: i64) -> Result<Vec<DraftReplyRow>> {
        self.read(|t| {
            let mut rows: Vec<_> =
                t.drafts.iter().filter(|d| d.source_id == source_id).cloned().collect();
            rows.sort_by_key(|d| (d.file_counter, d.timestamp, d.id));
            rows
        })
    }

    fn insert_draft(&self, draft: NewDraftReply) -> Result<DraftReplyRow> {
        self.write(1, |t| {
            let row = DraftReplyRow {
                id: t.next_id(),
                uuid: draft.uuid,
                source_id: draft.source_id,
                journalist_id: draft.journalist_id,
                file_counter: draft.file_counter,
                timestamp: draft.timestamp,
                content: draft.content,
                send_status: draft.send_status,
            };
            t.drafts.push(row.clone());
            Ok(row)
        })
    }

    fn user_by_uuid(&self, uuid: &str) -> Result<Option<UserRow>> {
        self.read(|t| t.users.iter().find(|u| u.uuid == uuid).cloned())
    }

    fn insert_user(&self, user: NewUser) -> Result<UserRow> {
        self.write(1, |t| {
            let row = UserRow {
                id: t.next_id(),
                uuid: user.uuid,
                username: user.username,
                firstname: user.firstname,
                lastname: user.lastname,
            };
            t.users.push(row.clone());
            Ok(row)
        })
    }

    fn commit(&self, changes: ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        self.write(changes.len(), |t| {
            for change in changes {
                t.apply(change)?;
            }
            Ok(())
        })
    }
}
