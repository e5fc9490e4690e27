use courier_types::SubmissionKind;
use thiserror::Error;

use crate::models::{
    DraftReplyRow, NewDraftReply, NewReply, NewSource, NewSubmission, NewUser, ReplyRow,
    SourceRow, SubmissionRow, UserRow,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("{0} lock poisoned")]
    Poisoned(&'static str),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// One staged mutation. Changes are applied in the order they were pushed.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    InsertSource(NewSource),
    UpdateSource(SourceRow),
    /// Removes the source together with its submissions, replies and drafts.
    DeleteSource(i64),
    InsertSubmission(NewSubmission),
    UpdateSubmission(SubmissionRow),
    DeleteSubmission(i64),
    InsertReply(NewReply),
    UpdateReply(ReplyRow),
    DeleteReply(i64),
    UpdateUser(UserRow),
    UpdateDraft(DraftReplyRow),
    DeleteDraft(i64),
}

/// Unit of work handed to [`Store::commit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }
}

impl From<Change> for ChangeSet {
    fn from(change: Change) -> Self {
        Self { changes: vec![change] }
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

/// Narrow create/query/update/delete surface over the local cache.
///
/// Reads see committed state only. `commit` applies a whole change set in one
/// transaction or none of it; an empty set must not touch storage.
/// `insert_user` and `insert_draft` persist immediately and return the stored row.
pub trait Store: Send + Sync {
    fn sources(&self) -> Result<Vec<SourceRow>>;
    fn source_by_uuid(&self, uuid: &str) -> Result<Option<SourceRow>>;

    fn submissions(&self, kind: SubmissionKind) -> Result<Vec<SubmissionRow>>;
    fn submission_by_uuid(&self, uuid: &str) -> Result<Option<SubmissionRow>>;
    fn submissions_for_source(&self, source_id: i64) -> Result<Vec<SubmissionRow>>;

    fn replies(&self) -> Result<Vec<ReplyRow>>;
    fn reply_by_uuid(&self, uuid: &str) -> Result<Option<ReplyRow>>;
    fn replies_for_source(&self, source_id: i64) -> Result<Vec<ReplyRow>>;

    fn drafts(&self) -> Result<Vec<DraftReplyRow>>;
    fn draft_by_uuid(&self, uuid: &str) -> Result<Option<DraftReplyRow>>;
    fn drafts_for_source(&self, source_id: i64) -> Result<Vec<DraftReplyRow>>;
    fn insert_draft(&self, draft: NewDraftReply) -> Result<DraftReplyRow>;

    fn user_by_uuid(&self, uuid: &str) -> Result<Option<UserRow>>;
    fn insert_user(&self, user: NewUser) -> Result<UserRow>;

    fn commit(&self, changes: ChangeSet) -> Result<()>;
}
