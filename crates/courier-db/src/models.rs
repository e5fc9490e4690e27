//! Database row types. These map directly to SQLite rows and are distinct
//! from the remote records in courier-types.
use chrono::{DateTime, Utc};
use courier_types::{ReplySendStatus, SubmissionKind};

#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub id: i64,
    pub uuid: String,
    pub journalist_designation: String,
    pub is_flagged: bool,
    pub public_key: Option<String>,
    pub interaction_count: i64,
    pub is_starred: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSource {
    pub uuid: String,
    pub journalist_designation: String,
    pub is_flagged: bool,
    pub public_key: Option<String>,
    pub interaction_count: i64,
    pub is_starred: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub id: i64,
    pub uuid: String,
    pub username: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub uuid: String,
    pub username: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

/// A File or Message. `is_decrypted` is tri-state: `None` means not attempted.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRow {
    pub id: i64,
    pub uuid: String,
    pub kind: SubmissionKind,
    pub source_id: i64,
    pub file_counter: i64,
    pub filename: String,
    pub size: i64,
    pub download_url: String,
    pub is_downloaded: Option<bool>,
    pub is_decrypted: Option<bool>,
    pub is_read: bool,
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub uuid: String,
    pub kind: SubmissionKind,
    pub source_id: i64,
    pub file_counter: i64,
    pub filename: String,
    pub size: i64,
    pub download_url: String,
    pub is_read: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplyRow {
    pub id: i64,
    pub uuid: String,
    pub source_id: i64,
    pub journalist_id: Option<i64>,
    pub file_counter: i64,
    pub filename: String,
    pub size: i64,
    pub is_downloaded: Option<bool>,
    pub is_decrypted: Option<bool>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReply {
    pub uuid: String,
    pub source_id: i64,
    pub journalist_id: Option<i64>,
    pub file_counter: i64,
    pub filename: String,
    pub size: i64,
}

/// A reply written locally that the server has not confirmed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftReplyRow {
    pub id: i64,
    pub uuid: String,
    pub source_id: i64,
    pub journalist_id: i64,
    pub file_counter: i64,
    pub timestamp: DateTime<Utc>,
    pub content: Option<String>,
    pub send_status: ReplySendStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDraftReply {
    pub uuid: String,
    pub source_id: i64,
    pub journalist_id: i64,
    pub file_counter: i64,
    pub timestamp: DateTime<Utc>,
    pub content: Option<String>,
    pub send_status: ReplySendStatus,
}
