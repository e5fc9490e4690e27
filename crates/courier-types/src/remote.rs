//! Records handed over by the network client after a metadata fetch.
//! They are plain data: already authenticated, never written back.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Sources --

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceKey {
    #[serde(default, rename = "type")]
    pub key_type: Option<String>,
    #[serde(default)]
    pub public: Option<String>,
    #[serde(default)]
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSource {
    pub uuid: Uuid,
    pub journalist_designation: String,
    pub is_flagged: bool,
    #[serde(default)]
    pub key: SourceKey,
    pub interaction_count: i64,
    pub is_starred: bool,
    /// ISO-8601 string as sent by the server, parsed during reconciliation.
    pub last_updated: String,
}

// -- Submissions --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSubmission {
    pub uuid: Uuid,
    pub filename: String,
    pub size: i64,
    pub download_url: String,
    pub is_read: bool,
    pub source_uuid: Uuid,
}

impl RemoteSubmission {
    /// Messages arrive as `<counter>-<slug>-msg.gpg`; everything else is a document.
    pub fn is_message(&self) -> bool {
        self.filename.ends_with("msg.gpg")
    }
}

// -- Replies --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteReply {
    pub uuid: Uuid,
    pub filename: String,
    pub size: i64,
    pub source_uuid: Uuid,
    pub journalist_uuid: Uuid,
    pub journalist_username: String,
}

// -- Snapshot --

/// One full metadata fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSnapshot {
    #[serde(default)]
    pub sources: Vec<RemoteSource>,
    #[serde(default)]
    pub submissions: Vec<RemoteSubmission>,
    #[serde(default)]
    pub replies: Vec<RemoteReply>,
}
