use std::path::PathBuf;

use courier_db::StoreError;
use courier_types::ArtifactKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A child arrived for a source the cache does not hold. Sources must be
    /// reconciled before files, messages and replies.
    #[error("{kind} {uuid} references source {source_uuid} which is not in the local cache")]
    MissingParent {
        kind: &'static str,
        uuid: String,
        source_uuid: String,
    },
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("{kind} not found: {uuid}")]
    NotFound { kind: &'static str, uuid: String },
    #[error("{kind} {uuid} cannot be marked decrypted before its content is stored")]
    MissingContent { kind: ArtifactKind, uuid: String },
    #[error("{0} artifacts keep their plaintext on disk, not in the cache")]
    NoContent(ArtifactKind),
    #[error("invalid last_updated for source {uuid}: {value:?}")]
    InvalidTimestamp {
        uuid: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("unsafe permissions ({mode:o}) on {}", path.display())]
    UnsafePermissions { path: PathBuf, mode: u32 },
    #[error("fetch failed: {0}")]
    Fetch(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Some items hit filesystem errors and were left for the next pass;
    /// everything else in the batch was committed.
    #[error("{} item(s) could not be reconciled", .0.len())]
    Partial(Vec<ItemFailure>),
}

/// A filesystem error that stopped one row from being reconciled.
#[derive(Debug, Error)]
#[error("{kind} {uuid}: {}: {source}", path.display())]
pub struct ItemFailure {
    pub kind: &'static str,
    pub uuid: String,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

pub type Result<T> = std::result::Result<T, SyncError>;
