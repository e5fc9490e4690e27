//! Download and decryption state of artifacts.
//!
//! `is_downloaded` and `is_decrypted` are driven by the download pipeline
//! through these operations. `is_decrypted` is tri-state: `None` means
//! decryption was never attempted, `Some(false)` that it failed.

use std::path::Path;

use courier_db::models::{ReplyRow, SubmissionRow};
use courier_db::{Change, ChangeSet, Store};
use courier_types::{ArtifactKind, SubmissionKind};
use tracing::{debug, info, warn};

use crate::artifacts::{Artifacts, OnDisk};
use crate::error::{Result, SyncError};

/// A File, Message or Reply row.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Submission(SubmissionRow),
    Reply(ReplyRow),
}

impl Artifact {
    pub fn is_downloaded(&self) -> Option<bool> {
        match self {
            Artifact::Submission(s) => s.is_downloaded,
            Artifact::Reply(r) => r.is_downloaded,
        }
    }

    pub fn is_decrypted(&self) -> Option<bool> {
        match self {
            Artifact::Submission(s) => s.is_decrypted,
            Artifact::Reply(r) => r.is_decrypted,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            Artifact::Submission(s) => s.content.as_deref(),
            Artifact::Reply(r) => r.content.as_deref(),
        }
    }

    /// Waiting for the download pipeline: not downloaded yet, or not
    /// successfully decrypted.
    pub fn is_new(&self) -> bool {
        self.is_downloaded() != Some(true) || self.is_decrypted() != Some(true)
    }

    fn into_change(self) -> Change {
        match self {
            Artifact::Submission(s) => Change::UpdateSubmission(s),
            Artifact::Reply(r) => Change::UpdateReply(r),
        }
    }
}

impl OnDisk for Artifact {
    fn kind(&self) -> ArtifactKind {
        match self {
            Artifact::Submission(s) => s.kind(),
            Artifact::Reply(r) => r.kind(),
        }
    }

    fn uuid(&self) -> &str {
        match self {
            Artifact::Submission(s) => &s.uuid,
            Artifact::Reply(r) => &r.uuid,
        }
    }

    fn filename(&self) -> &str {
        match self {
            Artifact::Submission(s) => &s.filename,
            Artifact::Reply(r) => &r.filename,
        }
    }
}

fn load(kind: ArtifactKind, uuid: &str, store: &dyn Store) -> Result<Artifact> {
    let found = match kind.submission_kind() {
        Some(sub_kind) => store
            .submission_by_uuid(uuid)?
            .filter(|s| s.kind == sub_kind)
            .map(Artifact::Submission),
        None => store.reply_by_uuid(uuid)?.map(Artifact::Reply),
    };
    found.ok_or_else(|| SyncError::NotFound {
        kind: kind.as_str(),
        uuid: uuid.to_string(),
    })
}

/// Applies `f` to the artifact and commits if anything changed.
fn modify(
    kind: ArtifactKind,
    uuid: &str,
    store: &dyn Store,
    f: impl FnOnce(&mut Artifact) -> Result<()>,
) -> Result<()> {
    let before = load(kind, uuid, store)?;
    let mut after = before.clone();
    f(&mut after)?;
    if after != before {
        store.commit(after.into_change().into())?;
    }
    Ok(())
}

pub fn mark_as_downloaded(kind: ArtifactKind, uuid: &str, store: &dyn Store) -> Result<()> {
    modify(kind, uuid, store, |artifact| {
        match artifact {
            Artifact::Submission(s) => s.is_downloaded = Some(true),
            Artifact::Reply(r) => r.is_downloaded = Some(true),
        }
        Ok(())
    })?;
    debug!("{} {} downloaded", kind, uuid);
    Ok(())
}

/// Puts an artifact back in the download queue, clearing its decryption
/// state. Submissions are searched first, then replies.
pub fn mark_as_not_downloaded(uuid: &str, store: &dyn Store) -> Result<()> {
    let kind = if let Some(s) = store.submission_by_uuid(uuid)? {
        s.kind.artifact_kind()
    } else if store.reply_by_uuid(uuid)?.is_some() {
        ArtifactKind::Reply
    } else {
        return Err(SyncError::NotFound {
            kind: "artifact",
            uuid: uuid.to_string(),
        });
    };

    modify(kind, uuid, store, |artifact| {
        match artifact {
            Artifact::Submission(s) => {
                s.is_downloaded = Some(false);
                s.is_decrypted = None;
            }
            Artifact::Reply(r) => {
                r.is_downloaded = Some(false);
                r.is_decrypted = None;
            }
        }
        Ok(())
    })?;
    info!("{} {} marked as not downloaded", kind, uuid);
    Ok(())
}

/// Records the outcome of a decryption attempt.
///
/// Messages and replies must have their plaintext stored with [`set_content`]
/// before they can be marked decrypted.
pub fn mark_as_decrypted(
    kind: ArtifactKind,
    uuid: &str,
    store: &dyn Store,
    value: bool,
) -> Result<()> {
    modify(kind, uuid, store, |artifact| {
        if value && kind != ArtifactKind::File && artifact.content().is_none_or(str::is_empty) {
            return Err(SyncError::MissingContent {
                kind,
                uuid: uuid.to_string(),
            });
        }
        match artifact {
            Artifact::Submission(s) => s.is_decrypted = Some(value),
            Artifact::Reply(r) => r.is_decrypted = Some(value),
        }
        Ok(())
    })?;
    if value {
        debug!("{} {} decrypted", kind, uuid);
    } else {
        warn!("{} {} failed to decrypt", kind, uuid);
    }
    Ok(())
}

/// Stores the plaintext of a message or reply.
///
/// Empty plaintext counts as no content, so it is refused once the row is
/// marked decrypted.
pub fn set_content(kind: ArtifactKind, uuid: &str, content: &str, store: &dyn Store) -> Result<()> {
    if kind == ArtifactKind::File {
        return Err(SyncError::NoContent(kind));
    }
    modify(kind, uuid, store, |artifact| {
        if content.is_empty() && artifact.is_decrypted() == Some(true) {
            return Err(SyncError::MissingContent {
                kind,
                uuid: uuid.to_string(),
            });
        }
        let content = Some(content.to_string());
        match artifact {
            Artifact::Submission(s) => s.content = content,
            Artifact::Reply(r) => r.content = content,
        }
        Ok(())
    })
}

/// The download pipeline's work queue for one kind.
pub fn find_new(kind: ArtifactKind, store: &dyn Store) -> Result<Vec<Artifact>> {
    let all: Vec<Artifact> = match kind.submission_kind() {
        Some(sub_kind) => store
            .submissions(sub_kind)?
            .into_iter()
            .map(Artifact::Submission)
            .collect(),
        None => store.replies()?.into_iter().map(Artifact::Reply).collect(),
    };
    Ok(all.into_iter().filter(Artifact::is_new).collect())
}

pub fn find_new_files(store: &dyn Store) -> Result<Vec<SubmissionRow>> {
    find_new_submissions(SubmissionKind::File, store)
}

pub fn find_new_messages(store: &dyn Store) -> Result<Vec<SubmissionRow>> {
    find_new_submissions(SubmissionKind::Message, store)
}

pub fn find_new_replies(store: &dyn Store) -> Result<Vec<ReplyRow>> {
    Ok(find_new(ArtifactKind::Reply, store)?
        .into_iter()
        .filter_map(|a| match a {
            Artifact::Reply(r) => Some(r),
            Artifact::Submission(_) => None,
        })
        .collect())
}

fn find_new_submissions(kind: SubmissionKind, store: &dyn Store) -> Result<Vec<SubmissionRow>> {
    Ok(find_new(kind.artifact_kind(), store)?
        .into_iter()
        .filter_map(|a| match a {
            Artifact::Submission(s) => Some(s),
            Artifact::Reply(_) => None,
        })
        .collect())
}

/// Requeues files marked downloaded whose decrypted copy has vanished from
/// the data directory. Returns how many were requeued.
///
/// Messages and replies keep their plaintext in the cache and are not checked.
pub fn update_missing_files(data_dir: &Path, store: &dyn Store) -> Result<usize> {
    let artifacts = Artifacts::new(data_dir);
    let mut changes = ChangeSet::new();

    for mut file in store.submissions(SubmissionKind::File)? {
        if file.is_downloaded != Some(true) {
            continue;
        }
        let path = match artifacts.decrypted_path(&file.filename) {
            Ok(path) => path,
            Err(e) => {
                warn!("Skipping file {}: {}", file.uuid, e);
                continue;
            }
        };
        if path.exists() {
            continue;
        }
        warn!("File {} is missing from {}, requeueing", file.uuid, path.display());
        file.is_downloaded = Some(false);
        file.is_decrypted = None;
        changes.push(Change::UpdateSubmission(file));
    }

    let count = changes.len();
    store.commit(changes)?;
    Ok(count)
}
