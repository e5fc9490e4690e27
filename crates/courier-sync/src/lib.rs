//! Reconciliation of the local cache against the server's snapshot.
//!
//! Each sync cycle converges sources, files, messages and replies to the
//! remote view, keeping the artifacts in the data directory consistent with
//! the rows that describe them. Drafts written locally survive until the
//! server confirms them.

pub mod artifacts;
pub mod attribution;
mod batch;
pub mod drafts;
pub mod error;
pub mod lifecycle;
pub mod lookup;
pub mod orchestrator;
pub mod replies;
pub mod sources;
pub mod submissions;
pub mod timeline;

pub use artifacts::{Artifacts, check_file_integrity, prepare_data_dir};
pub use attribution::{find_or_create_user, get_user, update_and_get_user};
pub use drafts::{add_draft_reply, mark_all_pending_drafts_as_failed};
pub use error::{ItemFailure, Result, SyncError};
pub use lifecycle::{
    Artifact, find_new, find_new_files, find_new_messages, find_new_replies, mark_as_decrypted,
    mark_as_downloaded, mark_as_not_downloaded, set_content, update_missing_files,
};
pub use lookup::{get_file, get_message, get_reply, source_exists};
pub use orchestrator::{RemoteFetcher, reconcile_all, split_submissions, sync_once};
pub use replies::update_replies;
pub use sources::update_sources;
pub use submissions::{update_files, update_messages};
pub use timeline::{TimelineItem, timeline};
