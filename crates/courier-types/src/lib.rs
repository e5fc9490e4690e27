pub mod kinds;
pub mod remote;

pub use kinds::{ArtifactKind, ReplySendStatus, SubmissionKind};
pub use remote::{RemoteReply, RemoteSnapshot, RemoteSource, RemoteSubmission, SourceKey};
