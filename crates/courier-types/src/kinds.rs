use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Rows that own an on-disk artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    File,
    Message,
    Reply,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Message => "message",
            Self::Reply => "reply",
        }
    }

    /// The `submissions` row kind backing this artifact, if any.
    pub fn submission_kind(self) -> Option<SubmissionKind> {
        match self {
            Self::File => Some(SubmissionKind::File),
            Self::Message => Some(SubmissionKind::Message),
            Self::Reply => None,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminates the two kinds sharing the `submissions` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    File,
    Message,
}

impl SubmissionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Message => "message",
        }
    }

    pub fn artifact_kind(self) -> ArtifactKind {
        match self {
            Self::File => ArtifactKind::File,
            Self::Message => ArtifactKind::Message,
        }
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Self::File),
            "message" => Ok(Self::Message),
            other => Err(format!("unknown submission kind: {}", other)),
        }
    }
}

/// Send state of a locally-originated reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReplySendStatus {
    Pending,
    Failed,
    Sent,
}

impl ReplySendStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Failed => "FAILED",
            Self::Sent => "SENT",
        }
    }
}

impl fmt::Display for ReplySendStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplySendStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "FAILED" => Ok(Self::Failed),
            "SENT" => Ok(Self::Sent),
            other => Err(format!("unknown reply send status: {}", other)),
        }
    }
}
