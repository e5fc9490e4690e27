use std::error::Error;
use std::path::PathBuf;

use courier_sync::RemoteFetcher;
use courier_types::RemoteSnapshot;
use tracing::debug;

/// Reads the snapshot the network client leaves on disk after each fetch.
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl RemoteFetcher for SnapshotFile {
    fn fetch(&self) -> Result<RemoteSnapshot, Box<dyn Error + Send + Sync>> {
        let bytes = std::fs::read(&self.path)
            .map_err(|e| format!("cannot read {}: {}", self.path.display(), e))?;
        let snapshot: RemoteSnapshot = serde_json::from_slice(&bytes)?;
        debug!("Loaded snapshot from {}", self.path.display());
        Ok(snapshot)
    }
}
