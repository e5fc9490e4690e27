use courier_db::{Change, ChangeSet, Store};
use tracing::{error, info};

use crate::error::{ItemFailure, Result, SyncError};

/// Collects the changes of one reconcile call and the items that had to be
/// skipped, then commits once.
#[derive(Default)]
pub(crate) struct Batch {
    changes: ChangeSet,
    failures: Vec<ItemFailure>,
}

impl Batch {
    pub fn stage(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn fail(&mut self, failure: ItemFailure) {
        error!(
            kind = failure.kind,
            uuid = %failure.uuid,
            path = %failure.path.display(),
            "Skipping item: {}",
            failure.source,
        );
        self.failures.push(failure);
    }

    pub fn commit(self, store: &dyn Store, what: &str) -> Result<()> {
        let count = self.changes.len();
        store.commit(self.changes)?;
        if count > 0 {
            info!("Reconciled {}: {} change(s) committed", what, count);
        }

        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(SyncError::Partial(self.failures))
        }
    }
}
