use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// Exclusion primitive guarding the data file. The guard releases the lock when dropped.
///
/// Only a process-local implementation exists. A variant backed by an OS file lock on the anchor
/// path could be slotted in without touching the repository.
pub trait LockProvider: Send + Sync {
    type Guard: Send;

    /// Waits until the lock is free. There is no timeout; drop the future to stop waiting.
    /// Acquiring again while holding a guard deadlocks.
    fn acquire(&self) -> impl Future<Output = Self::Guard> + Send;
}

/// Binary lock named after an anchor path. Clones share the same lock.
#[derive(Clone, Debug)]
pub struct MutexLockProvider {
    anchor: PathBuf,
    mutex: Arc<Mutex<()>>,
}

impl MutexLockProvider {
    pub fn new(anchor: PathBuf) -> Result<Self, std::io::Error> {
        if let Some(parent) = anchor.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            anchor,
            mutex: Arc::new(Mutex::new(())),
        })
    }

    pub fn anchor(&self) -> &Path {
        &self.anchor
    }
}

impl LockProvider for MutexLockProvider {
    type Guard = OwnedMutexGuard<()>;

    async fn acquire(&self) -> Self::Guard {
        trace!("Acquiring lock for {:?}", self.anchor);
        self.mutex.clone().lock_owned().await
    }
}
