use std::{
    io,
    path::{Path, PathBuf},
};

use fs4::tokio::AsyncFileExt;
use thiserror::Error;
use tokio::fs::File;
use tracing::{debug, info, warn};

/// How many times a marker that was unlinked under us is reopened before giving up.
const MAX_STALE_MARKER_RETRIES: usize = 3;

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("Another instance is already running.")]
    AlreadyRunning { path: PathBuf },
    #[error("Failed to claim instance marker {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Makes sure only one process works with the application directory at a time.
///
/// The claim is an exclusive OS lock on a marker file which is held until the process lets go of
/// the returned [InstanceLock]. If the process dies the OS closes the handle and the lock goes
/// with it, so a stale marker file never blocks a later start.
pub struct SingleInstanceGuard {
    marker: PathBuf,
}

impl SingleInstanceGuard {
    pub fn new(marker: PathBuf) -> Result<Self, io::Error> {
        if let Some(parent) = marker.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { marker })
    }

    pub fn marker(&self) -> &Path {
        &self.marker
    }

    /// Claims the marker without waiting. Fails with [InstanceError::AlreadyRunning] when some
    /// other handle holds it.
    pub async fn acquire(&self) -> Result<InstanceLock, InstanceError> {
        let io_error = |source| InstanceError::Io {
            path: self.marker.clone(),
            source,
        };

        for _ in 0..MAX_STALE_MARKER_RETRIES {
            let file = File::options()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&self.marker)
                .await
                .map_err(io_error)?;

            match file.try_lock_exclusive() {
                Ok(true) => {}
                Ok(false) => {
                    return Err(InstanceError::AlreadyRunning {
                        path: self.marker.clone(),
                    })
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Err(InstanceError::AlreadyRunning {
                        path: self.marker.clone(),
                    })
                }
                Err(e) => return Err(io_error(e)),
            }

            // The previous holder unlinks the marker on release. If that happened between our open
            // and our lock we hold a file nobody else can see, so start over with a fresh one.
            if is_same_file(&file, &self.marker).await.map_err(io_error)? {
                info!("Claimed instance marker {:?}", self.marker);
                return Ok(InstanceLock {
                    file: Some(file),
                    marker: self.marker.clone(),
                });
            }
            debug!("Instance marker {:?} was replaced while locking", self.marker);
        }

        Err(InstanceError::AlreadyRunning {
            path: self.marker.clone(),
        })
    }
}

#[cfg(unix)]
async fn is_same_file(file: &File, path: &Path) -> Result<bool, io::Error> {
    use std::os::unix::fs::MetadataExt;

    let opened = file.metadata().await?;
    match tokio::fs::metadata(path).await {
        Ok(current) => Ok(opened.dev() == current.dev() && opened.ino() == current.ino()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

// Without inode identity there is nothing to compare; a held marker can't be unlinked on Windows
// anyway.
#[cfg(not(unix))]
async fn is_same_file(_file: &File, _path: &Path) -> Result<bool, io::Error> {
    Ok(true)
}

/// Held claim on the instance marker. Releasing, explicitly or by dropping, removes the marker
/// and closes the handle.
pub struct InstanceLock {
    file: Option<File>,
    marker: PathBuf,
}

impl InstanceLock {
    pub async fn release(mut self) {
        if let Some(file) = self.file.take() {
            // Unlink first so nobody can lock the old file after we let go of it.
            if let Err(e) = tokio::fs::remove_file(&self.marker).await {
                warn!("Failed to remove instance marker {:?}: {e}", self.marker);
            }
            if let Err(e) = file.unlock_async().await {
                warn!("Failed to unlock instance marker {:?}: {e}", self.marker);
            }
            info!("Released instance marker {:?}", self.marker);
        }
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = std::fs::remove_file(&self.marker);
            drop(file);
        }
    }
}
