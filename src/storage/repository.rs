use std::{
    ffi::OsString,
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, warn};

use super::{
    error::StorageError,
    lock::{LockProvider, MutexLockProvider},
};

/// Interface for abstracting storage of the stopwatch history in its flat form.
pub trait TimestampRepository {
    /// Reads the stored timestamps. Absent or unreadable history comes back empty.
    fn load(&self) -> impl Future<Output = Result<Vec<DateTime<Utc>>, StorageError>> + Send;

    /// Replaces the stored timestamps with `timestamps`.
    fn save(
        &self,
        timestamps: &[DateTime<Utc>],
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

impl<T: Deref> TimestampRepository for T
where
    T::Target: TimestampRepository,
{
    fn load(&self) -> impl Future<Output = Result<Vec<DateTime<Utc>>, StorageError>> + Send {
        self.deref().load()
    }

    fn save(
        &self,
        timestamps: &[DateTime<Utc>],
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        self.deref().save(timestamps)
    }
}

/// On-disk representation of a single instant: whole seconds since the Unix epoch.
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(transparent)]
struct StoredInstant(#[serde(with = "chrono::serde::ts_seconds")] DateTime<Utc>);

/// Keeps the history as a JSON array of Unix seconds in a single file.
///
/// Writes go to a sibling `.tmp` file which is then renamed over the target, so a reader sees
/// either the previous or the new content, never a torn write. Every call holds the lock for its
/// whole duration.
pub struct FileTimestampRepository<L = MutexLockProvider> {
    path: PathBuf,
    lock: L,
}

impl<L: LockProvider> FileTimestampRepository<L> {
    pub fn new(path: PathBuf, lock: L) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path, lock })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_temp(temp_path: &Path, contents: &[u8]) -> Result<(), std::io::Error> {
        let mut file = File::create(temp_path).await?;
        file.write_all(contents).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }
}

/// Decodes file contents. Anything that isn't a JSON array of integers is treated as no history.
fn parse_timestamps(path: &Path, contents: &str) -> Vec<DateTime<Utc>> {
    if contents.trim().is_empty() {
        return vec![];
    }
    match serde_json::from_str::<Option<Vec<StoredInstant>>>(contents) {
        Ok(instants) => instants
            .unwrap_or_default()
            .into_iter()
            .map(|StoredInstant(instant)| instant)
            .collect(),
        Err(e) => {
            warn!("Ignoring unreadable history in {:?}: {e}", path);
            vec![]
        }
    }
}

impl<L: LockProvider> TimestampRepository for FileTimestampRepository<L> {
    async fn load(&self) -> Result<Vec<DateTime<Utc>>, StorageError> {
        let _guard = self.lock.acquire().await;

        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No history at {:?}", self.path);
                return Ok(vec![]);
            }
            // Binary garbage is corruption, not an I/O failure.
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!("Ignoring non UTF-8 history in {:?}", self.path);
                return Ok(vec![]);
            }
            Err(e) => return Err(StorageError::io(&self.path)(e)),
        };

        let timestamps = parse_timestamps(&self.path, &contents);
        debug!("Loaded {} timestamps from {:?}", timestamps.len(), self.path);
        Ok(timestamps)
    }

    async fn save(&self, timestamps: &[DateTime<Utc>]) -> Result<(), StorageError> {
        let _guard = self.lock.acquire().await;

        let instants = timestamps.iter().copied().map(StoredInstant).collect::<Vec<_>>();
        let contents = serde_json::to_vec(&instants)?;

        let temp_path = self.temp_path();
        if let Err(e) = Self::write_temp(&temp_path, &contents).await {
            // Leave nothing half written behind. The target itself was never touched.
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(StorageError::io(&temp_path)(e));
        }

        // rename replaces an existing target atomically on the same volume
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(StorageError::io(&self.path))?;

        debug!("Saved {} timestamps to {:?}", timestamps.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use anyhow::Result;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::storage::{
        error::StorageError,
        lock::MutexLockProvider,
        repository::{FileTimestampRepository, TimestampRepository},
    };

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap()
    }

    fn repository(dir: &Path) -> Result<FileTimestampRepository> {
        let lock = MutexLockProvider::new(dir.join("stopwatch.lock"))?;
        Ok(FileTimestampRepository::new(dir.join("stopwatch.json"), lock)?)
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let repository = repository(dir.path())?;
        assert!(repository.load().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_then_load() -> Result<()> {
        let dir = tempdir()?;
        let repository = repository(dir.path())?;
        let timestamps = [t0(), t0() + Duration::seconds(30)];

        repository.save(&timestamps).await?;

        assert!(repository.path().exists());
        assert_eq!(repository.load().await?, timestamps);
        Ok(())
    }

    #[tokio::test]
    async fn test_file_is_json_array_of_seconds() -> Result<()> {
        let dir = tempdir()?;
        let repository = repository(dir.path())?;

        repository
            .save(&[t0(), t0() + Duration::seconds(30), t0() + Duration::seconds(60)])
            .await?;

        let raw = std::fs::read_to_string(repository.path())?;
        let values: Vec<i64> = serde_json::from_str(&raw)?;
        let start = t0().timestamp();
        assert_eq!(values, vec![start, start + 30, start + 60]);
        assert!(!dir.path().join("stopwatch.json.tmp").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_sub_second_precision_is_dropped() -> Result<()> {
        let dir = tempdir()?;
        let repository = repository(dir.path())?;

        repository.save(&[t0() + Duration::milliseconds(750)]).await?;

        assert_eq!(repository.load().await?, vec![t0()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_content() -> Result<()> {
        let dir = tempdir()?;
        let repository = repository(dir.path())?;

        repository.save(&[t0()]).await?;
        repository.save(&[t0() + Duration::seconds(60)]).await?;

        assert_eq!(repository.load().await?, vec![t0() + Duration::seconds(60)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_empty_list() -> Result<()> {
        let dir = tempdir()?;
        let repository = repository(dir.path())?;

        repository.save(&[t0()]).await?;
        repository.save(&[]).await?;

        assert_eq!(std::fs::read_to_string(repository.path())?, "[]");
        assert!(repository.load().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_content_loads_as_empty() -> Result<()> {
        let dir = tempdir()?;
        let repository = repository(dir.path())?;

        for contents in ["", "   \n", "null", "[1, 2", "{\"a\": 1}", "[\"x\"]"] {
            std::fs::write(repository.path(), contents)?;
            assert!(
                repository.load().await?.is_empty(),
                "{contents:?} should load as empty history"
            );
        }

        std::fs::write(repository.path(), [0xff, 0xfe, 0x00])?;
        assert!(repository.load().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_file() -> Result<()> {
        let dir = tempdir()?;
        let repository = repository(dir.path())?;
        let previous = [t0(), t0() + Duration::seconds(30)];
        repository.save(&previous).await?;

        // A directory in place of the temp file makes the write fail before the rename.
        std::fs::create_dir(dir.path().join("stopwatch.json.tmp"))?;

        let result = repository.save(&[t0() + Duration::seconds(90)]).await;
        assert!(matches!(result, Err(StorageError::Io { .. })));

        assert_eq!(repository.load().await?, previous);
        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_target_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let repository = repository(dir.path())?;
        std::fs::create_dir(repository.path())?;

        let result = repository.load().await;
        assert!(matches!(result, Err(StorageError::Io { .. })));
        Ok(())
    }
}
