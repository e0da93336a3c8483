use chrono::Duration;
use tracing::{debug, error, info};

use crate::{
    storage::{error::StorageError, repository::TimestampRepository},
    utils::clock::Clock,
};

use super::intervals::{Interval, IntervalStore};

/// Drives an [IntervalStore] and keeps its flat form on disk.
///
/// The service is idle or running purely by the state of the store. Every mutation is applied in
/// memory first and then saved; a failed save is reported but the mutation stays, so the running
/// session keeps its progress and the next write simply tries again.
pub struct TimerService<R> {
    repository: R,
    clock: Box<dyn Clock>,
    store: IntervalStore,
}

impl<R: TimestampRepository> TimerService<R> {
    /// Creates a service with an empty history without touching the repository.
    pub fn new(repository: R, clock: Box<dyn Clock>) -> Self {
        Self {
            repository,
            clock,
            store: IntervalStore::new(),
        }
    }

    /// Creates a service and fills it from the repository.
    pub async fn load(repository: R, clock: Box<dyn Clock>) -> Result<Self, StorageError> {
        let mut service = Self::new(repository, clock);
        service.initialize().await?;
        Ok(service)
    }

    /// Replaces the in-memory history with what the repository holds.
    pub async fn initialize(&mut self) -> Result<(), StorageError> {
        let timestamps = self.repository.load().await?;
        self.store = IntervalStore::from_timestamps(&timestamps);
        info!(
            "Restored {} intervals, running: {}",
            self.store.intervals().len(),
            self.store.is_running()
        );
        Ok(())
    }

    pub async fn start(&mut self) -> Result<(), StorageError> {
        let now = self.clock.time();
        self.store.start(now);
        debug!("Started at {now}");
        self.persist().await
    }

    pub async fn stop(&mut self) -> Result<(), StorageError> {
        let now = self.clock.time();
        self.store.stop(now);
        debug!("Stopped at {now}");
        self.persist().await
    }

    pub async fn clear(&mut self) -> Result<(), StorageError> {
        self.store.clear();
        info!("Cleared history");
        self.persist().await
    }

    pub fn elapsed(&self) -> Duration {
        self.store.total_elapsed(self.clock.time())
    }

    pub fn is_running(&self) -> bool {
        self.store.is_running()
    }

    pub fn intervals(&self) -> &[Interval] {
        self.store.intervals()
    }

    /// Saves the running interval as if it had stopped now, leaving it open in memory. A crash
    /// before the next stop then loses at most the time since the last checkpoint.
    pub async fn checkpoint(&self) -> Result<(), StorageError> {
        if !self.store.is_running() {
            return Ok(());
        }
        let mut timestamps = self.store.to_timestamps();
        timestamps.push(self.clock.time());
        self.repository.save(&timestamps).await
    }

    /// Final stop on the way out. Nothing is written when the timer is idle.
    pub async fn shutdown(&mut self) -> Result<(), StorageError> {
        if !self.store.is_running() {
            return Ok(());
        }
        info!("Stopping running timer before exit");
        self.stop().await
    }

    async fn persist(&self) -> Result<(), StorageError> {
        self.repository
            .save(&self.store.to_timestamps())
            .await
            .inspect_err(|e| error!("Failed to save history: {e}"))
    }
}
