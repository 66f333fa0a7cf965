// ── Persistence seams ──
//
// The core reads inventory and reads/writes slicing records only through
// these traits. `store::{MemoryStore, FileStore}` are the bundled
// implementations.

use std::fs::File;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{LifecycleState, Site, SlicingFilter, SlicingRecord, WanNode};

/// Partial update of a slicing record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlicingUpdate {
    pub state: Option<LifecycleState>,
}

impl SlicingUpdate {
    /// Apply to `record` and bump its `updated_at`.
    pub fn apply_to(&self, record: &mut SlicingRecord) {
        if let Some(state) = self.state {
            record.state = state;
        }
        record.updated_at = Utc::now();
    }
}

type LockTable = DashMap<String, Arc<Mutex<()>>>;

/// Exclusive hold on one record key for the duration of a flow.
#[derive(Debug)]
pub struct RecordLock {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    table: Arc<LockTable>,
    /// Cross-process advisory lock, when the repository has one.
    file: Option<File>,
}

impl RecordLock {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Keep `file` (holding an OS lock) open until this lock is released.
    pub fn hold_file(mut self, file: File) -> Self {
        self.file = Some(file);
        self
    }
}

impl Drop for RecordLock {
    fn drop(&mut self) {
        self.file.take();
        self.guard.take();
        // nobody waiting: forget the key
        self.table
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// Per-key async mutexes backing `lock_for_update`. Entries exist only
/// while a key is held or awaited.
#[derive(Debug, Default)]
pub struct RecordLocks {
    table: Arc<LockTable>,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &str) -> RecordLock {
        let mutex = Arc::clone(
            self.table
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        RecordLock {
            key: key.to_owned(),
            guard: Some(mutex.lock_owned().await),
            table: Arc::clone(&self.table),
            file: None,
        }
    }

    /// Keys currently held or awaited.
    pub fn active(&self) -> usize {
        self.table.len()
    }
}

#[async_trait]
pub trait SlicingRepository: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<SlicingRecord, CoreError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<SlicingRecord>, CoreError>;

    async fn list(&self, filter: &SlicingFilter) -> Result<Vec<SlicingRecord>, CoreError>;

    /// Insert a new record. Names are unique.
    async fn create(&self, record: &SlicingRecord) -> Result<(), CoreError>;

    async fn update(&self, id: Uuid, update: SlicingUpdate) -> Result<SlicingRecord, CoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), CoreError>;

    /// Serialize flows on `key` (the slicing name). Reads made while the
    /// lock is held see every write committed before it was granted.
    async fn lock_for_update(&self, key: &str) -> Result<RecordLock, CoreError>;
}

/// Read-only inventory as seen by the core.
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    async fn site(&self, id: Uuid) -> Result<Site, CoreError>;
    async fn sites(&self) -> Result<Vec<Site>, CoreError>;
    async fn wan_node(&self, id: Uuid) -> Result<WanNode, CoreError>;
    async fn wan_nodes(&self) -> Result<Vec<WanNode>, CoreError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(RecordLocks::new());
        let held = locks.acquire("s1").await;
        assert_eq!(held.key(), "s1");

        let other = Arc::clone(&locks);
        let waiter = tokio::spawn(async move { other.acquire("s1").await.key().to_owned() });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        // different keys don't contend
        let _b = locks.acquire("s2").await;

        drop(held);
        assert_eq!(waiter.await.ok().as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn released_keys_are_forgotten() {
        let locks = Arc::new(RecordLocks::new());
        let held = locks.acquire("s1").await;
        assert_eq!(locks.active(), 1);

        let other = Arc::clone(&locks);
        let waiter = tokio::spawn(async move {
            let _again = other.acquire("s1").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // the waiter still needs the entry
        drop(held);
        assert_eq!(locks.active(), 1);

        waiter.await.unwrap();
        assert_eq!(locks.active(), 0);

        for name in ["a", "b", "c"] {
            drop(locks.acquire(name).await);
        }
        assert_eq!(locks.active(), 0);
    }
}
