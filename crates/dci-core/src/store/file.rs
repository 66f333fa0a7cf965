// ── JSON state file repository ──
//
// The whole state (inventory + slicing records) lives in one JSON document
// that several processes may share. Reads are served from memory. Every
// mutation holds an OS lock on `<path>.lock`, re-reads the document, applies
// the change and rewrites it through a temp file + rename; memory is only
// replaced once the write has landed. Flow locks add an OS lock on one of a
// fixed set of stripe files under `<path>.locks/`.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{Site, SlicingFilter, SlicingRecord, WanNode};
use crate::repository::{InventoryRepository, RecordLock, SlicingRepository, SlicingUpdate};
use crate::store::memory::MemoryStore;

/// Flow lock files per state file.
const LOCK_STRIPES: u64 = 32;

/// On-disk layout.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub sites: Vec<Site>,
    #[serde(default)]
    pub wan_nodes: Vec<WanNode>,
    #[serde(default)]
    pub slicings: Vec<SlicingRecord>,
}

pub struct FileStore {
    path: PathBuf,
    memory: MemoryStore,
    /// Serializes this process's reloads and rewrites.
    write: Mutex<()>,
}

fn io_err(path: &Path, action: &str, err: &std::io::Error) -> CoreError {
    CoreError::Repository {
        message: format!("cannot {action} {}: {err}", path.display()),
    }
}

fn not_found(resource: &str, id: Uuid) -> CoreError {
    CoreError::ResourceNotFound {
        resource: resource.to_owned(),
        identifier: id.to_string(),
    }
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// FNV-1a, so every process maps a key to the same stripe.
fn stripe(key: &str) -> u64 {
    let hash = key.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    });
    hash % LOCK_STRIPES
}

/// Open `path` and wait for an exclusive OS lock on it. Dropping the file
/// releases the lock.
async fn lock_file(path: PathBuf) -> Result<File, CoreError> {
    tokio::task::spawn_blocking(move || {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, "create", &e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| io_err(&path, "open", &e))?;
        file.lock_exclusive().map_err(|e| io_err(&path, "lock", &e))?;
        Ok(file)
    })
    .await
    .map_err(|e| CoreError::Internal(format!("lock task failed: {e}")))?
}

async fn read_document(path: &Path) -> Result<StateDocument, CoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let doc: StateDocument = serde_json::from_slice(&bytes).map_err(|e| CoreError::Repository {
                message: format!("corrupt state file {}: {e}", path.display()),
            })?;
            debug!(
                path = %path.display(),
                sites = doc.sites.len(),
                wan_nodes = doc.wan_nodes.len(),
                slicings = doc.slicings.len(),
                "state loaded"
            );
            Ok(doc)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no state file yet, starting empty");
            Ok(StateDocument::default())
        }
        Err(e) => Err(io_err(path, "read", &e)),
    }
}

async fn write_document(path: &Path, doc: &StateDocument) -> Result<(), CoreError> {
    let body = serde_json::to_vec_pretty(doc)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| io_err(dir, "create", &e))?;
    }
    let tmp = sidecar(path, ".tmp");
    tokio::fs::write(&tmp, &body)
        .await
        .map_err(|e| io_err(&tmp, "write", &e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| io_err(path, "replace", &e))?;
    debug!(path = %path.display(), bytes = body.len(), "state saved");
    Ok(())
}

/// Insert or replace by id. Returns `true` if it was new.
fn upsert<T>(items: &mut Vec<T>, item: T, id: impl Fn(&T) -> Uuid) -> bool {
    let wanted = id(&item);
    match items.iter().position(|i| id(i) == wanted) {
        Some(pos) => {
            items[pos] = item;
            false
        }
        None => {
            items.push(item);
            true
        }
    }
}

fn take<T>(items: &mut Vec<T>, wanted: Uuid, id: impl Fn(&T) -> Uuid) -> Option<T> {
    let pos = items.iter().position(|i| id(i) == wanted)?;
    Some(items.remove(pos))
}

impl FileStore {
    /// Open `path`, starting empty when it does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CoreError> {
        let store = Self {
            path: path.into(),
            memory: MemoryStore::new(),
            write: Mutex::new(()),
        };
        store.refresh().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self, doc: StateDocument) {
        self.memory.reset(doc.sites, doc.wan_nodes, doc.slicings);
    }

    /// Reload memory from disk.
    async fn refresh(&self) -> Result<(), CoreError> {
        let _held = self.write.lock().await;
        let doc = read_document(&self.path).await?;
        self.load(doc);
        Ok(())
    }

    /// Apply `change` to the current on-disk document and write it back.
    /// Nothing changes, on disk or in memory, if `change` or the write fails.
    async fn mutate<T, F>(&self, change: F) -> Result<T, CoreError>
    where
        T: Send,
        F: FnOnce(&mut StateDocument) -> Result<T, CoreError> + Send,
    {
        let _held = self.write.lock().await;
        let _document = lock_file(sidecar(&self.path, ".lock")).await?;
        let mut doc = read_document(&self.path).await?;
        let out = change(&mut doc)?;
        write_document(&self.path, &doc).await?;
        self.load(doc);
        Ok(out)
    }

    // ── Inventory maintenance (CLI only; the core never writes inventory) ──

    pub async fn upsert_site(&self, site: Site) -> Result<bool, CoreError> {
        self.mutate(move |doc| Ok(upsert(&mut doc.sites, site, |s| s.id))).await
    }

    pub async fn upsert_wan_node(&self, node: WanNode) -> Result<bool, CoreError> {
        self.mutate(move |doc| Ok(upsert(&mut doc.wan_nodes, node, |n| n.id))).await
    }

    pub async fn remove_site(&self, id: Uuid) -> Result<Site, CoreError> {
        self.mutate(move |doc| take(&mut doc.sites, id, |s| s.id).ok_or_else(|| not_found("site", id)))
            .await
    }

    pub async fn remove_wan_node(&self, id: Uuid) -> Result<WanNode, CoreError> {
        self.mutate(move |doc| {
            take(&mut doc.wan_nodes, id, |n| n.id).ok_or_else(|| not_found("WAN node", id))
        })
        .await
    }
}

#[async_trait]
impl SlicingRepository for FileStore {
    async fn get(&self, id: Uuid) -> Result<SlicingRecord, CoreError> {
        SlicingRepository::get(&self.memory, id).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<SlicingRecord>, CoreError> {
        self.memory.find_by_name(name).await
    }

    async fn list(&self, filter: &SlicingFilter) -> Result<Vec<SlicingRecord>, CoreError> {
        self.memory.list(filter).await
    }

    async fn create(&self, record: &SlicingRecord) -> Result<(), CoreError> {
        let record = record.clone();
        self.mutate(move |doc| {
            if doc.slicings.iter().any(|r| r.name == record.name) {
                return Err(CoreError::Conflict {
                    message: format!("slicing '{}' already exists", record.name),
                });
            }
            debug!(slicing = %record.name, id = %record.id, "record created");
            doc.slicings.push(record);
            Ok(())
        })
        .await
    }

    async fn update(&self, id: Uuid, update: SlicingUpdate) -> Result<SlicingRecord, CoreError> {
        self.mutate(move |doc| {
            let record = doc
                .slicings
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| not_found("slicing", id))?;
            update.apply_to(record);
            Ok(record.clone())
        })
        .await
    }

    async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        self.mutate(move |doc| {
            let record = take(&mut doc.slicings, id, |r| r.id).ok_or_else(|| not_found("slicing", id))?;
            debug!(slicing = %record.name, %id, "record deleted");
            Ok(())
        })
        .await
    }

    async fn lock_for_update(&self, key: &str) -> Result<RecordLock, CoreError> {
        let lock = self.memory.lock_for_update(key).await?;
        let stripe_file = sidecar(&self.path, ".locks").join(format!("{}.lock", stripe(key)));
        let file = lock_file(stripe_file).await?;
        // another process may have written while we waited
        self.refresh().await?;
        Ok(lock.hold_file(file))
    }
}

#[async_trait]
impl InventoryRepository for FileStore {
    async fn site(&self, id: Uuid) -> Result<Site, CoreError> {
        self.memory.site(id).await
    }

    async fn sites(&self) -> Result<Vec<Site>, CoreError> {
        self.memory.sites().await
    }

    async fn wan_node(&self, id: Uuid) -> Result<WanNode, CoreError> {
        self.memory.wan_node(id).await
    }

    async fn wan_nodes(&self) -> Result<Vec<WanNode>, CoreError> {
        self.memory.wan_nodes().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::LifecycleState;
    use crate::store::memory::tests::record;

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("dci.json");

        let store = FileStore::open(&path).await.unwrap();
        let r = record("s1");
        store.create(&r).await.unwrap();
        store
            .update(
                r.id,
                SlicingUpdate {
                    state: Some(LifecycleState::Inactive),
                },
            )
            .await
            .unwrap();
        drop(store);

        let reopened = FileStore::open(&path).await.unwrap();
        let back = reopened.find_by_name("s1").await.unwrap().unwrap();
        assert_eq!(back.id, r.id);
        assert_eq!(back.state, LifecycleState::Inactive);

        reopened.delete(r.id).await.unwrap();
        let again = FileStore::open(&path).await.unwrap();
        assert!(again.list(&SlicingFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn handles_on_one_file_keep_each_others_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dci.json");

        let a = FileStore::open(&path).await.unwrap();
        let b = FileStore::open(&path).await.unwrap();
        a.create(&record("slice-a")).await.unwrap();
        b.create(&record("slice-b")).await.unwrap();

        let reopened = FileStore::open(&path).await.unwrap();
        let names: Vec<String> = reopened
            .list(&SlicingFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, ["slice-a", "slice-b"]);

        // b never saw slice-a in memory, but its write still conflicts
        let err = b.create(&record("slice-a")).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn flow_lock_spans_handles_and_refreshes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dci.json");
        let a = FileStore::open(&path).await.unwrap();
        let b = std::sync::Arc::new(FileStore::open(&path).await.unwrap());

        let held = a.lock_for_update("blue").await.unwrap();
        a.create(&record("blue")).await.unwrap();

        let waiter = {
            let b = std::sync::Arc::clone(&b);
            tokio::spawn(async move {
                let _lock = b.lock_for_update("blue").await.unwrap();
                b.find_by_name("blue").await.unwrap().is_some()
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(held);
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn failed_write_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dci.json");
        let store = FileStore::open(&path).await.unwrap();
        let r = record("s1");
        store.create(&r).await.unwrap();

        // a directory where the temp file goes makes every write fail
        let tmp = sidecar(&path, ".tmp");
        std::fs::create_dir(&tmp).unwrap();

        assert!(matches!(store.delete(r.id).await, Err(CoreError::Repository { .. })));
        let update = SlicingUpdate {
            state: Some(LifecycleState::Inactive),
        };
        assert!(store.update(r.id, update.clone()).await.is_err());
        assert_eq!(store.get(r.id).await.unwrap().state, LifecycleState::Active);
        let on_disk = FileStore::open(&path).await.unwrap();
        assert_eq!(on_disk.get(r.id).await.unwrap().state, LifecycleState::Active);

        std::fs::remove_dir(&tmp).unwrap();
        store.update(r.id, update).await.unwrap();
        store.delete(r.id).await.unwrap();
        assert!(store.find_by_name("s1").await.unwrap().is_none());
    }

    #[test]
    fn stripes_are_stable_and_bounded() {
        assert_eq!(stripe("blue"), stripe("blue"));
        assert!(["a", "blue", "ns-dcn-l2vpn-red", ""].iter().all(|k| stripe(k) < LOCK_STRIPES));
    }

    #[tokio::test]
    async fn corrupt_file_is_a_repository_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dci.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(
            FileStore::open(&path).await,
            Err(CoreError::Repository { .. })
        ));
    }
}
