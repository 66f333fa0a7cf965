// ── In-memory repository ──
//
// Concurrent maps keyed by UUID with a name index for slicings. Backs the
// JSON file store and the test suites.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{Site, SlicingFilter, SlicingRecord, WanNode};
use crate::repository::{
    InventoryRepository, RecordLock, RecordLocks, SlicingRepository, SlicingUpdate,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    sites: DashMap<Uuid, Arc<Site>>,
    wan_nodes: DashMap<Uuid, Arc<WanNode>>,
    slicings: DashMap<Uuid, Arc<SlicingRecord>>,
    /// Secondary index: slicing name -> id.
    slicing_names: DashMap<String, Uuid>,
    locks: RecordLocks,
}

fn not_found(resource: &str, id: impl ToString) -> CoreError {
    CoreError::ResourceNotFound {
        resource: resource.to_owned(),
        identifier: id.to_string(),
    }
}

fn sorted<T: Clone>(map: &DashMap<Uuid, Arc<T>>, name: impl Fn(&T) -> &str) -> Vec<T> {
    let mut values: Vec<T> = map.iter().map(|r| T::clone(r.value())).collect();
    values.sort_by(|a, b| name(a).cmp(name(b)));
    values
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a site. Returns `true` if it was new.
    pub fn upsert_site(&self, site: Site) -> bool {
        self.sites.insert(site.id, Arc::new(site)).is_none()
    }

    /// Insert or replace a WAN node. Returns `true` if it was new.
    pub fn upsert_wan_node(&self, node: WanNode) -> bool {
        self.wan_nodes.insert(node.id, Arc::new(node)).is_none()
    }

    pub fn remove_site(&self, id: Uuid) -> Option<Site> {
        self.sites.remove(&id).map(|(_, s)| Site::clone(&s))
    }

    pub fn remove_wan_node(&self, id: Uuid) -> Option<WanNode> {
        self.wan_nodes.remove(&id).map(|(_, n)| WanNode::clone(&n))
    }

    /// Load a slicing record as-is (state file restore).
    pub(crate) fn restore_slicing(&self, record: SlicingRecord) {
        self.slicing_names.insert(record.name.clone(), record.id);
        self.slicings.insert(record.id, Arc::new(record));
    }

    /// Replace the whole contents, keeping the record locks.
    pub(crate) fn reset(&self, sites: Vec<Site>, wan_nodes: Vec<WanNode>, slicings: Vec<SlicingRecord>) {
        self.sites.clear();
        self.wan_nodes.clear();
        self.slicings.clear();
        self.slicing_names.clear();
        for site in sites {
            self.upsert_site(site);
        }
        for node in wan_nodes {
            self.upsert_wan_node(node);
        }
        for record in slicings {
            self.restore_slicing(record);
        }
    }

    pub(crate) fn all_sites(&self) -> Vec<Site> {
        sorted(&self.sites, |s| s.name.as_str())
    }

    pub(crate) fn all_wan_nodes(&self) -> Vec<WanNode> {
        sorted(&self.wan_nodes, |n| n.name.as_str())
    }

    pub(crate) fn all_slicings(&self) -> Vec<SlicingRecord> {
        sorted(&self.slicings, |r| r.name.as_str())
    }
}

#[async_trait]
impl SlicingRepository for MemoryStore {
    async fn get(&self, id: Uuid) -> Result<SlicingRecord, CoreError> {
        self.slicings
            .get(&id)
            .map(|r| SlicingRecord::clone(r.value()))
            .ok_or_else(|| not_found("slicing", id))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<SlicingRecord>, CoreError> {
        let Some(id) = self.slicing_names.get(name).map(|r| *r.value()) else {
            return Ok(None);
        };
        Ok(self.slicings.get(&id).map(|r| SlicingRecord::clone(r.value())))
    }

    async fn list(&self, filter: &SlicingFilter) -> Result<Vec<SlicingRecord>, CoreError> {
        Ok(self
            .all_slicings()
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect())
    }

    async fn create(&self, record: &SlicingRecord) -> Result<(), CoreError> {
        match self.slicing_names.entry(record.name.clone()) {
            Entry::Occupied(_) => Err(CoreError::Conflict {
                message: format!("slicing '{}' already exists", record.name),
            }),
            Entry::Vacant(slot) => {
                slot.insert(record.id);
                self.slicings.insert(record.id, Arc::new(record.clone()));
                debug!(slicing = %record.name, id = %record.id, "record created");
                Ok(())
            }
        }
    }

    async fn update(&self, id: Uuid, update: SlicingUpdate) -> Result<SlicingRecord, CoreError> {
        let mut entry = self.slicings.get_mut(&id).ok_or_else(|| not_found("slicing", id))?;
        let mut record = SlicingRecord::clone(entry.value());
        update.apply_to(&mut record);
        *entry.value_mut() = Arc::new(record.clone());
        Ok(record)
    }

    async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        let (_, record) = self.slicings.remove(&id).ok_or_else(|| not_found("slicing", id))?;
        self.slicing_names.remove(&record.name);
        debug!(slicing = %record.name, %id, "record deleted");
        Ok(())
    }

    async fn lock_for_update(&self, key: &str) -> Result<RecordLock, CoreError> {
        Ok(self.locks.acquire(key).await)
    }
}

#[async_trait]
impl InventoryRepository for MemoryStore {
    async fn site(&self, id: Uuid) -> Result<Site, CoreError> {
        self.sites
            .get(&id)
            .map(|r| Site::clone(r.value()))
            .ok_or_else(|| not_found("site", id))
    }

    async fn sites(&self) -> Result<Vec<Site>, CoreError> {
        Ok(self.all_sites())
    }

    async fn wan_node(&self, id: Uuid) -> Result<WanNode, CoreError> {
        self.wan_nodes
            .get(&id)
            .map(|r| WanNode::clone(r.value()))
            .ok_or_else(|| not_found("WAN node", id))
    }

    async fn wan_nodes(&self) -> Result<Vec<WanNode>, CoreError> {
        Ok(self.all_wan_nodes())
    }
}
