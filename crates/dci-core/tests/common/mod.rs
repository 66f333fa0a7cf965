// Shared fakes for the dci-core integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dci_api::netconf::{CAP_CANDIDATE, CAP_ROLLBACK_ON_ERROR, CAP_VALIDATE};
use dci_api::vnc::VirtualNetworkSpec;
use dci_api::{
    CliConnector, CliSession, CliTarget, Datastore, EditConfig, NetconfConnector, NetconfSession,
    NetconfTarget, RpcReply,
};
use secrecy::SecretString;
use uuid::Uuid;

use dci_core::device::{Action, ApplyOutcome, ConfigTemplate, DeviceDriver, DriverProvider, UsedIdentifiers};
use dci_core::model::{DeviceEndpoint, SdnControllerProfile};
use dci_core::{
    Backends, ConnectionProfile, CoreConfig, CoreError, InventoryRepository, LifecycleState,
    MemoryStore, NetworkSlicingManager, RecordLock, SdnClient, SdnProvider, Site, SlicingFilter,
    SlicingRecord, SlicingRepository, SlicingUpdate, Vendor, WanNode,
};

/// Ordered record of every remote call across both sites.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

fn transient() -> CoreError {
    CoreError::Transport {
        message: "connection reset".into(),
    }
}

// ── SDN controller ──────────────────────────────────────────────────

pub struct FakeSdn {
    side: &'static str,
    journal: Journal,
    pub networks: Mutex<HashMap<String, Uuid>>,
    pub vni: u32,
    pub fail_create: Mutex<bool>,
    pub fail_vni: Mutex<bool>,
    /// Remaining transient delete failures.
    pub flaky_deletes: AtomicU32,
    pub fail_delete: Mutex<bool>,
}

impl FakeSdn {
    pub fn new(side: &'static str, journal: Journal, vni: u32) -> Self {
        Self {
            side,
            journal,
            networks: Mutex::new(HashMap::new()),
            vni,
            fail_create: Mutex::new(false),
            fail_vni: Mutex::new(false),
            flaky_deletes: AtomicU32::new(0),
            fail_delete: Mutex::new(false),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.networks.lock().unwrap().contains_key(name)
    }
}

#[async_trait]
impl SdnClient for FakeSdn {
    async fn create_virtual_network(&self, spec: &VirtualNetworkSpec) -> Result<Uuid, CoreError> {
        self.journal.push(format!("{}:create-vn", self.side));
        if *self.fail_create.lock().unwrap() {
            return Err(CoreError::Validation {
                message: "subnet overlaps".into(),
            });
        }
        let id = Uuid::new_v4();
        self.networks.lock().unwrap().insert(spec.name.clone(), id);
        Ok(id)
    }

    async fn virtual_network_vni(&self, _id: Uuid) -> Result<u32, CoreError> {
        if *self.fail_vni.lock().unwrap() {
            return Err(transient());
        }
        Ok(self.vni)
    }

    async fn delete_virtual_network(&self, name: &str) -> Result<bool, CoreError> {
        self.journal.push(format!("{}:delete-vn", self.side));
        if *self.fail_delete.lock().unwrap() {
            return Err(CoreError::Conflict {
                message: "network still has ports".into(),
            });
        }
        if self
            .flaky_deletes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(transient());
        }
        Ok(self.networks.lock().unwrap().remove(name).is_some())
    }

    async fn ping(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

pub struct FakeSdnProvider(pub HashMap<Uuid, Arc<FakeSdn>>);

impl SdnProvider for FakeSdnProvider {
    fn client_for(&self, site: &Site) -> Result<Arc<dyn SdnClient>, CoreError> {
        let client = self.0.get(&site.id).ok_or_else(|| CoreError::Internal("unknown site".into()))?;
        Ok(Arc::clone(client) as Arc<dyn SdnClient>)
    }
}

// ── Device driver ───────────────────────────────────────────────────

pub struct FakeDriver {
    side: &'static str,
    node: WanNode,
    journal: Journal,
    pub used: UsedIdentifiers,
    pub applied: Mutex<Vec<(ConfigTemplate, Action)>>,
    pub fail_create: Mutex<bool>,
    pub fail_delete: Mutex<bool>,
}

impl FakeDriver {
    pub fn new(side: &'static str, node: WanNode, journal: Journal, used: UsedIdentifiers) -> Self {
        Self {
            side,
            node,
            journal,
            used,
            applied: Mutex::new(Vec::new()),
            fail_create: Mutex::new(false),
            fail_delete: Mutex::new(false),
        }
    }

    pub fn applied(&self) -> Vec<(ConfigTemplate, Action)> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeviceDriver for FakeDriver {
    fn vendor(&self) -> Vendor {
        self.node.vendor
    }

    fn node(&self) -> &WanNode {
        &self.node
    }

    async fn liveness(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn apply(&self, template: &ConfigTemplate, action: Action) -> Result<ApplyOutcome, CoreError> {
        self.journal.push(format!("{}:{action}-config", self.side));
        let fail = match action {
            Action::Create => *self.fail_create.lock().unwrap(),
            Action::Delete => *self.fail_delete.lock().unwrap(),
        };
        if fail {
            return Err(CoreError::ApplyRejected {
                device: self.node.name.clone(),
                output: "Error: bridge-domain is in use".into(),
            });
        }
        self.applied.lock().unwrap().push((template.clone(), action));
        Ok(ApplyOutcome {
            device: self.node.name.clone(),
            output: String::new(),
        })
    }

    async fn used_identifiers(&self) -> Result<UsedIdentifiers, CoreError> {
        Ok(self.used.clone())
    }
}

pub struct FakeDriverProvider(pub HashMap<Uuid, Arc<FakeDriver>>);

impl DriverProvider for FakeDriverProvider {
    fn driver_for(&self, node: &WanNode) -> Result<Arc<dyn DeviceDriver>, CoreError> {
        let driver = self.0.get(&node.id).ok_or_else(|| CoreError::Internal("unknown node".into()))?;
        Ok(Arc::clone(driver) as Arc<dyn DeviceDriver>)
    }
}

// ── Inventory fixtures ──────────────────────────────────────────────

pub fn site(name: &str, nodes: Vec<Uuid>) -> Site {
    Site {
        id: Uuid::new_v4(),
        name: name.into(),
        sdn: SdnControllerProfile {
            host: format!("{name}.tf.example"),
            port: 8082,
            project: "admin".into(),
            username: None,
            password: None,
            tls: false,
        },
        wan_nodes: nodes,
        state: LifecycleState::Active,
    }
}

pub fn endpoint(host: &str) -> DeviceEndpoint {
    DeviceEndpoint {
        host: host.into(),
        port: 830,
        username: "netconf".into(),
        password: SecretString::from("secret"),
    }
}

pub fn node(name: &str, vendor: Vendor, as_number: Option<u32>) -> WanNode {
    WanNode {
        id: Uuid::new_v4(),
        name: name.into(),
        vendor,
        connection: ConnectionProfile::Netconf(endpoint(&format!("{name}.example"))),
        presets: Default::default(),
        roles: BTreeSet::new(),
        as_number,
        state: LifecycleState::Active,
    }
}

// ── Slicing records ─────────────────────────────────────────────────

/// Memory-backed records whose delete can be made to fail.
pub struct FlakyRecords {
    inner: Arc<MemoryStore>,
    pub fail_delete: Mutex<bool>,
}

#[async_trait]
impl SlicingRepository for FlakyRecords {
    async fn get(&self, id: Uuid) -> Result<SlicingRecord, CoreError> {
        SlicingRepository::get(self.inner.as_ref(), id).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<SlicingRecord>, CoreError> {
        self.inner.find_by_name(name).await
    }

    async fn list(&self, filter: &SlicingFilter) -> Result<Vec<SlicingRecord>, CoreError> {
        self.inner.list(filter).await
    }

    async fn create(&self, record: &SlicingRecord) -> Result<(), CoreError> {
        self.inner.create(record).await
    }

    async fn update(&self, id: Uuid, update: SlicingUpdate) -> Result<SlicingRecord, CoreError> {
        self.inner.update(id, update).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), CoreError> {
        if *self.fail_delete.lock().unwrap() {
            return Err(CoreError::Repository {
                message: "disk full".into(),
            });
        }
        self.inner.delete(id).await
    }

    async fn lock_for_update(&self, key: &str) -> Result<RecordLock, CoreError> {
        self.inner.lock_for_update(key).await
    }
}

/// Two sites with one node each, fakes wired into a manager.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub records: Arc<FlakyRecords>,
    pub manager: NetworkSlicingManager,
    pub journal: Journal,
    pub east_site: Site,
    pub west_site: Site,
    pub east_sdn: Arc<FakeSdn>,
    pub west_sdn: Arc<FakeSdn>,
    pub east_driver: Arc<FakeDriver>,
    pub west_driver: Arc<FakeDriver>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_usage(UsedIdentifiers::default(), UsedIdentifiers::default())
    }

    pub fn with_usage(east_used: UsedIdentifiers, west_used: UsedIdentifiers) -> Self {
        let journal = Journal::default();
        let east_node = node("dcgw-east", Vendor::Huawei, Some(65001));
        let west_node = node("dcgw-west", Vendor::Huawei, Some(65002));
        let east_site = site("east", vec![east_node.id]);
        let west_site = site("west", vec![west_node.id]);

        let store = Arc::new(MemoryStore::new());
        store.upsert_site(east_site.clone());
        store.upsert_site(west_site.clone());
        store.upsert_wan_node(east_node.clone());
        store.upsert_wan_node(west_node.clone());

        let east_sdn = Arc::new(FakeSdn::new("east", journal.clone(), 4101));
        let west_sdn = Arc::new(FakeSdn::new("west", journal.clone(), 4202));
        let east_driver = Arc::new(FakeDriver::new("east", east_node.clone(), journal.clone(), east_used));
        let west_driver = Arc::new(FakeDriver::new("west", west_node.clone(), journal.clone(), west_used));

        let backends = Backends {
            sdn: Arc::new(FakeSdnProvider(HashMap::from([
                (east_site.id, Arc::clone(&east_sdn)),
                (west_site.id, Arc::clone(&west_sdn)),
            ]))),
            drivers: Arc::new(FakeDriverProvider(HashMap::from([
                (east_node.id, Arc::clone(&east_driver)),
                (west_node.id, Arc::clone(&west_driver)),
            ]))),
        };
        let config = CoreConfig {
            teardown_retries: 2,
            retry_backoff: Duration::ZERO,
            ..CoreConfig::default()
        };
        let records = Arc::new(FlakyRecords {
            inner: Arc::clone(&store),
            fail_delete: Mutex::new(false),
        });
        let slicings: Arc<dyn SlicingRepository> = records.clone();
        let inventory: Arc<dyn InventoryRepository> = store.clone();
        let manager = NetworkSlicingManager::new(slicings, inventory, backends, config).with_seed(42);

        Self {
            store,
            records,
            manager,
            journal,
            east_site,
            west_site,
            east_sdn,
            west_sdn,
            east_driver,
            west_driver,
        }
    }
}

// ── NETCONF / CLI sessions ──────────────────────────────────────────

pub fn full_capabilities() -> Vec<String> {
    vec![
        "urn:ietf:params:netconf:base:1.0".into(),
        CAP_CANDIDATE.into(),
        CAP_VALIDATE.into(),
        CAP_ROLLBACK_ON_ERROR.into(),
    ]
}

fn nak(message: &str) -> dci_api::Error {
    dci_api::Error::RpcError {
        message: message.into(),
        tag: Some("operation-failed".into()),
    }
}

/// Scripted NETCONF server: logs each RPC by name and NAKs `fail_on`.
#[derive(Clone)]
pub struct ScriptedNetconf {
    pub calls: Journal,
    pub connects: Arc<AtomicUsize>,
    pub capabilities: Vec<String>,
    pub fail_on: Option<&'static str>,
    /// RPC answered with a bare `<rpc-reply/>`.
    pub silent_on: Option<&'static str>,
    pub data: String,
}

impl ScriptedNetconf {
    pub fn new() -> Self {
        Self {
            calls: Journal::default(),
            connects: Arc::new(AtomicUsize::new(0)),
            capabilities: full_capabilities(),
            fail_on: None,
            silent_on: None,
            data: String::new(),
        }
    }
}

struct ScriptedSession {
    script: ScriptedNetconf,
}

impl ScriptedSession {
    fn rpc(&self, name: &'static str) -> Result<RpcReply, dci_api::Error> {
        self.script.calls.push(name);
        if self.script.fail_on == Some(name) {
            return Err(nak(&format!("{name} refused")));
        }
        if self.script.silent_on == Some(name) {
            return Ok(RpcReply::new(r#"<rpc-reply message-id="3"/>"#));
        }
        Ok(RpcReply::ok())
    }
}

#[async_trait]
impl NetconfSession for ScriptedSession {
    fn session_id(&self) -> Option<u32> {
        Some(7)
    }

    fn capabilities(&self) -> &[String] {
        &self.script.capabilities
    }

    async fn lock(&mut self, _: Datastore) -> Result<RpcReply, dci_api::Error> {
        self.rpc("lock")
    }

    async fn unlock(&mut self, _: Datastore) -> Result<RpcReply, dci_api::Error> {
        self.rpc("unlock")
    }

    async fn discard_changes(&mut self) -> Result<RpcReply, dci_api::Error> {
        self.rpc("discard-changes")
    }

    async fn edit_config(&mut self, _: &EditConfig) -> Result<RpcReply, dci_api::Error> {
        self.rpc("edit-config")
    }

    async fn validate(&mut self, _: Datastore) -> Result<RpcReply, dci_api::Error> {
        self.rpc("validate")
    }

    async fn commit(&mut self) -> Result<RpcReply, dci_api::Error> {
        self.rpc("commit")
    }

    async fn get(&mut self, _: Option<&str>) -> Result<RpcReply, dci_api::Error> {
        self.rpc("get")?;
        Ok(RpcReply::new(format!("<rpc-reply><data>{}</data></rpc-reply>", self.script.data)))
    }

    async fn get_config(&mut self, _: Datastore, _: Option<&str>) -> Result<RpcReply, dci_api::Error> {
        self.rpc("get-config")?;
        Ok(RpcReply::new(format!("<rpc-reply><data>{}</data></rpc-reply>", self.script.data)))
    }

    async fn dispatch(&mut self, _: &str) -> Result<RpcReply, dci_api::Error> {
        self.rpc("dispatch")
    }

    async fn close(&mut self) -> Result<(), dci_api::Error> {
        self.script.calls.push("close");
        Ok(())
    }
}

#[async_trait]
impl NetconfConnector for ScriptedNetconf {
    async fn connect(&self, _: &NetconfTarget) -> Result<Box<dyn NetconfSession>, dci_api::Error> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession { script: self.clone() }))
    }
}

pub fn netconf_target() -> NetconfTarget {
    NetconfTarget {
        host: "192.0.2.10".into(),
        port: 830,
        username: "netconf".into(),
        password: SecretString::from("secret"),
    }
}

/// Scripted CLI device: echoes each command, or `reply` for a config push.
#[derive(Clone)]
pub struct ScriptedCli {
    pub calls: Journal,
    pub reply: String,
}

impl ScriptedCli {
    pub fn new(reply: &str) -> Self {
        Self {
            calls: Journal::default(),
            reply: reply.into(),
        }
    }
}

struct ScriptedCliSession {
    script: ScriptedCli,
}

#[async_trait]
impl CliSession for ScriptedCliSession {
    async fn send_config_set(&mut self, commands: &[String]) -> Result<String, dci_api::Error> {
        for c in commands {
            self.script.calls.push(c.clone());
        }
        Ok(self.script.reply.clone())
    }

    async fn send_command(&mut self, command: &str) -> Result<String, dci_api::Error> {
        self.script.calls.push(command);
        Ok(self.script.reply.clone())
    }

    async fn save_config(&mut self) -> Result<String, dci_api::Error> {
        self.script.calls.push("save");
        Ok(String::new())
    }

    async fn close(&mut self) -> Result<(), dci_api::Error> {
        self.script.calls.push("close");
        Ok(())
    }
}

#[async_trait]
impl CliConnector for ScriptedCli {
    async fn connect(&self, _: &CliTarget) -> Result<Box<dyn CliSession>, dci_api::Error> {
        Ok(Box::new(ScriptedCliSession { script: self.clone() }))
    }
}
