// ── Juniper MX driver ──
//
// Junos `set`/`delete` command sets pushed over an SSH-CLI session. The
// MX joins TF virtual networks to the DCI fabric through two routing
// instances stitched by a logical tunnel: `face-2-tf` (VNI of the TF
// network) and `face-2-dci` (allocated DCI VNI), both carrying the same
// inter-VLAN id.

use async_trait::async_trait;

use crate::device::driver::{
    Action, ConfigTemplate, DeviceDriver, L2DciTemplate, L3DciTemplate, UsedIdentifiers,
    unsupported,
};
use crate::device::transaction::{ApplyOutcome, CliExecutor, TransactionExecutor};
use crate::error::CoreError;
use crate::model::{Vendor, WanNode};

pub const FACE_TO_TF_INSTANCE: &str = "face-2-tf";
pub const FACE_TO_DCI_INSTANCE: &str = "face-2-dci";
pub const EVPN_TYPE5_DCI_INSTANCE: &str = "DCI-EVPN-T5-RI-01";
const LOGICAL_TUNNEL: &str = "lt-0/0/10";

pub struct MxDriver {
    node: WanNode,
    executor: CliExecutor,
}

impl MxDriver {
    pub fn new(node: WanNode, executor: CliExecutor) -> Self {
        Self { node, executor }
    }
}

fn verb(action: Action) -> &'static str {
    match action {
        Action::Create => "set",
        Action::Delete => "delete",
    }
}

fn render_l2(t: &L2DciTemplate, action: Action) -> Vec<String> {
    let a = verb(action);
    let (bd, vlan) = (&t.vn_name, t.inter_vlan_id);
    let mut commands = vec![format!(
        "{a} routing-instances {FACE_TO_TF_INSTANCE} protocols evpn vni-options vni {} vrf-target {}",
        t.vn_vni, t.vn_route_target
    )];
    for (instance, vni, unit) in [
        (FACE_TO_TF_INSTANCE, t.vn_vni, 0),
        (FACE_TO_DCI_INSTANCE, t.dci_vni, 1),
    ] {
        commands.extend([
            format!("{a} routing-instances {instance} bridge-domains {bd} domain-type bridge"),
            format!("{a} routing-instances {instance} bridge-domains {bd} vxlan vni {vni}"),
            format!("{a} routing-instances {instance} bridge-domains {bd} vlan-id {vlan}"),
            format!("{a} interfaces {LOGICAL_TUNNEL} unit {unit} family bridge vlan-id-list {vlan}"),
        ]);
    }
    commands
}

fn render_l3(t: &L3DciTemplate, action: Action) -> Vec<String> {
    vec![format!(
        "{} routing-instances {EVPN_TYPE5_DCI_INSTANCE} routing-options static route {} discard",
        verb(action),
        t.subnet
    )]
}

/// Pull `vlan-id N` and `vxlan vni N` out of `show configuration` set-form
/// output for the DCI-facing instance.
fn parse_used(output: &str) -> UsedIdentifiers {
    let mut used = UsedIdentifiers::default();
    let prefix = format!("set routing-instances {FACE_TO_DCI_INSTANCE} bridge-domains ");
    for line in output.lines().map(str::trim) {
        let Some(rest) = line.strip_prefix(prefix.as_str()) else {
            continue;
        };
        let words: Vec<&str> = rest.split_whitespace().collect();
        match words.as_slice() {
            [_, "vlan-id", id] => {
                if let Ok(v) = id.parse() {
                    used.vlans.insert(v);
                }
            }
            [_, "vxlan", "vni", id] => {
                if let Ok(v) = id.parse() {
                    used.vnis.insert(v);
                }
            }
            _ => {}
        }
    }
    used
}

#[async_trait]
impl DeviceDriver for MxDriver {
    fn vendor(&self) -> Vendor {
        Vendor::Juniper
    }

    fn node(&self) -> &WanNode {
        &self.node
    }

    async fn liveness(&self) -> Result<(), CoreError> {
        self.executor.query(&["show version"]).await.map(|_| ())
    }

    async fn apply(
        &self,
        template: &ConfigTemplate,
        action: Action,
    ) -> Result<ApplyOutcome, CoreError> {
        let commands = match template {
            ConfigTemplate::L2EvpnDci(t) => render_l2(t, action),
            ConfigTemplate::L3EvpnDci(t) => render_l3(t, action),
            _ => return Err(unsupported(&self.node, template)),
        };
        self.executor.apply(&commands).await
    }

    async fn used_identifiers(&self) -> Result<UsedIdentifiers, CoreError> {
        let command = format!(
            "show configuration routing-instances {FACE_TO_DCI_INSTANCE} bridge-domains | display set | no-more"
        );
        let output = self.executor.query(&[command.as_str()]).await?;
        Ok(parse_used(&output))
    }
}
