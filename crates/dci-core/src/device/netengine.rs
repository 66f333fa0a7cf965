// ── Huawei NetEngine driver ──
//
// NETCONF (huawei-evpn / huawei-l2vpn / huawei-evc / huawei-nvo3 models)
// for the EVPN splice, VRP command sets over SSH for L3VPN over SRv6.

use std::collections::BTreeSet;

use async_trait::async_trait;
use dci_api::Datastore;
use dci_api::netconf::rpc::{element_texts, escape};
use tracing::debug;

use crate::device::driver::{
    Action, ConfigTemplate, DeviceDriver, L3vpnTemplate, NodeRole, SpliceTemplate,
    UsedIdentifiers, preset, unsupported,
};
use crate::device::transaction::{
    ApplyOutcome, CliExecutor, NetconfExecutor, TransactionDescriptor, TransactionExecutor,
};
use crate::error::CoreError;
use crate::model::{Vendor, WanNode};

const NS_EVPN: &str = "http://www.huawei.com/netconf/vrp/huawei-evpn";
const NS_EVC: &str = "http://www.huawei.com/netconf/vrp/huawei-evc";
const NS_NVO3: &str = "http://www.huawei.com/netconf/vrp/huawei-nvo3";
const NS_SYSTEM: &str = "http://www.huawei.com/netconf/vrp/huawei-system";
const NS_NETCONF_BASE: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

enum Channel {
    Netconf(NetconfExecutor),
    Cli(CliExecutor),
}

pub struct NetEngineDriver {
    node: WanNode,
    channel: Channel,
}

impl NetEngineDriver {
    pub fn netconf(node: WanNode, executor: NetconfExecutor) -> Self {
        Self {
            node,
            channel: Channel::Netconf(executor),
        }
    }

    pub fn cli(node: WanNode, executor: CliExecutor) -> Self {
        Self {
            node,
            channel: Channel::Cli(executor),
        }
    }
}

#[async_trait]
impl DeviceDriver for NetEngineDriver {
    fn vendor(&self) -> Vendor {
        Vendor::Huawei
    }

    fn node(&self) -> &WanNode {
        &self.node
    }

    async fn liveness(&self) -> Result<(), CoreError> {
        match &self.channel {
            Channel::Netconf(exec) => {
                let filter = format!(
                    r#"<system xmlns="{NS_SYSTEM}"><systemInfo><sysName/></systemInfo></system>"#
                );
                exec.apply(&TransactionDescriptor::get(filter)).await?;
            }
            Channel::Cli(exec) => {
                exec.query(&["display this"]).await?;
            }
        }
        Ok(())
    }

    async fn apply(
        &self,
        template: &ConfigTemplate,
        action: Action,
    ) -> Result<ApplyOutcome, CoreError> {
        debug!(node = %self.node.name, template = template.name(), %action, "rendering");
        match (&self.channel, template) {
            (Channel::Netconf(exec), ConfigTemplate::EvpnVplsSrv6Splice(t)) => {
                let config = match action {
                    Action::Create => render_splice_create(&self.node, t)?,
                    Action::Delete => render_splice_delete(&self.node, t)?,
                };
                exec.apply(&TransactionDescriptor::edit(config)).await
            }
            (Channel::Cli(exec), ConfigTemplate::L3vpnSrv6(t)) => {
                let commands = render_l3vpn(&self.node, t, action)?;
                exec.apply(&commands).await
            }
            _ => Err(unsupported(&self.node, template)),
        }
    }

    async fn used_identifiers(&self) -> Result<UsedIdentifiers, CoreError> {
        match &self.channel {
            Channel::Netconf(exec) => {
                let filter = format!(
                    r#"<evc xmlns="{NS_EVC}"><bds><bd><bdId/><vlanId/></bd></bds></evc><nvo3 xmlns="{NS_NVO3}"><nvo3Nves><nvo3Nve><vniMembers><vniMember><vniId/></vniMember></vniMembers></nvo3Nve></nvo3Nves></nvo3>"#
                );
                let outcome = exec
                    .apply(&TransactionDescriptor::get_config(Datastore::Running, filter))
                    .await?;
                Ok(UsedIdentifiers {
                    bridge_domains: numbers_in(&outcome.output, "bdId"),
                    vlans: numbers_in(&outcome.output, "vlanId"),
                    vnis: numbers_in(&outcome.output, "vniId"),
                })
            }
            Channel::Cli(exec) => {
                let output = exec.query(&["display bridge-domain"]).await?;
                Ok(UsedIdentifiers {
                    bridge_domains: leading_numbers(&output),
                    ..UsedIdentifiers::default()
                })
            }
        }
    }
}

/// Numeric bodies of every `<tag>` element.
pub(crate) fn numbers_in(xml: &str, tag: &str) -> BTreeSet<u32> {
    element_texts(xml, tag)
        .into_iter()
        .filter_map(|v| v.trim().parse().ok())
        .collect()
}

/// First column of table rows that start with a number.
fn leading_numbers(output: &str) -> BTreeSet<u32> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next()?.parse().ok())
        .collect()
}

// ── Templates ───────────────────────────────────────────────────────

struct SplicePresets<'a> {
    locator: &'a str,
    locator_arg: &'a str,
    nve_interface: &'a str,
    nve_address: &'a str,
    nve_peer: &'a str,
    wan_bd_interface: &'a str,
    access_bd_interface: &'a str,
}

impl<'a> SplicePresets<'a> {
    fn of(node: &'a WanNode) -> Result<Self, CoreError> {
        let p = &node.presets;
        Ok(Self {
            locator: preset(node, p.srv6_locator.as_ref(), "srv6_locator")?,
            locator_arg: preset(node, p.srv6_locator_arg.as_ref(), "srv6_locator_arg")?,
            nve_interface: preset(node, p.vxlan_nve_interface.as_ref(), "vxlan_nve_interface")?,
            nve_address: preset(node, p.vxlan_nve_address.as_ref(), "vxlan_nve_address")?,
            nve_peer: preset(node, p.vxlan_nve_peer_address.as_ref(), "vxlan_nve_peer_address")?,
            wan_bd_interface: preset(node, p.wan_vpn_bd_interface.as_ref(), "wan_vpn_bd_interface")?,
            access_bd_interface: preset(
                node,
                p.access_vpn_bd_interface.as_ref(),
                "access_vpn_bd_interface",
            )?,
        })
    }
}

fn evpn_instance(name: &str, rd: &str, rt: &str, extra: &str) -> String {
    let (name, rd, rt) = (escape(name), escape(rd), escape(rt));
    format!(
        "<evpnInstance><evpnName>{name}</evpnName><evpnRD>{rd}</evpnRD>\
         <evpnRTs><evpnRT><vrfRTType>export_extcommunity</vrfRTType><vrfRTValue>{rt}</vrfRTValue></evpnRT>\
         <evpnRT><vrfRTType>import_extcommunity</vrfRTType><vrfRTValue>{rt}</vrfRTValue></evpnRT></evpnRTs>\
         {extra}</evpnInstance>"
    )
}

fn render_splice_create(node: &WanNode, t: &SpliceTemplate) -> Result<String, CoreError> {
    let p = SplicePresets::of(node)?;
    let wan_srv6 = format!(
        "<srv6Mode>best-effort</srv6Mode><srv6Locator>{}</srv6Locator><srv6LocatorArg>{}</srv6LocatorArg>",
        escape(p.locator),
        escape(p.locator_arg)
    );
    let wan = evpn_instance(
        &t.wan_vpn.name,
        &t.wan_vpn.route_distinguisher,
        &t.wan_vpn.route_target,
        &wan_srv6,
    );
    let access = evpn_instance(
        &t.access_vpn.name,
        &t.access_vpn.route_distinguisher,
        &t.access_vpn.route_target,
        "<encapsulation>vxlan</encapsulation>",
    );

    Ok(format!(
        r#"<evpn xmlns="{NS_EVPN}"><evpnInstances>{wan}{access}</evpnInstances></evpn><evc xmlns="{NS_EVC}"><bds>{wan_bd}{access_bd}</bds></evc><nvo3 xmlns="{NS_NVO3}"><nvo3Nves><nvo3Nve><ifName>{nve}</ifName><srcAddr>{nve_addr}</srcAddr><vniMembers><vniMember><vniId>{vni}</vniId><bdId>{access_bd_id}</bdId><peerAddr>{peer}</peerAddr></vniMember></vniMembers></nvo3Nve></nvo3Nves></nvo3>"#,
        wan_bd = bridge_domain(
            t.wan_vpn.bridge_domain,
            &t.wan_vpn.name,
            p.wan_bd_interface,
            t.splicing_vlan_id
        ),
        access_bd = bridge_domain(
            t.access_vpn.bridge_domain,
            &t.access_vpn.name,
            p.access_bd_interface,
            t.splicing_vlan_id
        ),
        nve = escape(p.nve_interface),
        nve_addr = escape(p.nve_address),
        vni = t.access_vni,
        access_bd_id = t.access_vpn.bridge_domain,
        peer = escape(p.nve_peer),
    ))
}

fn bridge_domain(id: u32, evpn: &str, interface: &str, vlan: u32) -> String {
    format!(
        "<bd><bdId>{id}</bdId><evpnName>{}</evpnName><servicePoints><servicePoint><ifName>{}</ifName><vlanId>{vlan}</vlanId></servicePoint></servicePoints></bd>",
        escape(evpn),
        escape(interface)
    )
}

/// Removes only what the create template added, by key.
fn render_splice_delete(node: &WanNode, t: &SpliceTemplate) -> Result<String, CoreError> {
    let p = &node.presets;
    let nve = preset(node, p.vxlan_nve_interface.as_ref(), "vxlan_nve_interface")?;
    let wan_bd_if = preset(node, p.wan_vpn_bd_interface.as_ref(), "wan_vpn_bd_interface")?;
    let access_bd_if = preset(
        node,
        p.access_vpn_bd_interface.as_ref(),
        "access_vpn_bd_interface",
    )?;
    let rm = format!(r#"xmlns:nc="{NS_NETCONF_BASE}" nc:operation="remove""#);

    Ok(format!(
        r#"<nvo3 xmlns="{NS_NVO3}"><nvo3Nves><nvo3Nve><ifName>{nve}</ifName><vniMembers><vniMember {rm}><vniId>{vni}</vniId></vniMember></vniMembers></nvo3Nve></nvo3Nves></nvo3><evc xmlns="{NS_EVC}"><bds><bd {rm}><bdId>{wan_bd}</bdId><servicePoints><servicePoint><ifName>{wan_bd_if}</ifName></servicePoint></servicePoints></bd><bd {rm}><bdId>{access_bd}</bdId><servicePoints><servicePoint><ifName>{access_bd_if}</ifName></servicePoint></servicePoints></bd></bds></evc><evpn xmlns="{NS_EVPN}"><evpnInstances><evpnInstance {rm}><evpnName>{wan}</evpnName></evpnInstance><evpnInstance {rm}><evpnName>{access}</evpnName></evpnInstance></evpnInstances></evpn>"#,
        nve = escape(nve),
        vni = t.access_vni,
        wan_bd = t.wan_vpn.bridge_domain,
        wan_bd_if = escape(wan_bd_if),
        access_bd = t.access_vpn.bridge_domain,
        access_bd_if = escape(access_bd_if),
        wan = escape(&t.wan_vpn.name),
        access = escape(&t.access_vpn.name),
    ))
}

/// VRP command set for one end of an L3VPN over SRv6 BE.
fn render_l3vpn(node: &WanNode, t: &L3vpnTemplate, action: Action) -> Result<Vec<String>, CoreError> {
    let locator = preset(node, node.presets.srv6_locator.as_ref(), "srv6_locator")?;
    let asn = node.as_number.ok_or_else(|| CoreError::Validation {
        message: format!("WAN node '{}' has no AS number", node.name),
    })?;
    let vpn = &t.vpn_name;
    let (network, netmask) = (t.subnet.network(), t.subnet.netmask());

    let commands = match action {
        Action::Create => {
            let mut c = vec![
                format!("ip vpn-instance {vpn}"),
                " ipv4-family".to_owned(),
                format!("  route-distinguisher {}", t.route_distinguisher),
                format!("  vpn-target {} export-extcommunity", t.route_target),
                format!("  vpn-target {} import-extcommunity", t.route_target),
                " quit".to_owned(),
                "quit".to_owned(),
                "segment-routing ipv6".to_owned(),
                format!(" locator {locator}"),
                format!("  opcode ::{} end-dt4 vpn-instance {vpn}", t.opcode),
                " quit".to_owned(),
                "quit".to_owned(),
                format!("bgp {asn}"),
                format!(" ipv4-family vpn-instance {vpn}"),
                "  segment-routing ipv6 best-effort".to_owned(),
                format!("  segment-routing ipv6 locator {locator}"),
            ];
            if t.role == NodeRole::Ingress {
                c.push(format!("  network {network} {netmask}"));
            } else {
                c.push("  import-route direct".to_owned());
            }
            c.extend([" quit".to_owned(), "quit".to_owned()]);
            c
        }
        Action::Delete => vec![
            format!("bgp {asn}"),
            format!(" undo ipv4-family vpn-instance {vpn}"),
            "quit".to_owned(),
            "segment-routing ipv6".to_owned(),
            format!(" locator {locator}"),
            format!("  undo opcode ::{}", t.opcode),
            " quit".to_owned(),
            "quit".to_owned(),
            format!("undo ip vpn-instance {vpn}"),
        ],
    };
    Ok(commands)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use secrecy::SecretString;
    use uuid::Uuid;

    use super::*;
    use crate::device::driver::VpnInstance;
    use crate::model::{ConnectionProfile, DeviceEndpoint, LifecycleState, WanNodePresets};

    fn node() -> WanNode {
        WanNode {
            id: Uuid::nil(),
            name: "ne-east".into(),
            vendor: Vendor::Huawei,
            connection: ConnectionProfile::Netconf(DeviceEndpoint {
                host: "192.0.2.1".into(),
                port: 830,
                username: "u".into(),
                password: SecretString::from("p"),
            }),
            presets: WanNodePresets {
                srv6_locator: Some("LOC1".into()),
                srv6_locator_arg: Some("ARG1".into()),
                vxlan_nve_interface: Some("Nve1".into()),
                vxlan_nve_address: Some("10.0.0.1".into()),
                vxlan_nve_peer_address: Some("10.0.0.2".into()),
                wan_vpn_bd_interface: Some("GE0/1/0.10".into()),
                access_vpn_bd_interface: Some("GE0/1/0.20".into()),
            },
            roles: BTreeSet::new(),
            as_number: Some(65001),
            state: LifecycleState::Active,
        }
    }

    fn splice() -> SpliceTemplate {
        SpliceTemplate {
            wan_vpn: VpnInstance {
                name: "ns-wan-l2vpn-s1".into(),
                route_distinguisher: "12345:1".into(),
                route_target: "54321:1".into(),
                bridge_domain: 100,
            },
            access_vpn: VpnInstance {
                name: "ns-an-l2vpn-s1".into(),
                route_distinguisher: "12345:2".into(),
                route_target: "54321:2".into(),
                bridge_domain: 101,
            },
            access_vni: 5001,
            splicing_vlan_id: 300,
        }
    }

    #[test]
    fn splice_create_carries_every_identifier() {
        let xml = render_splice_create(&node(), &splice()).unwrap();
        for needle in [
            "<evpnName>ns-wan-l2vpn-s1</evpnName>",
            "<evpnRD>12345:2</evpnRD>",
            "<srv6Locator>LOC1</srv6Locator>",
            "<bdId>100</bdId>",
            "<vlanId>300</vlanId>",
            "<vniId>5001</vniId>",
            "<peerAddr>10.0.0.2</peerAddr>",
        ] {
            assert!(xml.contains(needle), "missing {needle}");
        }
        assert_eq!(numbers_in(&xml, "bdId"), [100, 101].into_iter().collect());
    }

    #[test]
    fn splice_delete_removes_by_key() {
        let xml = render_splice_delete(&node(), &splice()).unwrap();
        assert_eq!(xml.matches(r#"nc:operation="remove""#).count(), 5);
        assert!(!xml.contains("12345:1"));
    }

    #[test]
    fn missing_preset_is_a_validation_error() {
        let mut n = node();
        n.presets.srv6_locator = None;
        let err = render_splice_create(&n, &splice()).unwrap_err();
        assert!(matches!(err, CoreError::Validation { ref message } if message.contains("srv6_locator")));
    }

    #[test]
    fn l3vpn_ingress_advertises_subnet() {
        let t = L3vpnTemplate {
            vpn_name: "dcictl-L3VPNSRv6-a".into(),
            route_distinguisher: "65001:7".into(),
            route_target: "100:1".into(),
            subnet: "10.1.0.0/24".parse().unwrap(),
            opcode: 321,
            role: NodeRole::Ingress,
        };
        let create = render_l3vpn(&node(), &t, Action::Create).unwrap();
        assert!(create.contains(&"  network 10.1.0.0 255.255.255.0".to_owned()));
        assert!(create.contains(&"  opcode ::321 end-dt4 vpn-instance dcictl-L3VPNSRv6-a".to_owned()));
        let delete = render_l3vpn(&node(), &t, Action::Delete).unwrap();
        assert_eq!(delete.last().unwrap(), "undo ip vpn-instance dcictl-L3VPNSRv6-a");
    }

    #[test]
    fn cli_table_ids() {
        let out = "BDID  State  MAC\n----\n100   up     learn\n2001  down   learn\n";
        assert_eq!(leading_numbers(out), [100, 2001].into_iter().collect());
    }
}
