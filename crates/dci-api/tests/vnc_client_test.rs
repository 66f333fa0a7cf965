#![allow(clippy::unwrap_used)]
// Integration tests for `VncClient` using wiremock.

use serde_json::json;
use url::Url;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dci_api::vnc::{ForwardingMode, VirtualNetworkSpec};
use dci_api::{Error, VncAuth, VncClient};

// ── Helpers ─────────────────────────────────────────────────────────

const VN_ID: &str = "6f1c2b7e-3a4d-4c55-9e1f-0a2b3c4d5e6f";
const IPAM_ID: &str = "11111111-2222-3333-4444-555555555555";

async fn setup() -> (MockServer, VncClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = VncClient::with_client(reqwest::Client::new(), base_url, "admin", VncAuth::None);
    (server, client)
}

async fn mount_fqname(server: &MockServer, kind: &str, name: &str, uuid: Option<&str>) {
    let fq_name = json!(["default-domain", "admin", name]);
    let response = match uuid {
        Some(id) => ResponseTemplate::new(200).set_body_json(json!({ "uuid": id })),
        None => ResponseTemplate::new(404).set_body_string("Name not found"),
    };
    Mock::given(method("POST"))
        .and(path("/fqname-to-id"))
        .and(body_partial_json(json!({ "type": kind, "fq_name": fq_name })))
        .respond_with(response)
        .mount(server)
        .await;
}

fn spec() -> VirtualNetworkSpec {
    VirtualNetworkSpec {
        name: "ns-dcn-l2vpn-blue".into(),
        subnet_cidr: "10.20.0.0/24".into(),
        allocation_pool: Some("10.20.0.10,10.20.0.50".into()),
        route_target: Some("target:54321:77".into()),
        forwarding_mode: ForwardingMode::L2,
    }
}

// ── Create ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_create_virtual_network_payload() {
    let (server, client) = setup().await;
    mount_fqname(&server, "network-ipam", "dci-controller-default-ipam", Some(IPAM_ID)).await;

    Mock::given(method("POST"))
        .and(path("/virtual-networks"))
        .and(body_partial_json(json!({
            "virtual-network": {
                "fq_name": ["default-domain", "admin", "ns-dcn-l2vpn-blue"],
                "parent_type": "project",
                "virtual_network_properties": { "forwarding_mode": "l2" },
                "route_target_list": { "route_target": ["target:54321:77"] },
                "address_allocation_mode": "user-defined-subnet-only",
                "network_ipam_refs": [{
                    "to": ["default-domain", "admin", "dci-controller-default-ipam"],
                    "attr": { "ipam_subnets": [{
                        "subnet": { "ip_prefix": "10.20.0.0", "ip_prefix_len": 24 },
                        "allocation_pools": [{
                            "start": "10.20.0.10",
                            "end": "10.20.0.50",
                            "vrouter_specific_pool": true
                        }]
                    }]}
                }]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "virtual-network": {
                "uuid": VN_ID,
                "fq_name": ["default-domain", "admin", "ns-dcn-l2vpn-blue"]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = client.create_virtual_network(&spec()).await.unwrap();
    assert_eq!(id, Uuid::parse_str(VN_ID).unwrap());
}

#[tokio::test]
async fn test_default_ipam_created_when_missing() {
    let (server, client) = setup().await;
    mount_fqname(&server, "network-ipam", "dci-controller-default-ipam", None).await;

    Mock::given(method("POST"))
        .and(path("/network-ipams"))
        .and(body_partial_json(json!({
            "network-ipam": {
                "fq_name": ["default-domain", "admin", "dci-controller-default-ipam"],
                "ipam_subnet_method": "user-defined-subnet",
                "network_ipam_mgmt": { "ipam_method": "dhcp" }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "network-ipam": { "uuid": IPAM_ID, "fq_name": ["default-domain", "admin", "dci-controller-default-ipam"] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fq = client.ensure_default_ipam().await.unwrap();
    assert_eq!(fq.last().unwrap(), "dci-controller-default-ipam");
}

// ── Read ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_virtual_network_vni() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(format!("/virtual-network/{VN_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "virtual-network": {
                "uuid": VN_ID,
                "fq_name": ["default-domain", "admin", "ns-dcn-l2vpn-blue"],
                "virtual_network_network_id": 5
            }
        })))
        .mount(&server)
        .await;

    let vni = client
        .virtual_network_vni(Uuid::parse_str(VN_ID).unwrap())
        .await
        .unwrap();
    assert_eq!(vni, 5);
}

#[tokio::test]
async fn test_get_missing_network_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path(format!("/virtual-network/{VN_ID}")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client
        .get_virtual_network(Uuid::parse_str(VN_ID).unwrap())
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "expected not found, got: {err:?}");
}

// ── Delete ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_resolves_fq_name() {
    let (server, client) = setup().await;
    mount_fqname(&server, "virtual-network", "ns-dcn-l2vpn-blue", Some(VN_ID)).await;

    Mock::given(method("DELETE"))
        .and(path(format!("/virtual-network/{VN_ID}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.delete_virtual_network("ns-dcn-l2vpn-blue").await.unwrap());
}

#[tokio::test]
async fn test_delete_absent_network_succeeds() {
    let (server, client) = setup().await;
    mount_fqname(&server, "virtual-network", "ns-dcn-l2vpn-gone", None).await;

    assert!(!client.delete_virtual_network("ns-dcn-l2vpn-gone").await.unwrap());
}

#[tokio::test]
async fn test_delete_with_refs_is_refs_exist() {
    let (server, client) = setup().await;
    mount_fqname(&server, "virtual-network", "ns-dcn-l2vpn-blue", Some(VN_ID)).await;

    Mock::given(method("DELETE"))
        .and(path(format!("/virtual-network/{VN_ID}")))
        .respond_with(ResponseTemplate::new(409).set_body_string("Back-References from ..."))
        .mount(&server)
        .await;

    let result = client.delete_virtual_network("ns-dcn-l2vpn-blue").await;
    assert!(
        matches!(result, Err(Error::RefsExist { .. })),
        "expected RefsExist, got: {result:?}"
    );
}

// ── Auth ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_token_auth_header_and_401() {
    let server = MockServer::start().await;
    let client = VncClient::new(
        Url::parse(&server.uri()).unwrap(),
        "admin",
        VncAuth::Token(secrecy::SecretString::from("tok-123".to_owned())),
        &dci_api::TransportConfig::default(),
    )
    .unwrap();

    Mock::given(method("POST"))
        .and(path("/fqname-to-id"))
        .and(header("X-Auth-Token", "tok-123"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.project_uuid().await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}
