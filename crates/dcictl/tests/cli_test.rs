//! Integration tests for the `dcictl` binary.
//!
//! Argument parsing, help output, completions, and the offline commands,
//! run against a temporary config and state file.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

const EAST_SITE: &str = "1f0c1bde-55e4-4c5e-a7a4-0d1a1c7c0a02";
const EAST_NODE: &str = "7b0c1bde-55e4-4c5e-a7a4-0d1a1c7c0a01";
const WEST_SITE: &str = "1f0c1bde-55e4-4c5e-a7a4-0d1a1c7c0a04";

// ── Helpers ─────────────────────────────────────────────────────────

/// A scratch directory holding the config and state files.
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    fn state(&self) -> PathBuf {
        self.dir.path().join("state.json")
    }

    /// `dcictl` with env isolation, pointed at this sandbox.
    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("dcictl");
        cmd.env("HOME", self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path())
            .env("XDG_DATA_HOME", self.dir.path())
            .env("DCI_CONFIG", self.config())
            .env("DCI_STATE_FILE", self.state())
            .env_remove("DCI_PROFILE")
            .env_remove("DCI_OUTPUT")
            .env_remove("RUST_LOG");
        cmd
    }

    fn write(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    /// Import two sites with one Huawei node each.
    fn seed(&self, east_port: u16) {
        let inventory = self.write("inventory.yaml", &inventory_yaml(east_port));
        self.cmd()
            .args(["inventory", "import"])
            .arg(&inventory)
            .assert()
            .success()
            .stderr(predicate::str::contains("4 added"));
    }
}

fn inventory_yaml(east_port: u16) -> String {
    format!(
        r"
wan_nodes:
  - id: {EAST_NODE}
    name: east-pe
    vendor: huawei
    connection:
      mode: netconf
      host: 127.0.0.1
      port: {east_port}
      username: admin
      password: secret
    as_number: 65001
  - id: 7b0c1bde-55e4-4c5e-a7a4-0d1a1c7c0a03
    name: west-pe
    vendor: huawei
    connection:
      mode: netconf
      host: 127.0.0.1
      port: {east_port}
      username: admin
      password: secret
sites:
  - id: {EAST_SITE}
    name: dc-east
    sdn:
      host: 127.0.0.1
      project: admin
    wan_nodes: [{EAST_NODE}]
  - id: {WEST_SITE}
    name: dc-west
    sdn:
      host: 127.0.0.1
      project: admin
    wan_nodes: [7b0c1bde-55e4-4c5e-a7a4-0d1a1c7c0a03]
"
    )
}

/// A local port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn state_json(path: &Path) -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let sb = Sandbox::new();
    let output = sb.cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_commands() {
    Sandbox::new().cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("slicings")
            .and(predicate::str::contains("sites"))
            .and(predicate::str::contains("wan-nodes"))
            .and(predicate::str::contains("inventory")),
    );
}

#[test]
fn test_version_flag() {
    Sandbox::new()
        .cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dcictl"));
}

#[test]
fn test_completions() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
    sb.cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_invalid_subcommand() {
    let output = Sandbox::new().cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("foobar"));
}

#[test]
fn test_invalid_kind_filter() {
    let output = Sandbox::new()
        .cmd()
        .args(["slicings", "list", "--kind", "l4-dci"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("possible values"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_without_file() {
    Sandbox::new()
        .cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"));
}

#[test]
fn test_config_set_then_profiles() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["--profile", "lab", "config", "set", "teardown-retries", "5"])
        .assert()
        .success();
    sb.cmd()
        .args(["config", "use", "lab"])
        .assert()
        .success();
    sb.cmd()
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lab *"));

    let written = std::fs::read_to_string(sb.config()).unwrap();
    assert!(written.contains("teardown_retries = 5"));
}

#[test]
fn test_config_set_rejects_zero_retries() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["config", "set", "teardown_retries", "0"])
        .assert()
        .code(2);
}

#[test]
fn test_unknown_profile_fails() {
    Sandbox::new()
        .cmd()
        .args(["--profile", "prod", "sites", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("prod"));
}

// ── Inventory & reads ───────────────────────────────────────────────

#[test]
fn test_empty_state_lists_nothing() {
    Sandbox::new()
        .cmd()
        .args(["-o", "json", "slicings", "list"])
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));
}

#[test]
fn test_import_then_list_and_show() {
    let sb = Sandbox::new();
    sb.seed(830);

    let state = state_json(&sb.state());
    assert_eq!(state["sites"].as_array().unwrap().len(), 2);
    assert_eq!(state["wan_nodes"][0]["connection"]["password"], "secret");

    sb.cmd()
        .args(["-o", "plain", "sites", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(EAST_SITE));

    sb.cmd()
        .args(["sites", "show", "dc-east"])
        .assert()
        .success()
        .stdout(predicate::str::contains("east-pe").and(predicate::str::contains("http://127.0.0.1:8082")));

    sb.cmd()
        .args(["-o", "json", "wan-nodes", "list", "--site", "dc-east"])
        .assert()
        .success()
        .stdout(predicate::str::contains("east-pe").and(predicate::str::contains("west-pe").not()));

    // Re-importing replaces rather than duplicates.
    let inventory = sb.write("again.yaml", &inventory_yaml(830));
    sb.cmd()
        .args(["inventory", "import"])
        .arg(&inventory)
        .assert()
        .success()
        .stderr(predicate::str::contains("0 added, 4 replaced"));
}

#[test]
fn test_import_rejects_dangling_node() {
    let sb = Sandbox::new();
    let inventory = sb.write(
        "bad.yaml",
        r"
sites:
  - id: 1f0c1bde-55e4-4c5e-a7a4-0d1a1c7c0a09
    name: lonely
    sdn: { host: 127.0.0.1, project: admin }
    wan_nodes: [7b0c1bde-55e4-4c5e-a7a4-0d1a1c7c0aff]
",
    );
    sb.cmd()
        .args(["inventory", "import"])
        .arg(&inventory)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown WAN node"));
    assert!(!sb.state().exists());
}

#[test]
fn test_show_missing_slicing_is_not_found() {
    Sandbox::new()
        .cmd()
        .args(["slicings", "show", "nope"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("slicings list"));
}

#[test]
fn test_site_remove_requires_yes_when_not_interactive() {
    let sb = Sandbox::new();
    sb.seed(830);
    sb.cmd()
        .args(["sites", "remove", "dc-west"])
        .write_stdin("")
        .assert()
        .code(2);
    sb.cmd()
        .args(["--yes", "sites", "remove", "dc-west"])
        .assert()
        .success();
    sb.cmd()
        .args(["-o", "plain", "sites", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(EAST_SITE).and(predicate::str::contains(WEST_SITE).not()));
}

// ── Create validation (no remote calls) ─────────────────────────────

#[test]
fn test_create_same_site_is_rejected() {
    let sb = Sandbox::new();
    sb.seed(830);
    sb.cmd()
        .args([
            "slicings", "create", "--name", "blue", "--kind", "evpn-vpls-srv6-be",
            "--east", "dc-east", "--west", "dc-east",
            "--east-subnet", "10.0.1.0/24", "--west-subnet", "10.0.2.0/24",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("same site"));
}

#[test]
fn test_create_l3vpn_needs_route_target() {
    let sb = Sandbox::new();
    sb.seed(830);
    sb.cmd()
        .args([
            "slicings", "create", "--name", "red", "--kind", "l3vpn-srv6",
            "--east", "dc-east", "--west", "dc-west",
            "--east-subnet", "10.0.1.0/24", "--west-subnet", "10.0.2.0/24",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("route-target"));
}

#[test]
fn test_create_unknown_site_is_not_found() {
    let sb = Sandbox::new();
    sb.seed(830);
    let request = sb.write(
        "blue.yaml",
        r"
east_site: dc-north
west_site: dc-west
name: blue
kind: l2-evpn-dci
east: { subnet_cidr: 10.0.1.0/24 }
west: { subnet_cidr: 10.0.2.0/24 }
",
    );
    sb.cmd()
        .args(["slicings", "create", "--from-file"])
        .arg(&request)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("dc-north"));
}

// ── Remote reachability ─────────────────────────────────────────────

#[test]
fn test_ping_unreachable_node_is_connection_error() {
    let sb = Sandbox::new();
    sb.seed(closed_port());
    sb.cmd()
        .args(["wan-nodes", "ping", "east-pe", "--timeout", "20"])
        .assert()
        .code(7);
}
