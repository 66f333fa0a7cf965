//! Clap derive structures for the `dcictl` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. This file
//! is also compiled by `build.rs` for man page generation, so it may only
//! depend on clap and the standard library.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// dcictl -- provision cross-site DCI network slicings
#[derive(Debug, Parser)]
#[command(
    name = "dcictl",
    version,
    about = "Provision cross-site DCI network slicings from the command line",
    long_about = "Creates and tears down network slicings that stitch two data center \
        sites together: a virtual network on each site's SDN controller plus the \
        matching configuration on each site's WAN edge node.\n\n\
        Failed creates are rolled back step by step; failed deletes keep the \
        slicing INACTIVE so they can be re-run.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Deployment profile to use
    #[arg(long, short = 'p', env = "DCI_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "DCI_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// State file with inventory and slicing records (overrides profile)
    #[arg(long, env = "DCI_STATE_FILE", global = true)]
    pub state_file: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DCI_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one identifier per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect data center sites
    #[command(alias = "site")]
    Sites(SitesArgs),

    /// Inspect WAN edge nodes
    #[command(alias = "nodes", alias = "wn")]
    WanNodes(WanNodesArgs),

    /// Create, inspect and delete network slicings
    #[command(alias = "slicing", alias = "sl")]
    Slicings(SlicingsArgs),

    /// Load sites and WAN nodes into the state file
    #[command(alias = "inv")]
    Inventory(InventoryArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SITES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SitesArgs {
    #[command(subcommand)]
    pub command: SitesCommand,
}

#[derive(Debug, Subcommand)]
pub enum SitesCommand {
    /// List sites
    #[command(alias = "ls")]
    List,

    /// Show one site
    Show {
        /// Site name or UUID
        site: String,
    },

    /// Check that the site's SDN controller answers
    Ping {
        /// Site name or UUID
        site: String,

        /// Give up after this many seconds
        #[arg(long, default_value = "30")]
        timeout: u64,
    },

    /// Remove a site from the state file
    #[command(alias = "rm")]
    Remove {
        /// Site name or UUID
        site: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WAN NODES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WanNodesArgs {
    #[command(subcommand)]
    pub command: WanNodesCommand,
}

#[derive(Debug, Subcommand)]
pub enum WanNodesCommand {
    /// List WAN nodes
    #[command(alias = "ls")]
    List {
        /// Only nodes attached to this site (name or UUID)
        #[arg(long)]
        site: Option<String>,
    },

    /// Show one WAN node
    Show {
        /// Node name or UUID
        node: String,
    },

    /// Open a management session to the node and run a liveness probe
    Ping {
        /// Node name or UUID
        node: String,

        /// Give up after this many seconds
        #[arg(long, default_value = "30")]
        timeout: u64,
    },

    /// Remove a WAN node from the state file
    #[command(alias = "rm")]
    Remove {
        /// Node name or UUID
        node: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SLICINGS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SlicingsArgs {
    #[command(subcommand)]
    pub command: SlicingsCommand,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    /// EVPN VPLS over SRv6 BE spliced to an EVPN VXLAN access VPN
    #[value(name = "evpn-vpls-srv6-be")]
    EvpnVplsSrv6Be,
    /// Layer-2 EVPN data center interconnect
    #[value(name = "l2-evpn-dci")]
    L2EvpnDci,
    /// Layer-3 EVPN data center interconnect
    #[value(name = "l3-evpn-dci")]
    L3EvpnDci,
    /// L3VPN over SRv6
    #[value(name = "l3vpn-srv6")]
    L3vpnSrv6,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StateArg {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoutingTypeArg {
    /// Best effort
    Be,
    /// Traffic engineering
    Te,
}

#[derive(Debug, Subcommand)]
pub enum SlicingsCommand {
    /// List slicings
    #[command(alias = "ls")]
    List {
        /// Only slicings in this state
        #[arg(long, value_enum)]
        state: Option<StateArg>,

        /// Only slicings of this kind
        #[arg(long, value_enum)]
        kind: Option<KindArg>,

        /// Only slicings whose east leg is on this site (name or UUID)
        #[arg(long)]
        east: Option<String>,

        /// Only slicings whose west leg is on this site (name or UUID)
        #[arg(long)]
        west: Option<String>,
    },

    /// Show one slicing
    Show {
        /// Slicing name or UUID
        slicing: String,
    },

    /// Provision a slicing across two sites
    Create(CreateSlicingArgs),

    /// Tear down a slicing
    #[command(alias = "rm")]
    Delete {
        /// Slicing name or UUID
        slicing: String,
    },
}

#[derive(Debug, Args)]
pub struct CreateSlicingArgs {
    /// Slicing name
    #[arg(long, required_unless_present = "from_file")]
    pub name: Option<String>,

    /// Slicing kind
    #[arg(long, value_enum, required_unless_present = "from_file")]
    pub kind: Option<KindArg>,

    /// East site (name or UUID)
    #[arg(long, required_unless_present = "from_file")]
    pub east: Option<String>,

    /// West site (name or UUID)
    #[arg(long, required_unless_present = "from_file")]
    pub west: Option<String>,

    /// East subnet, e.g. 10.0.1.0/24
    #[arg(long, required_unless_present = "from_file")]
    pub east_subnet: Option<String>,

    /// West subnet, e.g. 10.0.2.0/24
    #[arg(long, required_unless_present = "from_file")]
    pub west_subnet: Option<String>,

    /// East allocation pool as "start,end"
    #[arg(long)]
    pub east_pool: Option<String>,

    /// West allocation pool as "start,end"
    #[arg(long)]
    pub west_pool: Option<String>,

    /// East WAN node (name or UUID; defaults to the site's first node)
    #[arg(long)]
    pub east_node: Option<String>,

    /// West WAN node (name or UUID; defaults to the site's first node)
    #[arg(long)]
    pub west_node: Option<String>,

    /// SRv6 routing type (l3vpn-srv6)
    #[arg(long, value_enum, default_value = "be")]
    pub routing_type: RoutingTypeArg,

    /// Route target "A:N" shared by both PEs (l3vpn-srv6)
    #[arg(long)]
    pub route_target: Option<String>,

    /// Read the whole request from a YAML or JSON file
    #[arg(long, short = 'F', conflicts_with_all = ["name", "kind", "east", "west"])]
    pub from_file: Option<PathBuf>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  INVENTORY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct InventoryArgs {
    #[command(subcommand)]
    pub command: InventoryCommand,
}

#[derive(Debug, Subcommand)]
pub enum InventoryCommand {
    /// Insert or replace sites and WAN nodes from a YAML or JSON file
    Import {
        /// Inventory file with `sites` and `wan_nodes` lists
        file: PathBuf,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key, e.g. "state_file" or "teardown_retries"
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the SDN controller password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
