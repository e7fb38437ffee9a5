//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

#![allow(clippy::derivable_impls)]

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::Error;
use crate::peer::{PEER_FIELDS, PeerConfig};
use crate::schema::{self, FieldKind, OptionDoc};

// Policy document, as written by the operator.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    pub peeringdb_query_timeout: u64,
    pub irr_query_timeout: u64,
    pub bird_directory: String,
    pub bird_binary: String,
    pub bird_socket: String,
    pub cache_directory: String,
    pub keepalived_config: String,
    pub web_ui_file: String,
    pub log_file: String,
    pub portal_host: String,
    pub portal_key: String,
    pub irr_server: String,
    pub bgpq_args: String,
    pub asn: u32,
    pub router_id: Option<String>,
    pub hostname: Option<String>,
    pub prefixes: Vec<String>,
    pub communities: Vec<String>,
    pub large_communities: Vec<String>,
    pub rtr_server: String,
    pub rpki_enable: bool,
    pub keep_filtered: bool,
    pub kernel_learn: bool,
    pub kernel_export: bool,
    pub kernel_table: Option<u32>,
    pub merge_paths: bool,
    pub source4: Option<String>,
    pub source6: Option<String>,
    pub default_route: bool,
    pub accept_default: bool,
    pub peers: BTreeMap<String, PeerConfig>,
    pub templates: BTreeMap<String, PeerConfig>,
    pub vrrp: BTreeMap<String, VrrpConfig>,
    pub bfd: BTreeMap<String, BfdConfig>,
    pub augments: AugmentsConfig,
    pub optimizer: OptimizerConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct AugmentsConfig {
    pub accept4: Vec<String>,
    pub accept6: Vec<String>,
    pub reject4: Vec<String>,
    pub reject6: Vec<String>,
    pub statics: BTreeMap<String, String>,
    pub srd_communities: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct OptimizerConfig {
    pub targets: Vec<String>,
    pub latency_threshold: u64,
    pub packet_loss_threshold: f64,
    pub modifier: u32,
    pub probe_count: u32,
    pub probe_timeout: u64,
    pub probe_interval: u64,
    pub cache_size: usize,
    pub probe_udp: bool,
    pub alert_script: Option<String>,
    pub exit_on_cache_full: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct BfdConfig {
    pub neighbor: Option<String>,
    pub interface: Option<String>,
    pub interval: u32,
    pub multiplier: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct VrrpConfig {
    pub state: String,
    pub interface: String,
    pub vrid: u8,
    pub priority: u8,
    pub vips: Vec<String>,
}

// Documentation of the global options.
#[rustfmt::skip]
pub static GLOBAL_OPTIONS: &[OptionDoc] = &[
    OptionDoc::new("peeringdb-query-timeout", FieldKind::Int, Some("10"), "PeeringDB query timeout in seconds"),
    OptionDoc::new("irr-query-timeout", FieldKind::Int, Some("30"), "IRR query timeout in seconds"),
    OptionDoc::new("bird-directory", FieldKind::Str, Some("/etc/bird/"), "Directory to store BIRD configs"),
    OptionDoc::new("bird-binary", FieldKind::Str, Some("/usr/sbin/bird"), "Path to BIRD binary"),
    OptionDoc::new("bird-socket", FieldKind::Str, Some("/run/bird/bird.ctl"), "UNIX control socket for BIRD"),
    OptionDoc::new("cache-directory", FieldKind::Str, Some("/var/run/routegen/cache/"), "Directory to store runtime configuration cache"),
    OptionDoc::new("keepalived-config", FieldKind::Str, Some("/etc/keepalived.conf"), "Configuration file for keepalived"),
    OptionDoc::new("web-ui-file", FieldKind::Str, None, "File to write web UI to (disabled if empty)"),
    OptionDoc::new("log-file", FieldKind::Str, Some("syslog"), "Log file location"),
    OptionDoc::new("portal-host", FieldKind::Str, None, "Peering portal host (disabled if empty)"),
    OptionDoc::new("portal-key", FieldKind::Str, None, "Peering portal API key"),
    OptionDoc::new("hostname", FieldKind::Str, None, "Router hostname (default system hostname)"),
    OptionDoc::new("asn", FieldKind::Int, None, "Autonomous System Number (required)"),
    OptionDoc::new("prefixes", FieldKind::List, None, "List of prefixes to announce"),
    OptionDoc::new("communities", FieldKind::List, None, "List of RFC1997 BGP communities"),
    OptionDoc::new("large-communities", FieldKind::List, None, "List of RFC8092 large BGP communities"),
    OptionDoc::new("router-id", FieldKind::Str, None, "Router ID in dotted quad notation (required)"),
    OptionDoc::new("irr-server", FieldKind::Str, Some("rr.ntt.net"), "Internet routing registry server"),
    OptionDoc::new("rtr-server", FieldKind::Str, Some("rtr.rpki.cloudflare.com:8282"), "RPKI-to-router server"),
    OptionDoc::new("bgpq-args", FieldKind::Str, None, "Additional command line arguments to pass to bgpq4"),
    OptionDoc::new("keep-filtered", FieldKind::Bool, Some("false"), "Should filtered routes be kept in memory?"),
    OptionDoc::new("kernel-learn", FieldKind::Bool, Some("false"), "Should routes from the kernel be learned into BIRD?"),
    OptionDoc::new("kernel-export", FieldKind::Bool, Some("true"), "Export routes to kernel routing table"),
    OptionDoc::new("merge-paths", FieldKind::Bool, Some("false"), "Should best and equivalent non-best routes be imported to build ECMP routes?"),
    OptionDoc::new("source4", FieldKind::Str, None, "Source IPv4 address"),
    OptionDoc::new("source6", FieldKind::Str, None, "Source IPv6 address"),
    OptionDoc::new("default-route", FieldKind::Bool, Some("true"), "Add a default route"),
    OptionDoc::new("accept-default", FieldKind::Bool, Some("false"), "Should default routes be added to the bogon list?"),
    OptionDoc::new("kernel-table", FieldKind::Int, None, "Kernel table"),
    OptionDoc::new("rpki-enable", FieldKind::Bool, Some("true"), "Enable RPKI RTR session"),
    OptionDoc::new("peers", FieldKind::Map, None, "BGP peer configuration"),
    OptionDoc::new("templates", FieldKind::Map, None, "BGP peer templates"),
    OptionDoc::new("vrrp", FieldKind::Map, None, "VRRP instances"),
    OptionDoc::new("bfd", FieldKind::Map, None, "BFD instances"),
    OptionDoc::new("augments", FieldKind::Map, None, "Custom configuration options"),
    OptionDoc::new("optimizer", FieldKind::Map, None, "Route optimizer options"),
];

#[rustfmt::skip]
pub static AUGMENTS_OPTIONS: &[OptionDoc] = &[
    OptionDoc::new("accept4", FieldKind::List, None, "List of BIRD protocols to import into the IPv4 table"),
    OptionDoc::new("accept6", FieldKind::List, None, "List of BIRD protocols to import into the IPv6 table"),
    OptionDoc::new("reject4", FieldKind::List, None, "List of BIRD protocols to not import into the IPv4 table"),
    OptionDoc::new("reject6", FieldKind::List, None, "List of BIRD protocols to not import into the IPv6 table"),
    OptionDoc::new("statics", FieldKind::Map, None, "Static routes to include in BIRD (prefix to next hop)"),
    OptionDoc::new("srd-communities", FieldKind::List, None, "Communities that select the routes exported to the kernel (all other prefixes are not exported if not empty)"),
];

#[rustfmt::skip]
pub static OPTIMIZER_OPTIONS: &[OptionDoc] = &[
    OptionDoc::new("targets", FieldKind::List, None, "List of probe targets"),
    OptionDoc::new("latency-threshold", FieldKind::Int, Some("100"), "Maximum allowable latency in milliseconds"),
    OptionDoc::new("packet-loss-threshold", FieldKind::Float, Some("0.5"), "Maximum allowable packet loss (fraction)"),
    OptionDoc::new("modifier", FieldKind::Int, Some("20"), "Amount to lower local pref by for depreferred peers"),
    OptionDoc::new("probe-count", FieldKind::Int, Some("5"), "Number of pings to send in each run (1-1000)"),
    OptionDoc::new("probe-timeout", FieldKind::Int, Some("1"), "Number of seconds to wait before considering the ICMP message unanswered"),
    OptionDoc::new("probe-interval", FieldKind::Int, Some("120"), "Number of seconds to wait between each optimizer run"),
    OptionDoc::new("cache-size", FieldKind::Int, Some("15"), "Number of probe results to store per target"),
    OptionDoc::new("probe-udp", FieldKind::Bool, Some("false"), "Use unprivileged ICMP datagram sockets"),
    OptionDoc::new("alert-script", FieldKind::Str, None, "Script to call on optimizer event"),
    OptionDoc::new("exit-on-cache-full", FieldKind::Bool, Some("false"), "Exit optimizer on cache full"),
];

#[rustfmt::skip]
pub static VRRP_OPTIONS: &[OptionDoc] = &[
    OptionDoc::new("state", FieldKind::Str, None, "VRRP instance state ('primary' or 'backup', required)"),
    OptionDoc::new("interface", FieldKind::Str, None, "Interface to send VRRP packets on (required)"),
    OptionDoc::new("vrid", FieldKind::Int, None, "RFC3768 VRRP Virtual Router ID (1-255, required)"),
    OptionDoc::new("priority", FieldKind::Int, None, "RFC3768 VRRP Priority (required)"),
    OptionDoc::new("vips", FieldKind::List, None, "List of virtual IPs (required)"),
];

#[rustfmt::skip]
pub static BFD_OPTIONS: &[OptionDoc] = &[
    OptionDoc::new("neighbor", FieldKind::Str, None, "Neighbor IP address (required)"),
    OptionDoc::new("interface", FieldKind::Str, None, "Interface (pattern accepted)"),
    OptionDoc::new("interval", FieldKind::Int, Some("200"), "RX and TX interval"),
    OptionDoc::new("multiplier", FieldKind::Int, Some("10"), "Number of missed packets for the state to be declared down"),
];

// ===== impl Config =====

impl Config {
    // Parses a policy document.
    //
    // Unknown keys and values of the wrong kind are rejected.
    pub fn from_yaml(document: &str) -> Result<Config, Error> {
        serde_yaml::from_str(document).map_err(Error::Parse)
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            peeringdb_query_timeout: 10,
            irr_query_timeout: 30,
            bird_directory: "/etc/bird/".to_owned(),
            bird_binary: "/usr/sbin/bird".to_owned(),
            bird_socket: "/run/bird/bird.ctl".to_owned(),
            cache_directory: "/var/run/routegen/cache/".to_owned(),
            keepalived_config: "/etc/keepalived.conf".to_owned(),
            web_ui_file: String::new(),
            log_file: "syslog".to_owned(),
            portal_host: String::new(),
            portal_key: String::new(),
            irr_server: "rr.ntt.net".to_owned(),
            bgpq_args: String::new(),
            asn: 0,
            router_id: None,
            hostname: None,
            prefixes: Default::default(),
            communities: Default::default(),
            large_communities: Default::default(),
            rtr_server: "rtr.rpki.cloudflare.com:8282".to_owned(),
            rpki_enable: true,
            keep_filtered: false,
            kernel_learn: false,
            kernel_export: true,
            kernel_table: None,
            merge_paths: false,
            source4: None,
            source6: None,
            default_route: true,
            accept_default: false,
            peers: Default::default(),
            templates: Default::default(),
            vrrp: Default::default(),
            bfd: Default::default(),
            augments: Default::default(),
            optimizer: Default::default(),
        }
    }
}

// ===== global functions =====

// Renders the reference of every section of the policy document.
pub fn document() -> String {
    [
        schema::document("Global options", GLOBAL_OPTIONS.iter().copied()),
        schema::document(
            "Peer options",
            PEER_FIELDS.iter().map(|field| field.doc()),
        ),
        schema::document("Augments", AUGMENTS_OPTIONS.iter().copied()),
        schema::document("Optimizer", OPTIMIZER_OPTIONS.iter().copied()),
        schema::document("VRRP instance", VRRP_OPTIONS.iter().copied()),
        schema::document("BFD instance", BFD_OPTIONS.iter().copied()),
    ]
    .join("\n")
}

// ===== impl OptimizerConfig =====

impl Default for OptimizerConfig {
    fn default() -> OptimizerConfig {
        OptimizerConfig {
            targets: Default::default(),
            latency_threshold: 100,
            packet_loss_threshold: 0.5,
            modifier: 20,
            probe_count: 5,
            probe_timeout: 1,
            probe_interval: 120,
            cache_size: 15,
            probe_udp: false,
            alert_script: None,
            exit_on_cache_full: false,
        }
    }
}

// ===== impl BfdConfig =====

impl Default for BfdConfig {
    fn default() -> BfdConfig {
        BfdConfig {
            neighbor: None,
            interface: None,
            interval: 200,
            multiplier: 10,
        }
    }
}

// ===== unit tests =====
