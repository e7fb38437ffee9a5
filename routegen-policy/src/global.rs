//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use routegen_utils::community::CommunitySet;
use routegen_utils::ip::{self, AddressFamilies};
use serde::Serialize;

use crate::config::{
    AugmentsConfig, BfdConfig, Config, OptimizerConfig, VrrpConfig,
};
use crate::error::{Error, Scope};
use crate::peer;

// Process-wide policy shared by every peer.
#[derive(Clone, Debug, PartialEq)]
#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Global {
    pub asn: u32,
    pub router_id: Ipv4Addr,
    pub hostname: String,
    pub prefixes: AddressFamilies<Vec<String>>,
    pub communities: CommunitySet,
    pub rtr_server: Option<Endpoint>,
    pub irr: Irr,
    pub peeringdb_query_timeout: Duration,
    pub bird: Bird,
    pub cache_directory: String,
    pub keepalived_config: String,
    // Disabled when unset.
    pub web_ui_file: Option<String>,
    pub log_file: String,
    pub portal: Option<Portal>,
    pub rpki_enable: bool,
    pub keep_filtered: bool,
    pub kernel: Kernel,
    pub merge_paths: bool,
    pub source4: Option<Ipv4Addr>,
    pub source6: Option<Ipv6Addr>,
    pub default_route: bool,
    pub accept_default: bool,
    pub augments: Augments,
    pub optimizer: OptimizerSettings,
    pub bfd: BTreeMap<String, BfdInstance>,
    pub vrrp: BTreeMap<String, VrrpInstance>,
    // Whether any peer filters ASNs that are never reachable via route
    // servers, which requires querying that list beforehand.
    pub query_nvrs: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Serialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

// Internet routing registry queries.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Irr {
    pub server: String,
    pub query_timeout: Duration,
    // Extra arguments for the prefix-list generator.
    pub bgpq_args: String,
}

// Routing daemon installation.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Serialize)]
pub struct Bird {
    pub directory: String,
    pub binary: String,
    pub socket: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Serialize)]
pub struct Portal {
    pub host: String,
    pub key: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Serialize)]
pub struct Kernel {
    pub learn: bool,
    pub export: bool,
    pub table: Option<u32>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Augments {
    pub accept4: Vec<String>,
    pub accept6: Vec<String>,
    pub reject4: Vec<String>,
    pub reject6: Vec<String>,
    // Static routes (prefix to next hop) per destination address family.
    pub statics: AddressFamilies<BTreeMap<String, IpAddr>>,
    pub srd_communities: CommunitySet,
}

// Validated route optimizer settings.
#[derive(Clone, Debug, PartialEq)]
#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct OptimizerSettings {
    pub targets: Vec<IpAddr>,
    pub latency_threshold: Duration,
    pub packet_loss_threshold: f64,
    pub modifier: u32,
    pub probe_count: u32,
    pub probe_timeout: Duration,
    pub probe_interval: Duration,
    pub cache_size: usize,
    pub probe_udp: bool,
    pub alert_script: Option<String>,
    pub exit_on_cache_full: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BfdInstance {
    pub protocol_name: String,
    pub neighbor: IpAddr,
    pub interface: Option<String>,
    pub interval: u32,
    pub multiplier: u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct VrrpInstance {
    pub state: VrrpState,
    pub interface: String,
    pub vrid: u8,
    pub priority: u8,
    pub vips: AddressFamilies<Vec<String>>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VrrpState {
    Master,
    Backup,
}

// ===== impl Endpoint =====

impl Endpoint {
    // Parses a `host:port` string.
    pub fn parse(value: &str) -> Option<Endpoint> {
        let (host, port) = value.split_once(':')?;
        if port.contains(':') {
            return None;
        }
        let port = port.parse().ok()?;
        Some(Endpoint {
            host: host.to_owned(),
            port,
        })
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ===== impl OptimizerSettings =====

impl OptimizerSettings {
    // Upper bound of echo attempts per probe. Keeps sequence numbers unique
    // within a probe.
    pub const MAX_PROBE_COUNT: u32 = 1000;

    fn resolve(config: &OptimizerConfig) -> Result<OptimizerSettings, Error> {
        let invalid = |field, value: String| Error::InvalidValue {
            scope: Scope::Global,
            field,
            value,
        };

        let targets = config
            .targets
            .iter()
            .map(|target| {
                target.parse::<IpAddr>().map_err(|_| Error::InvalidAddress {
                    scope: Scope::Global,
                    field: "optimizer.targets",
                    value: target.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if !(0.0..=1.0).contains(&config.packet_loss_threshold) {
            return Err(invalid(
                "optimizer.packet-loss-threshold",
                config.packet_loss_threshold.to_string(),
            ));
        }
        if config.probe_count == 0
            || config.probe_count > OptimizerSettings::MAX_PROBE_COUNT
        {
            return Err(invalid(
                "optimizer.probe-count",
                config.probe_count.to_string(),
            ));
        }
        if config.cache_size == 0 {
            return Err(invalid("optimizer.cache-size", "0".to_owned()));
        }
        if config.probe_interval == 0 {
            return Err(invalid("optimizer.probe-interval", "0".to_owned()));
        }

        Ok(OptimizerSettings {
            targets,
            latency_threshold: Duration::from_millis(config.latency_threshold),
            packet_loss_threshold: config.packet_loss_threshold,
            modifier: config.modifier,
            probe_count: config.probe_count,
            probe_timeout: Duration::from_secs(config.probe_timeout),
            probe_interval: Duration::from_secs(config.probe_interval),
            cache_size: config.cache_size,
            probe_udp: config.probe_udp,
            alert_script: config.alert_script.clone(),
            exit_on_cache_full: config.exit_on_cache_full,
        })
    }
}

// ===== impl Augments =====

impl Augments {
    fn resolve(config: &AugmentsConfig) -> Result<Augments, Error> {
        let statics = ip::partition_by(config.statics.iter(), |(prefix, _)| {
            prefix.as_str()
        })
        .map_err(|error| Error::InvalidAddress {
            scope: Scope::Global,
            field: "augments.statics",
            value: error.0,
        })?;
        let next_hops = |routes: Vec<(&String, &String)>| {
            routes
                .into_iter()
                .map(|(prefix, nexthop)| {
                    let nexthop = nexthop.parse::<IpAddr>().map_err(|_| {
                        Error::InvalidAddress {
                            scope: Scope::Global,
                            field: "augments.statics",
                            value: nexthop.clone(),
                        }
                    })?;
                    Ok::<_, Error>((prefix.clone(), nexthop))
                })
                .collect::<Result<BTreeMap<_, _>, Error>>()
        };

        let srd_communities = classify(
            Scope::Global,
            "augments.srd-communities",
            &config.srd_communities,
        )?;

        Ok(Augments {
            accept4: config.accept4.clone(),
            accept6: config.accept6.clone(),
            reject4: config.reject4.clone(),
            reject6: config.reject6.clone(),
            statics: AddressFamilies {
                ipv4: next_hops(statics.ipv4)?,
                ipv6: next_hops(statics.ipv6)?,
            },
            srd_communities,
        })
    }
}

// ===== impl BfdInstance =====

impl BfdInstance {
    fn resolve(name: &str, config: &BfdConfig) -> Result<BfdInstance, Error> {
        let scope = || Scope::Bfd(name.to_owned());
        let neighbor = config.neighbor.as_ref().ok_or(Error::MissingField {
            scope: scope(),
            field: "neighbor",
        })?;
        let neighbor =
            neighbor
                .parse::<IpAddr>()
                .map_err(|_| Error::InvalidAddress {
                    scope: scope(),
                    field: "neighbor",
                    value: neighbor.clone(),
                })?;

        Ok(BfdInstance {
            protocol_name: peer::sanitize(name),
            neighbor,
            interface: config.interface.clone(),
            interval: config.interval,
            multiplier: config.multiplier,
        })
    }
}

// ===== impl VrrpInstance =====

impl VrrpInstance {
    fn resolve(name: &str, config: &VrrpConfig) -> Result<VrrpInstance, Error> {
        let scope = || Scope::Vrrp(name.to_owned());
        let state = match config.state.as_str() {
            "primary" => VrrpState::Master,
            "backup" => VrrpState::Backup,
            _ => {
                return Err(Error::InvalidValue {
                    scope: scope(),
                    field: "state",
                    value: config.state.clone(),
                });
            }
        };
        if config.vrid == 0 {
            return Err(Error::InvalidValue {
                scope: scope(),
                field: "vrid",
                value: config.vrid.to_string(),
            });
        }
        if config.vips.is_empty() {
            return Err(Error::MissingField {
                scope: scope(),
                field: "vips",
            });
        }
        let vips = ip::partition(&config.vips).map_err(|error| {
            Error::InvalidAddress {
                scope: scope(),
                field: "vips",
                value: error.0,
            }
        })?;

        Ok(VrrpInstance {
            state,
            interface: config.interface.clone(),
            vrid: config.vrid,
            priority: config.priority,
            vips,
        })
    }
}

// ===== global functions =====

// Classifies a community list, reporting the first invalid token.
pub(crate) fn classify(
    scope: Scope,
    field: &'static str,
    tokens: &[String],
) -> Result<CommunitySet, Error> {
    CommunitySet::classify(tokens).map_err(|error| Error::InvalidCommunity {
        scope,
        field,
        token: error.0,
    })
}

// Resolves the global part of the policy document.
//
// `query_nvrs` is left unset since it depends on the resolved peers.
pub(crate) fn resolve(config: &Config) -> Result<Global, Error> {
    let missing = |field| Error::MissingField {
        scope: Scope::Global,
        field,
    };
    let invalid_address = |field, value: &String| Error::InvalidAddress {
        scope: Scope::Global,
        field,
        value: value.clone(),
    };

    // Required fields.
    if config.asn == 0 {
        return Err(missing("asn"));
    }
    let router_id = config.router_id.as_ref().ok_or(missing("router-id"))?;
    let router_id = router_id
        .parse::<Ipv4Addr>()
        .map_err(|_| invalid_address("router-id", router_id))?;

    let hostname = match &config.hostname {
        Some(hostname) if !hostname.is_empty() => hostname.clone(),
        _ => nix::unistd::gethostname()
            .map_err(Error::Hostname)?
            .to_string_lossy()
            .into_owned(),
    };

    // Originated prefixes.
    let prefixes = ip::partition(&config.prefixes).map_err(|error| {
        Error::InvalidAddress {
            scope: Scope::Global,
            field: "prefixes",
            value: error.0,
        }
    })?;

    // Global communities.
    let mut communities =
        classify(Scope::Global, "communities", &config.communities)?;
    communities.extend(classify(
        Scope::Global,
        "large-communities",
        &config.large_communities,
    )?);

    // Upstream validation-data feed.
    let rtr_server = match config.rtr_server.as_str() {
        "" => None,
        value => Some(Endpoint::parse(value).ok_or_else(|| {
            Error::InvalidEndpoint {
                field: "rtr-server",
                value: value.to_owned(),
            }
        })?),
    };

    // External query timeouts.
    for (field, value) in [
        ("peeringdb-query-timeout", config.peeringdb_query_timeout),
        ("irr-query-timeout", config.irr_query_timeout),
    ] {
        if value == 0 {
            return Err(Error::InvalidValue {
                scope: Scope::Global,
                field,
                value: value.to_string(),
            });
        }
    }
    let non_empty =
        |value: &String| (!value.is_empty()).then(|| value.clone());
    let portal = non_empty(&config.portal_host).map(|host| Portal {
        host,
        key: non_empty(&config.portal_key),
    });

    let source4 = config
        .source4
        .as_ref()
        .map(|source| {
            source
                .parse::<Ipv4Addr>()
                .map_err(|_| invalid_address("source4", source))
        })
        .transpose()?;
    let source6 = config
        .source6
        .as_ref()
        .map(|source| {
            source
                .parse::<Ipv6Addr>()
                .map_err(|_| invalid_address("source6", source))
        })
        .transpose()?;

    let augments = Augments::resolve(&config.augments)?;
    let optimizer = OptimizerSettings::resolve(&config.optimizer)?;
    let bfd = config
        .bfd
        .iter()
        .map(|(name, bfd)| {
            Ok::<_, Error>((name.clone(), BfdInstance::resolve(name, bfd)?))
        })
        .collect::<Result<BTreeMap<_, _>, Error>>()?;
    let vrrp = config
        .vrrp
        .iter()
        .map(|(name, vrrp)| {
            Ok::<_, Error>((name.clone(), VrrpInstance::resolve(name, vrrp)?))
        })
        .collect::<Result<BTreeMap<_, _>, Error>>()?;

    Ok(Global {
        asn: config.asn,
        router_id,
        hostname,
        prefixes,
        communities,
        rtr_server,
        irr: Irr {
            server: config.irr_server.clone(),
            query_timeout: Duration::from_secs(config.irr_query_timeout),
            bgpq_args: config.bgpq_args.clone(),
        },
        peeringdb_query_timeout: Duration::from_secs(
            config.peeringdb_query_timeout,
        ),
        bird: Bird {
            directory: config.bird_directory.clone(),
            binary: config.bird_binary.clone(),
            socket: config.bird_socket.clone(),
        },
        cache_directory: config.cache_directory.clone(),
        keepalived_config: config.keepalived_config.clone(),
        web_ui_file: non_empty(&config.web_ui_file),
        log_file: config.log_file.clone(),
        portal,
        rpki_enable: config.rpki_enable,
        keep_filtered: config.keep_filtered,
        kernel: Kernel {
            learn: config.kernel_learn,
            export: config.kernel_export,
            table: config.kernel_table,
        },
        merge_paths: config.merge_paths,
        source4,
        source6,
        default_route: config.default_route,
        accept_default: config.accept_default,
        augments,
        optimizer,
        bfd,
        vrrp,
        query_nvrs: false,
    })
}

// ===== unit tests =====
