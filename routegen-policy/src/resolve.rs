//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::net::IpAddr;

use routegen_utils::community::CommunitySet;
use routegen_utils::ip;
use serde::Serialize;

use crate::config::Config;
use crate::debug::Debug;
use crate::error::{Error, Scope};
use crate::global::{self, Global};
use crate::peer::{
    self, PEER_FIELDS, Peer, PeerCommunities, PeerConfig, PeerOptions,
};
use crate::schema::{self, FieldDefault, FieldKind};

// Resolved policy tree.
//
// Read-only once built. Consumers that need updated optimizer state combine
// it with a preference snapshot at render time instead of mutating it.
#[derive(Clone, Debug, PartialEq)]
#[derive(Serialize)]
pub struct Policy {
    pub global: Global,
    pub peers: BTreeMap<String, Peer>,
}

// ===== impl Policy =====

impl Policy {
    // Returns the peers that take part in route optimization.
    pub fn optimized_peers(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values().filter(|peer| peer.is_optimized())
    }
}

// ===== global functions =====

// Parses and resolves a policy document.
pub fn load(document: &str) -> Result<Policy, Error> {
    let config = Config::from_yaml(document)?;
    resolve(config)
}

// Resolves a parsed policy document.
//
// Resolution is all-or-nothing: the first error aborts it and no partial
// policy is returned.
pub fn resolve(mut config: Config) -> Result<Policy, Error> {
    // Schema errors are programming errors, so check them before looking at
    // the document at all.
    schema::check(PEER_FIELDS)?;
    Debug::SchemaChecked(PEER_FIELDS.len()).log();

    // Templates can't inherit from other templates.
    for (name, template) in &config.templates {
        if let Some(reference) = template.template_name() {
            return Err(Error::TemplateChained {
                template: name.clone(),
                reference: reference.to_owned(),
            });
        }
    }

    let mut global = global::resolve(&config)?;
    let originates = !config.prefixes.is_empty();

    let templates = std::mem::take(&mut config.templates);
    let peers = std::mem::take(&mut config.peers)
        .into_iter()
        .map(|(name, peer)| {
            let peer = resolve_peer(&name, peer, &templates, originates)?;
            Ok::<_, Error>((name, peer))
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    global.query_nvrs = peers
        .values()
        .any(|peer| peer.options.filter_never_via_route_servers);
    Debug::GlobalResolved(global.prefixes.ipv4.len(), global.prefixes.ipv6.len())
        .log();

    Ok(Policy { global, peers })
}

// Resolves a single peer.
fn resolve_peer(
    name: &str,
    mut config: PeerConfig,
    templates: &BTreeMap<String, PeerConfig>,
    originates: bool,
) -> Result<Peer, Error> {
    let scope = || Scope::Peer(name.to_owned());

    // Inherit every unset field from the template, one level deep.
    let template = config.template_name().map(str::to_owned);
    if let Some(template_name) = &template {
        let template = templates.get(template_name).ok_or_else(|| {
            Error::TemplateNotFound {
                peer: name.to_owned(),
                template: template_name.clone(),
            }
        })?;
        for field in PEER_FIELDS {
            if !(field.is_set)(&config) && (field.is_set)(template) {
                (field.copy_from)(&mut config, template);
                Debug::FieldInherited(name, template_name, field.key).log();
            }
        }
    }

    // Remember which boolean options were configured before defaulting.
    let boolean_options = PEER_FIELDS
        .iter()
        .filter(|field| field.kind == FieldKind::Bool)
        .filter(|field| (field.is_set)(&config))
        .map(|field| field.key)
        .collect::<Vec<_>>();
    for field in PEER_FIELDS.iter().filter(|field| !(field.is_set)(&config)) {
        if let FieldDefault::Value(value) = field.default {
            Debug::DefaultApplied(name, field.key, value).log();
        }
    }
    let mut options = PeerOptions::from_config(config)?;

    // Classify community lists.
    let classify = |field, tokens: &Option<Vec<String>>| match tokens {
        Some(tokens) => global::classify(scope(), field, tokens),
        None => Ok(CommunitySet::default()),
    };
    let community_sets = PeerCommunities {
        import: classify("import-communities", &options.import_communities)?,
        export: classify("export-communities", &options.export_communities)?,
        announce: classify(
            "announce-communities",
            &options.announce_communities,
        )?,
        remove: classify("remove-communities", &options.remove_communities)?,
    };

    // Split accepted prefixes per address family.
    let prefix_set = ip::partition(options.prefixes.as_deref().unwrap_or(&[]))
        .map_err(|error| Error::InvalidAddress {
            scope: scope(),
            field: "prefixes",
            value: error.0,
        })?;

    // There's nothing to announce without originated prefixes.
    if !originates && options.announce_originated {
        options.announce_originated = false;
        Debug::AnnounceOriginatedDisabled(name).log();
    }

    // Validation.
    if options.asn == 0 {
        return Err(Error::MissingField {
            scope: scope(),
            field: "asn",
        });
    }
    let neighbor_addrs = match &options.neighbors {
        Some(neighbors) if !neighbors.is_empty() => {
            parse_addrs(scope(), "neighbors", neighbors)?
        }
        _ => {
            return Err(Error::MissingField {
                scope: scope(),
                field: "neighbors",
            });
        }
    };
    let probe_source_addrs = parse_addrs(
        scope(),
        "probe-sources",
        options.probe_sources.as_deref().unwrap_or(&[]),
    )?;

    Debug::PeerResolved(name).log();

    Ok(Peer {
        name: name.to_owned(),
        protocol_name: peer::sanitize(name),
        template,
        options,
        neighbor_addrs,
        probe_source_addrs,
        prefix_set,
        community_sets,
        boolean_options,
    })
}

// Parses a list of plain IP addresses.
fn parse_addrs(
    scope: Scope,
    field: &'static str,
    values: &[String],
) -> Result<Vec<IpAddr>, Error> {
    values
        .iter()
        .map(|value| {
            value.parse::<IpAddr>().map_err(|_| Error::InvalidAddress {
                scope: scope.clone(),
                field,
                value: value.clone(),
            })
        })
        .collect()
}
