//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use derive_new::new;
use routegen_policy::Policy;
use routegen_utils::ip::{AddressFamily, IpAddrExt};
use serde::{Deserialize, Serialize};

// Measured path: a probe source and the target it probes.
#[derive(Clone, Copy, Debug, Eq, Hash, new, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct TargetKey {
    pub source: IpAddr,
    pub destination: IpAddr,
}

// Probe target along with the peers whose decisions depend on it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProbeTarget {
    pub key: TargetKey,
    pub peers: BTreeSet<String>,
}

// Targets derived from a resolved policy.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TargetFeed {
    pub targets: BTreeMap<TargetKey, ProbeTarget>,
    // Targets referenced by each optimizer-enabled peer. Peers without any
    // target of a matching address family are listed with an empty set.
    pub peers: BTreeMap<String, BTreeSet<TargetKey>>,
}

// ===== impl TargetKey =====

impl TargetKey {
    pub fn address_family(&self) -> AddressFamily {
        self.destination.address_family()
    }
}

impl std::fmt::Display for TargetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

// ===== impl TargetFeed =====

impl TargetFeed {
    // Pairs the probe sources of every optimizer-enabled peer with the
    // global targets of the same address family.
    pub fn new(policy: &Policy) -> TargetFeed {
        let mut feed = TargetFeed::default();
        let targets = &policy.global.optimizer.targets;

        for peer in policy.optimized_peers() {
            let keys = feed.peers.entry(peer.name.clone()).or_default();
            for source in &peer.probe_source_addrs {
                let source = source.to_canonical();
                for destination in targets {
                    let destination = destination.to_canonical();
                    if source.address_family() != destination.address_family()
                    {
                        continue;
                    }

                    let key = TargetKey::new(source, destination);
                    keys.insert(key);
                    feed.targets
                        .entry(key)
                        .or_insert_with(|| ProbeTarget {
                            key,
                            peers: Default::default(),
                        })
                        .peers
                        .insert(peer.name.clone());
                }
            }
        }

        feed
    }
}
