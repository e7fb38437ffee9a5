//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::IpAddr;

use routegen_policy::Error;
use routegen_policy::error::Scope;

use crate::{load, load_ok};

#[test]
fn test_peer_defaults() {
    let policy = load_ok(
        r#"
peers:
  upstream:
    asn: 64500
    neighbors: ["203.0.113.1", "2001:db8:1::1"]
"#,
    );
    let peer = &policy.peers["upstream"];
    assert_eq!(peer.options.local_pref, 100);
    assert_eq!(peer.options.local_port, 179);
    assert_eq!(peer.options.neighbor_port, 179);
    assert_eq!(peer.options.max_prefix_action, "disable");
    assert!(peer.options.filter_rpki);
    assert!(peer.options.remove_private_asns);
    assert!(peer.options.announce_originated);
    assert!(!peer.options.disabled);
    assert_eq!(peer.options.description, None);
    assert!(peer.boolean_options.is_empty());
    assert_eq!(
        peer.neighbor_addrs,
        vec![
            "203.0.113.1".parse::<IpAddr>().unwrap(),
            "2001:db8:1::1".parse::<IpAddr>().unwrap()
        ]
    );
}

#[test]
fn test_peer_protocol_name() {
    let policy = load_ok(
        r#"
peers:
  "Example ISP v4":
    asn: 64500
    neighbors: ["203.0.113.1"]
"#,
    );
    assert_eq!(
        policy.peers["Example ISP v4"].protocol_name,
        "Example_ISP_v4"
    );
}

#[test]
fn test_peer_communities() {
    let policy = load_ok(
        r#"
peers:
  upstream:
    asn: 64500
    neighbors: ["203.0.113.1"]
    import-communities: ["100,200", "100:200:300"]
    remove-communities: ["65535,666"]
"#,
    );
    let communities = &policy.peers["upstream"].community_sets;
    assert_eq!(communities.import.standard, vec!["100,200"]);
    assert_eq!(communities.import.large, vec!["100,200,300"]);
    assert_eq!(communities.remove.standard, vec!["65535,666"]);
    assert!(communities.export.is_empty());
    assert!(communities.announce.is_empty());
}

#[test]
fn test_peer_invalid_community() {
    let error = load(
        r#"
peers:
  upstream:
    asn: 64500
    neighbors: ["203.0.113.1"]
    export-communities: ["65530,70000"]
"#,
    )
    .unwrap_err();
    assert!(matches!(
        error,
        Error::InvalidCommunity { ref token, field: "export-communities", .. }
            if token == "65530,70000"
    ));
    assert_eq!(error.scope(), Some(&Scope::Peer("upstream".to_owned())));
}

#[test]
fn test_peer_prefix_set() {
    let policy = load_ok(
        r#"
peers:
  customer:
    asn: 64501
    neighbors: ["203.0.113.9"]
    prefixes:
      - "198.51.100.0/24"
      - "2001:db8:100::/48"
      - "::ffff:198.51.101.0/120"
"#,
    );
    let prefix_set = &policy.peers["customer"].prefix_set;
    assert_eq!(
        prefix_set.ipv4,
        vec!["198.51.100.0/24", "::ffff:198.51.101.0/120"]
    );
    assert_eq!(prefix_set.ipv6, vec!["2001:db8:100::/48"]);
}

#[test]
fn test_peer_invalid_prefix() {
    let error = load(
        r#"
peers:
  customer:
    asn: 64501
    neighbors: ["203.0.113.9"]
    prefixes: ["198.51.100.0/33"]
"#,
    )
    .unwrap_err();
    assert!(matches!(
        error,
        Error::InvalidAddress { field: "prefixes", ref value, .. }
            if value == "198.51.100.0/33"
    ));
}

#[test]
fn test_peer_announce_originated_without_prefixes() {
    let policy = routegen_policy::load(
        r#"
asn: 65530
router-id: 192.0.2.1
hostname: edge1
peers:
  upstream:
    asn: 64500
    announce-originated: true
    neighbors: ["203.0.113.1"]
"#,
    )
    .unwrap();
    let peer = &policy.peers["upstream"];
    assert!(!peer.options.announce_originated);
    // Still reported as explicitly configured.
    assert_eq!(peer.boolean_options, vec!["announce-originated"]);
}

#[test]
fn test_peer_announce_originated_with_prefixes() {
    let policy = load_ok(
        r#"
peers:
  upstream:
    asn: 64500
    announce-originated: true
    neighbors: ["203.0.113.1"]
"#,
    );
    assert!(policy.peers["upstream"].options.announce_originated);
}

#[test]
fn test_peer_missing_asn() {
    let error = load(
        r#"
peers:
  upstream:
    neighbors: ["203.0.113.1"]
"#,
    )
    .unwrap_err();
    assert!(matches!(error, Error::MissingField { field: "asn", .. }));
    assert_eq!(
        error.to_string(),
        "peer upstream: missing required field asn"
    );
}

#[test]
fn test_peer_missing_neighbors() {
    for neighbors in ["", "    neighbors: []\n"] {
        let error = load(&format!(
            "peers:\n  upstream:\n    asn: 64500\n{neighbors}"
        ))
        .unwrap_err();
        assert!(matches!(error, Error::MissingField { field: "neighbors", .. }));
    }
}

#[test]
fn test_peer_invalid_neighbor() {
    let error = load(
        r#"
peers:
  upstream:
    asn: 64500
    neighbors: ["203.0.113.300"]
"#,
    )
    .unwrap_err();
    assert!(matches!(
        error,
        Error::InvalidAddress { field: "neighbors", ref value, .. }
            if value == "203.0.113.300"
    ));
}

#[test]
fn test_peer_unknown_key() {
    let error = load(
        r#"
peers:
  upstream:
    asn: 64500
    local-preference: 200
    neighbors: ["203.0.113.1"]
"#,
    )
    .unwrap_err();
    assert!(matches!(error, Error::Parse(_)));
}

#[test]
fn test_peer_wrong_kind() {
    let error = load(
        r#"
peers:
  upstream:
    asn: 64500
    local-pref: high
    neighbors: ["203.0.113.1"]
"#,
    )
    .unwrap_err();
    assert!(matches!(error, Error::Parse(_)));
}

#[test]
fn test_peer_all_or_nothing() {
    let error = load(
        r#"
peers:
  a-good:
    asn: 64500
    neighbors: ["203.0.113.1"]
  b-bad:
    asn: 64501
  c-good:
    asn: 64502
    neighbors: ["203.0.113.3"]
"#,
    )
    .unwrap_err();
    assert_eq!(error.scope(), Some(&Scope::Peer("b-bad".to_owned())));
}

#[test]
fn test_peer_optimizer_participation() {
    let policy = load_ok(
        r#"
peers:
  upstream:
    asn: 64500
    local-pref: 150
    optimize-inbound: true
    neighbors: ["203.0.113.1"]
    probe-sources: ["192.0.2.10", "2001:db8::10"]
  passive-observer:
    asn: 64501
    neighbors: ["203.0.113.2"]
    probe-sources: ["192.0.2.11"]
  plain:
    asn: 64502
    neighbors: ["203.0.113.3"]
"#,
    );
    let optimized = policy
        .optimized_peers()
        .map(|peer| peer.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(optimized, vec!["passive-observer", "upstream"]);

    let upstream = &policy.peers["upstream"];
    assert_eq!(upstream.probe_source_addrs.len(), 2);
    assert_eq!(upstream.effective_local_pref(0), 150);
    assert_eq!(upstream.effective_local_pref(-20), 130);
    assert_eq!(upstream.effective_local_pref(-200), 0);

    // Measured, but the delta doesn't apply without inbound optimization.
    let observer = &policy.peers["passive-observer"];
    assert_eq!(observer.effective_local_pref(-20), 100);
}

#[test]
fn test_peer_as_prefs() {
    let policy = load_ok(
        r#"
peers:
  upstream:
    asn: 64500
    neighbors: ["203.0.113.1"]
    as-prefs:
      64496: 120
      64497: 90
"#,
    );
    let as_prefs = policy.peers["upstream"].options.as_prefs.as_ref().unwrap();
    assert_eq!(as_prefs.get(&64496), Some(&120));
    assert_eq!(as_prefs.get(&64497), Some(&90));
}
