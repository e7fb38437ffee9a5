//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeSet;

use routegen_optimizer::target::TargetFeed;

use crate::key;

const POLICY: &str = r#"
asn: 65530
router-id: 192.0.2.1
hostname: edge1
optimizer:
  targets: ["198.51.100.1", "2001:db8:ffff::1"]
peers:
  dual-stack:
    asn: 64500
    neighbors: ["203.0.113.1"]
    probe-sources: ["192.0.2.10", "2001:db8::10"]
  mapped:
    asn: 64501
    neighbors: ["203.0.113.2"]
    probe-sources: ["::ffff:192.0.2.10"]
  v6-only:
    asn: 64502
    neighbors: ["2001:db8:1::2"]
    probe-sources: ["2001:db8::20"]
  unmeasured:
    asn: 64503
    neighbors: ["203.0.113.3"]
"#;

#[test]
fn test_target_feed() {
    let policy = routegen_policy::load(POLICY).unwrap();
    let feed = TargetFeed::new(&policy);

    // One target per (source, destination) pair of the same family.
    let targets = feed.targets.keys().copied().collect::<Vec<_>>();
    assert_eq!(
        targets,
        vec![
            key("192.0.2.10", "198.51.100.1"),
            key("2001:db8::10", "2001:db8:ffff::1"),
            key("2001:db8::20", "2001:db8:ffff::1"),
        ]
    );

    // Identical pairs across peers are shared.
    let shared = &feed.targets[&key("192.0.2.10", "198.51.100.1")];
    assert_eq!(
        shared.peers,
        BTreeSet::from(["dual-stack".to_owned(), "mapped".to_owned()])
    );

    assert_eq!(feed.peers["dual-stack"].len(), 2);
    assert_eq!(feed.peers["mapped"].len(), 1);
    assert_eq!(feed.peers["v6-only"].len(), 1);
    assert!(!feed.peers.contains_key("unmeasured"));
}

#[test]
fn test_target_feed_unmatched_family() {
    let policy = routegen_policy::load(
        r#"
asn: 65530
router-id: 192.0.2.1
hostname: edge1
optimizer:
  targets: ["198.51.100.1"]
peers:
  v6-only:
    asn: 64502
    neighbors: ["2001:db8:1::2"]
    probe-sources: ["2001:db8::20"]
"#,
    )
    .unwrap();
    let feed = TargetFeed::new(&policy);

    // Still tracked, but without anything to measure.
    assert!(feed.targets.is_empty());
    assert!(feed.peers["v6-only"].is_empty());
}
