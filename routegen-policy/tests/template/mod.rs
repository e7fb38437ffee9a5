//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use routegen_policy::Error;

use crate::{load, load_ok};

#[test]
fn test_template_default_local_pref() {
    let policy = load_ok(
        r#"
templates:
  default:
    local-pref: 100
peers:
  upstream:
    template: default
    asn: 64500
    neighbors: ["203.0.113.1"]
"#,
    );
    let peer = &policy.peers["upstream"];
    assert_eq!(peer.options.local_pref, 100);
    assert_eq!(peer.template.as_deref(), Some("default"));
}

#[test]
fn test_template_field_inherited() {
    let policy = load_ok(
        r#"
templates:
  transit:
    local-pref: 80
    passive: true
    import-limit4: 900000
peers:
  upstream:
    template: transit
    asn: 64500
    neighbors: ["203.0.113.1"]
"#,
    );
    let peer = &policy.peers["upstream"];
    assert_eq!(peer.options.local_pref, 80);
    assert!(peer.options.passive);
    assert_eq!(peer.options.import_limit4, 900000);
    // Fields set nowhere fall back to their defaults.
    assert_eq!(peer.options.import_limit6, 200000);
}

#[test]
fn test_template_explicit_value_wins() {
    let policy = load_ok(
        r#"
templates:
  transit:
    local-pref: 80
    passive: true
peers:
  upstream:
    template: transit
    asn: 64500
    local-pref: 300
    passive: false
    neighbors: ["203.0.113.1"]
"#,
    );
    let peer = &policy.peers["upstream"];
    assert_eq!(peer.options.local_pref, 300);
    assert!(!peer.options.passive);
}

#[test]
fn test_template_lists_not_merged() {
    let policy = load_ok(
        r#"
templates:
  transit:
    import-communities: ["65530,1"]
peers:
  upstream:
    template: transit
    asn: 64500
    import-communities: ["65530,2"]
    neighbors: ["203.0.113.1"]
"#,
    );
    let peer = &policy.peers["upstream"];
    assert_eq!(peer.community_sets.import.standard, vec!["65530,2"]);
}

#[test]
fn test_template_chained() {
    let error = load(
        r#"
templates:
  base:
    local-pref: 80
  transit:
    template: base
peers:
  upstream:
    template: missing
    asn: 64500
    neighbors: ["203.0.113.1"]
"#,
    )
    .unwrap_err();
    // Rejected before the peer referencing a missing template is looked at.
    assert!(matches!(
        error,
        Error::TemplateChained { ref template, ref reference }
            if template == "transit" && reference == "base"
    ));
}

#[test]
fn test_template_empty_reference() {
    let policy = load_ok(
        r#"
templates:
  transit:
    template: ""
    local-pref: 80
peers:
  upstream:
    template: transit
    asn: 64500
    neighbors: ["203.0.113.1"]
"#,
    );
    assert_eq!(policy.peers["upstream"].options.local_pref, 80);
}

#[test]
fn test_template_not_found() {
    let error = load(
        r#"
peers:
  upstream:
    template: transit
    asn: 64500
    neighbors: ["203.0.113.1"]
"#,
    )
    .unwrap_err();
    assert!(matches!(
        error,
        Error::TemplateNotFound { ref peer, ref template }
            if peer == "upstream" && template == "transit"
    ));
    assert_eq!(
        error.to_string(),
        "peer upstream: template transit not found"
    );
}

#[test]
fn test_template_boolean_options() {
    let policy = load_ok(
        r#"
templates:
  transit:
    passive: false
    filter-irr: true
peers:
  upstream:
    template: transit
    asn: 64500
    multihop: true
    neighbors: ["203.0.113.1"]
"#,
    );
    // Explicitly configured booleans, in schema order, regardless of value.
    assert_eq!(
        policy.peers["upstream"].boolean_options,
        vec!["multihop", "passive", "filter-irr"]
    );
}
