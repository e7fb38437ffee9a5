//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::LazyLock as Lazy;

use regex::Regex;
use routegen_utils::community::CommunitySet;
use routegen_utils::ip::AddressFamilies;
use serde::{Deserialize, Serialize};

use crate::schema::peer_schema;

peer_schema! {
    defaulted {
        disabled: bool = ("disabled", "false", "Should the sessions be disabled?");
        asn: u32 = ("asn", "0", "Peer ASN (required)");
        prepends: u32 = ("prepends", "0", "Number of times to prepend local AS on export");
        local_pref: u32 = ("local-pref", "100", "BGP local preference");
        multihop: bool = ("multihop", "false", "Should BGP multihop be enabled? (255 max hops)");
        local_port: u16 = ("local-port", "179", "Local TCP port");
        neighbor_port: u16 = ("neighbor-port", "179", "Neighbor TCP port");
        passive: bool = ("passive", "false", "Should we listen passively?");
        direct: bool = ("direct", "false", "Is this a direct session?");
        next_hop_self: bool = ("next-hop-self", "false", "Should BGP next-hop-self be enabled?");
        bfd: bool = ("bfd", "false", "Should BFD be enabled?");
        rs_client: bool = ("rs-client", "false", "Should this peer be a route server client?");
        rr_client: bool = ("rr-client", "false", "Should this peer be a route reflector client?");
        remove_private_asns: bool = ("remove-private-asns", "true", "Should private ASNs be removed from path before exporting?");
        mp_unicast_46: bool = ("mp-unicast-46", "false", "Should this peer be configured with multiprotocol IPv4 and IPv6 unicast?");
        allow_local_as: bool = ("allow-local-as", "false", "Should routes originated by the local ASN be accepted?");
        add_path_tx: bool = ("add-path-tx", "false", "Enable BGP additional paths on export?");
        add_path_rx: bool = ("add-path-rx", "false", "Enable BGP additional paths on import?");
        confederation_member: bool = ("confederation-member", "false", "Should this peer be a member of the local confederation?");
        ttl_security: bool = ("ttl-security", "false", "RFC 5082 Generalized TTL Security Mechanism");
        import_limit4: u32 = ("import-limit4", "1000000", "Maximum number of IPv4 prefixes to import");
        import_limit6: u32 = ("import-limit6", "200000", "Maximum number of IPv6 prefixes to import");
        enforce_first_as: bool = ("enforce-first-as", "true", "Should we only accept routes whose first AS is the peer's ASN?");
        enforce_peer_nexthop: bool = ("enforce-peer-nexthop", "true", "Should we only accept routes with a next hop equal to the neighbor address?");
        force_peer_nexthop: bool = ("force-peer-nexthop", "false", "Rewrite nexthop to peer address");
        max_prefix_action: String = ("max-prefix-action", "disable", "What action should be taken when the max prefix limit is tripped?");
        allow_blackhole_community: bool = ("allow-blackhole-community", "false", "Should this peer be allowed to send routes with the blackhole community?");
        filter_irr: bool = ("filter-irr", "false", "Should IRR filtering be applied?");
        filter_rpki: bool = ("filter-rpki", "true", "Should RPKI invalids be rejected?");
        filter_max_prefix: bool = ("filter-max-prefix", "true", "Should max prefix filtering be applied?");
        filter_bogon_routes: bool = ("filter-bogon-routes", "true", "Should bogon prefixes be rejected?");
        filter_bogon_asns: bool = ("filter-bogon-asns", "true", "Should paths containing a bogon ASN be rejected?");
        filter_transit_asns: bool = ("filter-transit-asns", "false", "Should paths containing transit-free ASNs be rejected?");
        filter_prefix_length: bool = ("filter-prefix-length", "true", "Should too large/small prefixes be rejected?");
        filter_never_via_route_servers: bool = ("filter-never-via-route-servers", "false", "Should routes containing ASNs never reachable via route servers be filtered?");
        auto_import_limits: bool = ("auto-import-limits", "false", "Get import limits automatically from PeeringDB?");
        auto_as_set: bool = ("auto-as-set", "false", "Get as-set automatically from PeeringDB?");
        honor_graceful_shutdown: bool = ("honor-graceful-shutdown", "true", "Should RFC 8326 graceful shutdown be enabled?");
        announce_default: bool = ("announce-default", "false", "Should a default route be exported to this peer?");
        announce_originated: bool = ("announce-originated", "true", "Should locally originated routes be announced to this peer?");
        optimize_inbound: bool = ("optimize-inbound", "false", "Should the optimizer modify inbound policy?");
    }
    optional {
        description: String = ("description", "Peer description");
        neighbors: Vec<String> = ("neighbors", "List of neighbor IPs (required)");
        listen4: String = ("listen4", "IPv4 BGP listen address");
        listen6: String = ("listen6", "IPv6 BGP listen address");
        local_asn: u32 = ("local-asn", "Local ASN, if different from the global ASN");
        password: String = ("password", "BGP MD5 password");
        import_next_hop: String = ("import-next-hop", "Rewrite the BGP next hop before importing routes learned from this peer");
        export_next_hop: String = ("export-next-hop", "Rewrite the BGP next hop before announcing routes to this peer");
        confederation: u32 = ("confederation", "BGP confederation (RFC 5065)");
        import_communities: Vec<String> = ("import-communities", "List of communities to add to all imported routes");
        export_communities: Vec<String> = ("export-communities", "List of communities to add to all exported routes");
        announce_communities: Vec<String> = ("announce-communities", "Announce all routes matching these communities to the peer");
        remove_communities: Vec<String> = ("remove-communities", "List of communities to remove from routes announced by this peer");
        remove_all_communities: u32 = ("remove-all-communities", "Remove all standard and large communities beginning with this value");
        as_prefs: BTreeMap<u32, u32> = ("as-prefs", "Map of ASN to import local pref (not included in optimizer)");
        as_set: String = ("as-set", "Peer's as-set for filtering");
        prefixes: Vec<String> = ("prefixes", "Prefixes to accept");
        session_global: String = ("session-global", "Configuration to add to each session before any defined BGP protocols");
        pre_import: String = ("pre-import", "Configuration to add at the beginning of the import filter");
        pre_export: String = ("pre-export", "Configuration to add at the beginning of the export filter");
        pre_import_final: String = ("pre-import-final", "Configuration to add immediately before the final accept/reject on import");
        pre_export_final: String = ("pre-export-final", "Configuration to add immediately before the final accept/reject on export");
        probe_sources: Vec<String> = ("probe-sources", "Optimizer probe source addresses");
    }
}

// Fully resolved peer.
//
// Every field with a declared default holds a concrete value, community
// lists are classified and accepted prefixes are split per address family.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Peer {
    pub name: String,
    pub protocol_name: String,
    pub template: Option<String>,
    #[serde(flatten)]
    pub options: PeerOptions,
    pub neighbor_addrs: Vec<IpAddr>,
    pub probe_source_addrs: Vec<IpAddr>,
    pub prefix_set: AddressFamilies<Vec<String>>,
    pub community_sets: PeerCommunities,
    pub boolean_options: Vec<&'static str>,
}

// Classified community lists of a peer.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(Serialize)]
pub struct PeerCommunities {
    pub import: CommunitySet,
    pub export: CommunitySet,
    pub announce: CommunitySet,
    pub remove: CommunitySet,
}

// ===== impl PeerConfig =====

impl PeerConfig {
    // Returns the referenced template name, treating an empty name as no
    // reference.
    pub fn template_name(&self) -> Option<&str> {
        self.template.as_deref().filter(|name| !name.is_empty())
    }
}

// ===== impl Peer =====

impl Peer {
    // Returns whether the route optimizer measures this peer.
    pub fn is_optimized(&self) -> bool {
        !self.probe_source_addrs.is_empty()
    }

    // Returns the local preference after applying an optimizer delta.
    //
    // The delta only takes effect on peers with inbound optimization
    // enabled.
    pub fn effective_local_pref(&self, delta: i64) -> u32 {
        if !self.options.optimize_inbound {
            return self.options.local_pref;
        }
        let local_pref = i64::from(self.options.local_pref) + delta;
        local_pref.clamp(0, i64::from(u32::MAX)) as u32
    }
}

// ===== global functions =====

// Turns a configuration name into an identifier usable as a protocol name.
pub fn sanitize(name: &str) -> String {
    static NON_ALPHANUMERIC: Lazy<Regex> =
        Lazy::new(|| Regex::new("[^a-zA-Z0-9]+").unwrap());

    NON_ALPHANUMERIC.replace_all(name, "_").into_owned()
}

// ===== unit tests =====
