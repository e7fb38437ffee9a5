//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

mod peer;
mod template;

use routegen_policy::{Error, Policy};

//
// Helper functions.
//

// Global section shared by most test documents.
const GLOBAL: &str = r#"
asn: 65530
router-id: 192.0.2.1
hostname: edge1
prefixes:
  - "192.0.2.0/24"
  - "2001:db8::/48"
"#;

fn load(sections: &str) -> Result<Policy, Error> {
    routegen_policy::load(&format!("{GLOBAL}{sections}"))
}

fn load_ok(sections: &str) -> Policy {
    load(sections).unwrap()
}
