//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

//! BGP community tokens as written in the policy document.
//!
//! Standard communities (RFC 1997) are written as two comma-separated 16-bit
//! values, e.g. `65535,666`. Large communities (RFC 8092) are written as three
//! colon-separated 32-bit values, e.g. `65000:1:2`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

// Parsed community token.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum Community {
    Standard(u16, u16),
    Large(u32, u32, u32),
}

// Community form, as returned by [`classify`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CommunityKind {
    Standard,
    Large,
    Invalid,
}

// Community token that is neither a valid standard nor large community.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvalidCommunity(pub String);

// Community list split by form.
//
// Standard tokens are kept verbatim. Large tokens have their separators
// rewritten to commas, which is what route filters expect.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct CommunitySet {
    pub standard: Vec<String>,
    pub large: Vec<String>,
}

// ===== impl Community =====

impl Community {
    pub const STANDARD_SEPARATOR: char = ',';
    pub const LARGE_SEPARATOR: char = ':';

    pub fn kind(&self) -> CommunityKind {
        match self {
            Community::Standard(..) => CommunityKind::Standard,
            Community::Large(..) => CommunityKind::Large,
        }
    }
}

impl FromStr for Community {
    type Err = InvalidCommunity;

    fn from_str(token: &str) -> Result<Community, InvalidCommunity> {
        let invalid = || InvalidCommunity(token.to_owned());

        // A token with exactly two comma-separated parts can only be a
        // standard community.
        let parts = token.split(Self::STANDARD_SEPARATOR).collect::<Vec<_>>();
        if let [asn, value] = parts[..] {
            let asn = asn.parse::<u16>().map_err(|_| invalid())?;
            let value = value.parse::<u16>().map_err(|_| invalid())?;
            return Ok(Community::Standard(asn, value));
        }

        let parts = token.split(Self::LARGE_SEPARATOR).collect::<Vec<_>>();
        if let [global, local1, local2] = parts[..] {
            let global = global.parse::<u32>().map_err(|_| invalid())?;
            let local1 = local1.parse::<u32>().map_err(|_| invalid())?;
            let local2 = local2.parse::<u32>().map_err(|_| invalid())?;
            return Ok(Community::Large(global, local1, local2));
        }

        Err(invalid())
    }
}

impl std::fmt::Display for Community {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Community::Standard(asn, value) => write!(f, "{asn},{value}"),
            Community::Large(global, local1, local2) => {
                write!(f, "{global}:{local1}:{local2}")
            }
        }
    }
}

// ===== impl InvalidCommunity =====

impl std::fmt::Display for InvalidCommunity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid community: {}", self.0)
    }
}

impl std::error::Error for InvalidCommunity {}

// ===== impl CommunitySet =====

impl CommunitySet {
    // Classifies every token of the given list.
    //
    // Fails on the first invalid token.
    pub fn classify<S>(tokens: &[S]) -> Result<CommunitySet, InvalidCommunity>
    where
        S: AsRef<str>,
    {
        let mut set = CommunitySet::default();
        for token in tokens {
            let token = token.as_ref();
            match token.parse::<Community>()? {
                Community::Standard(..) => set.standard.push(token.to_owned()),
                Community::Large(..) => set.large.push(token.replace(
                    Community::LARGE_SEPARATOR,
                    &Community::STANDARD_SEPARATOR.to_string(),
                )),
            }
        }
        Ok(set)
    }

    // Appends the contents of another set to this one.
    pub fn extend(&mut self, other: CommunitySet) {
        self.standard.extend(other.standard);
        self.large.extend(other.large);
    }

    pub fn is_empty(&self) -> bool {
        self.standard.is_empty() && self.large.is_empty()
    }
}

// ===== global functions =====

// Classifies a community token as standard, large or invalid.
pub fn classify(token: &str) -> CommunityKind {
    token
        .parse::<Community>()
        .map(|community| community.kind())
        .unwrap_or(CommunityKind::Invalid)
}

// ===== unit tests =====
