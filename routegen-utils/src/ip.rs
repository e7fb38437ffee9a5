//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::IpAddr;
use std::str::FromStr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

// Address Family identifier.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

// Container for storing separate values for IPv4 and IPv6.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct AddressFamilies<T> {
    pub ipv4: T,
    pub ipv6: T,
}

// Address or prefix that failed to parse.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvalidAddress(pub String);

// Extension methods for IpAddr.
pub trait IpAddrExt {
    // Returns the address family of this address.
    //
    // IPv4-mapped IPv6 addresses are representable in four bytes and thus
    // belong to the IPv4 family.
    fn address_family(&self) -> AddressFamily;
}

// ===== impl AddressFamily =====

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressFamily::Ipv4 => write!(f, "ipv4"),
            AddressFamily::Ipv6 => write!(f, "ipv6"),
        }
    }
}

// ===== impl AddressFamilies =====

impl<T> AddressFamilies<T> {
    // Returns a reference to the value corresponding to the given address
    // family.
    pub fn get(&self, af: AddressFamily) -> &T {
        match af {
            AddressFamily::Ipv4 => &self.ipv4,
            AddressFamily::Ipv6 => &self.ipv6,
        }
    }

    // Returns a mutable reference to the value corresponding to the given
    // address family.
    pub fn get_mut(&mut self, af: AddressFamily) -> &mut T {
        match af {
            AddressFamily::Ipv4 => &mut self.ipv4,
            AddressFamily::Ipv6 => &mut self.ipv6,
        }
    }
}

// ===== impl InvalidAddress =====

impl std::fmt::Display for InvalidAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid address or prefix: {}", self.0)
    }
}

impl std::error::Error for InvalidAddress {}

// ===== impl IpAddr =====

impl IpAddrExt for IpAddr {
    fn address_family(&self) -> AddressFamily {
        match self {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(addr) if addr.to_ipv4_mapped().is_some() => {
                AddressFamily::Ipv4
            }
            IpAddr::V6(_) => AddressFamily::Ipv6,
        }
    }
}

// ===== global functions =====

// Parses an address, with or without a prefix length, and returns its
// address part.
pub fn parse_address(value: &str) -> Result<IpAddr, InvalidAddress> {
    IpNetwork::from_str(value)
        .map(|network| network.ip())
        .map_err(|_| InvalidAddress(value.to_owned()))
}

// Splits the given items by the address family of the address each one
// carries.
//
// Input order is preserved within each family and duplicates are kept.
pub fn partition_by<T, F>(
    items: impl IntoIterator<Item = T>,
    address: F,
) -> Result<AddressFamilies<Vec<T>>, InvalidAddress>
where
    F: Fn(&T) -> &str,
{
    let mut families = AddressFamilies::<Vec<T>>::default();
    for item in items {
        let af = parse_address(address(&item))?.address_family();
        families.get_mut(af).push(item);
    }
    Ok(families)
}

// Splits a list of addresses and prefixes into IPv4 and IPv6 subsets.
pub fn partition<S>(
    values: &[S],
) -> Result<AddressFamilies<Vec<String>>, InvalidAddress>
where
    S: AsRef<str>,
{
    partition_by(values.iter().map(|value| value.as_ref().to_owned()), |v| {
        v.as_str()
    })
}

// ===== unit tests =====
