//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::{debug, debug_span, trace};

// Policy resolution debug messages.
#[derive(Debug)]
pub enum Debug<'a> {
    SchemaChecked(usize),
    FieldInherited(&'a str, &'a str, &'static str),
    DefaultApplied(&'a str, &'static str, &'static str),
    AnnounceOriginatedDisabled(&'a str),
    PeerResolved(&'a str),
    GlobalResolved(usize, usize),
}

// ===== impl Debug =====

impl Debug<'_> {
    // Log debug message using the tracing API.
    pub(crate) fn log(&self) {
        match self {
            Debug::SchemaChecked(fields) => {
                trace!(%fields, "{}", self);
            }
            Debug::FieldInherited(peer, template, field) => {
                debug_span!("peer", name = %peer).in_scope(|| {
                    trace!(%template, %field, "{}", self);
                });
            }
            Debug::DefaultApplied(peer, field, value) => {
                debug_span!("peer", name = %peer).in_scope(|| {
                    trace!(%field, %value, "{}", self);
                });
            }
            Debug::AnnounceOriginatedDisabled(peer) => {
                debug_span!("peer", name = %peer).in_scope(|| {
                    debug!("{}", self);
                });
            }
            Debug::PeerResolved(peer) => {
                debug_span!("peer", name = %peer).in_scope(|| {
                    debug!("{}", self);
                });
            }
            Debug::GlobalResolved(prefixes4, prefixes6) => {
                debug!(%prefixes4, %prefixes6, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Debug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::SchemaChecked(..) => {
                write!(f, "peer schema checked")
            }
            Debug::FieldInherited(..) => {
                write!(f, "field inherited from template")
            }
            Debug::DefaultApplied(..) => {
                write!(f, "default value applied")
            }
            Debug::AnnounceOriginatedDisabled(..) => {
                write!(
                    f,
                    "no originated prefixes, disabling announce-originated"
                )
            }
            Debug::PeerResolved(..) => {
                write!(f, "peer resolved")
            }
            Debug::GlobalResolved(..) => {
                write!(f, "global policy resolved")
            }
        }
    }
}
