//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::{debug, debug_span, info, trace, warn};

use crate::optimizer::Phase;
use crate::probe::ProbeResult;
use crate::state::{Aggregate, Health};
use crate::target::TargetKey;

// Route optimizer debug messages.
#[derive(Debug)]
pub enum Debug<'a> {
    TargetsUpdated(usize, usize),
    PhaseTransition(Phase, Phase),
    CancelObserved,
    ProbeRecorded(&'a TargetKey, &'a ProbeResult),
    PeerEvaluated(&'a str, &'a Aggregate),
    PreferenceTransition(&'a str, Health, Health),
    CacheFull(&'a TargetKey, usize),
    AlertDelivered(&'a str, &'a str),
}

// ===== impl Debug =====

impl Debug<'_> {
    // Log debug message using the tracing API.
    pub(crate) fn log(&self) {
        match self {
            Debug::TargetsUpdated(targets, peers) => {
                debug!(%targets, %peers, "{}", self);
            }
            Debug::PhaseTransition(old_phase, new_phase) => {
                trace!(?old_phase, ?new_phase, "{}", self);
            }
            Debug::CancelObserved => {
                debug!("{}", self);
            }
            Debug::ProbeRecorded(target, result) => {
                debug_span!("target", path = %target).in_scope(|| {
                    let rtt = result.rtt.map(|rtt| rtt.avg);
                    debug!(
                        sent = %result.sent,
                        received = %result.received,
                        loss = %result.loss,
                        ?rtt,
                        "{}",
                        self
                    );
                });
            }
            Debug::PeerEvaluated(peer, aggregate) => {
                debug_span!("peer", name = %peer).in_scope(|| {
                    trace!(
                        loss = %aggregate.loss,
                        latency = ?aggregate.latency,
                        samples = %aggregate.samples,
                        "{}",
                        self
                    );
                });
            }
            Debug::PreferenceTransition(peer, old_health, new_health) => {
                debug_span!("peer", name = %peer).in_scope(|| {
                    info!(%old_health, %new_health, "{}", self);
                });
            }
            Debug::CacheFull(target, capacity) => {
                warn!(path = %target, %capacity, "{}", self);
            }
            Debug::AlertDelivered(peer, script) => {
                debug!(%peer, %script, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Debug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::TargetsUpdated(..) => {
                write!(f, "probe targets updated")
            }
            Debug::PhaseTransition(..) => {
                write!(f, "phase transition")
            }
            Debug::CancelObserved => {
                write!(f, "stop requested, finishing current cycle")
            }
            Debug::ProbeRecorded(..) => {
                write!(f, "probe result recorded")
            }
            Debug::PeerEvaluated(..) => {
                write!(f, "peer health evaluated")
            }
            Debug::PreferenceTransition(..) => {
                write!(f, "preference transition")
            }
            Debug::CacheFull(..) => {
                write!(f, "measurement cache full, stopping optimizer")
            }
            Debug::AlertDelivered(..) => {
                write!(f, "alert delivered")
            }
        }
    }
}
