//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::probe::ProbeResult;

// Health classification of an optimizer-enabled peer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Normal,
    Depreferred,
}

// Current preference of an optimizer-enabled peer.
#[derive(Clone, Debug, PartialEq)]
#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PreferenceState {
    pub health: Health,
    // Local preference modifier: zero, or minus the configured modifier.
    pub local_pref_delta: i64,
    pub loss: f64,
    pub latency: Option<Duration>,
    pub updated: DateTime<Utc>,
}

// Preference state of every optimizer-enabled peer, keyed by peer name.
pub type PreferenceSnapshot = BTreeMap<String, PreferenceState>;

// Shared handle to the latest published preference snapshot.
//
// The optimizer replaces the whole snapshot at once, so readers never
// observe a partially updated decision step.
#[derive(Clone, Debug)]
pub struct Preferences(Arc<ArcSwap<PreferenceSnapshot>>);

// Aggregate health over a window of probe results.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aggregate {
    // Fraction of lost attempts across the window.
    pub loss: f64,
    // Mean of the average round-trip times of the answered probes.
    pub latency: Option<Duration>,
    pub samples: usize,
}

// ===== impl Health =====

impl std::fmt::Display for Health {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Health::Normal => write!(f, "normal"),
            Health::Depreferred => write!(f, "depreferred"),
        }
    }
}

// ===== impl PreferenceState =====

impl PreferenceState {
    pub fn normal(updated: DateTime<Utc>) -> PreferenceState {
        PreferenceState {
            health: Health::Normal,
            local_pref_delta: 0,
            loss: 0.0,
            latency: None,
            updated,
        }
    }
}

// ===== impl Preferences =====

impl Preferences {
    // Returns the latest snapshot.
    pub fn load(&self) -> Arc<PreferenceSnapshot> {
        self.0.load_full()
    }

    // Returns the local preference modifier of a peer, zero if unknown.
    pub fn delta(&self, peer: &str) -> i64 {
        self.0
            .load()
            .get(peer)
            .map(|state| state.local_pref_delta)
            .unwrap_or(0)
    }

    pub(crate) fn publish(&self, snapshot: PreferenceSnapshot) {
        self.0.store(Arc::new(snapshot));
    }
}

impl Default for Preferences {
    fn default() -> Preferences {
        Preferences(Arc::new(ArcSwap::from_pointee(Default::default())))
    }
}

// ===== impl Aggregate =====

impl Aggregate {
    pub fn compute<'a>(
        results: impl IntoIterator<Item = &'a ProbeResult>,
    ) -> Aggregate {
        let mut samples = 0;
        let mut sent = 0u64;
        let mut lost = 0u64;
        let mut latency_sum = Duration::ZERO;
        let mut answered = 0u32;

        for result in results {
            samples += 1;
            sent += u64::from(result.sent);
            lost += u64::from(result.sent.saturating_sub(result.received));
            if let Some(rtt) = &result.rtt {
                latency_sum += rtt.avg;
                answered += 1;
            }
        }

        Aggregate {
            loss: if sent == 0 {
                0.0
            } else {
                lost as f64 / sent as f64
            },
            latency: (answered > 0).then(|| latency_sum / answered),
            samples,
        }
    }
}
