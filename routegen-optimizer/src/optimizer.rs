//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use routegen_policy::Policy;
use routegen_policy::global::OptimizerSettings;
use routegen_utils::{Receiver, UnboundedSender};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::alert::{Alert, AlertNotifier};
use crate::cache::MeasurementCache;
use crate::debug::Debug;
use crate::error::Error;
use crate::probe::{ProbeResult, Prober};
use crate::state::{
    Aggregate, Health, PreferenceSnapshot, PreferenceState, Preferences,
};
use crate::target::{TargetFeed, TargetKey};

// Control loop phase.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Idle,
    Probing,
    Deciding,
}

// Why the control loop stopped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExitReason {
    // An external stop signal was received.
    Cancelled,
    // A target's measurement cache was full and the optimizer is configured
    // to stop rather than evict.
    CacheFull { target: TargetKey },
}

// Route optimizer.
//
// Owns the measurement caches and the preference state of every
// optimizer-enabled peer. Readers only get to see published snapshots
// through [`Preferences`].
pub struct Optimizer {
    settings: OptimizerSettings,
    feed: TargetFeed,
    caches: BTreeMap<TargetKey, MeasurementCache>,
    states: PreferenceSnapshot,
    phase: Phase,
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn AlertNotifier>,
    events: UnboundedSender<Alert>,
    preferences: Preferences,
}

// ===== impl Optimizer =====

impl Optimizer {
    pub fn new(
        policy: &Policy,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn AlertNotifier>,
        events: UnboundedSender<Alert>,
    ) -> Optimizer {
        let mut optimizer = Optimizer {
            settings: policy.global.optimizer.clone(),
            feed: Default::default(),
            caches: Default::default(),
            states: Default::default(),
            phase: Phase::Idle,
            prober,
            notifier,
            events,
            preferences: Default::default(),
        };
        optimizer.set_policy(policy);
        optimizer
    }

    // Returns a handle to the published preference snapshots.
    pub fn preferences(&self) -> Preferences {
        self.preferences.clone()
    }

    pub fn feed(&self) -> &TargetFeed {
        &self.feed
    }

    pub fn cache(&self, target: &TargetKey) -> Option<&MeasurementCache> {
        self.caches.get(target)
    }

    // Refreshes the settings and target feed from a re-resolved policy.
    //
    // Histories of targets that are no longer probed are dropped, as are
    // all histories when the cache size changes. Peers keep their health.
    pub fn set_policy(&mut self, policy: &Policy) {
        let settings = policy.global.optimizer.clone();
        let feed = TargetFeed::new(policy);
        let resized = settings.cache_size != self.settings.cache_size;

        self.caches
            .retain(|target, _| !resized && feed.targets.contains_key(target));
        self.states.retain(|peer, _| feed.peers.contains_key(peer));
        let now = Utc::now();
        for peer in feed.peers.keys() {
            self.states
                .entry(peer.clone())
                .or_insert_with(|| PreferenceState::normal(now));
        }

        Debug::TargetsUpdated(feed.targets.len(), feed.peers.len()).log();
        self.settings = settings;
        self.feed = feed;
        self.preferences.publish(self.states.clone());
    }

    // Runs the control loop until it's cancelled or the cache-full safety
    // valve trips.
    //
    // The stop signal is honored while waiting for the next cycle and while
    // waiting for probes. In the latter case the current cycle completes
    // before the loop returns.
    pub async fn run(mut self, mut stop: Receiver<()>) -> ExitReason {
        let mut interval = tokio::time::interval(self.settings.probe_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stop.recv() => {
                    Debug::CancelObserved.log();
                    return ExitReason::Cancelled;
                }
                _ = interval.tick() => {}
            }

            let mut cancelled = false;
            if let Err(reason) = self.cycle(&mut stop, &mut cancelled).await {
                return reason;
            }
            if cancelled {
                return ExitReason::Cancelled;
            }
        }
    }

    // Runs a single probe and decision cycle.
    pub async fn run_cycle(&mut self) -> Result<(), ExitReason> {
        let (_stop_tx, mut stop_rx) = mpsc::channel(1);
        let mut cancelled = false;
        self.cycle(&mut stop_rx, &mut cancelled).await
    }

    async fn cycle(
        &mut self,
        stop: &mut Receiver<()>,
        cancelled: &mut bool,
    ) -> Result<(), ExitReason> {
        self.set_phase(Phase::Probing);
        let results = self.probe_all(stop, cancelled).await;

        self.set_phase(Phase::Deciding);
        let outcome = self.record(results);
        if outcome.is_ok() {
            self.decide();
        }

        self.set_phase(Phase::Idle);
        outcome
    }

    // Probes every target concurrently and waits for all of them.
    async fn probe_all(
        &mut self,
        stop: &mut Receiver<()>,
        cancelled: &mut bool,
    ) -> BTreeMap<TargetKey, ProbeResult> {
        let count = self.settings.probe_count;
        let timeout = self.settings.probe_timeout;

        let mut tasks = JoinSet::new();
        for target in self.feed.targets.keys().copied() {
            let prober = self.prober.clone();
            tasks.spawn(async move {
                let result = prober.probe(&target, count, timeout).await;
                (target, result)
            });
        }

        let mut results = BTreeMap::new();
        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok((target, result))) => {
                        results.insert(target, result);
                    }
                    Some(Err(error)) => Error::ProbeTaskFailed(error).log(),
                    None => break,
                },
                _ = stop.recv(), if !*cancelled => {
                    // In-flight probes are left to finish.
                    Debug::CancelObserved.log();
                    *cancelled = true;
                }
            }
        }

        // A probe that didn't report back still counts as a measurement.
        for target in self.feed.targets.keys() {
            results
                .entry(*target)
                .or_insert_with(|| ProbeResult::lost(count));
        }
        results
    }

    // Appends the cycle's results to the measurement caches.
    fn record(
        &mut self,
        results: BTreeMap<TargetKey, ProbeResult>,
    ) -> Result<(), ExitReason> {
        let capacity = self.settings.cache_size;
        for (target, result) in results {
            let cache = self
                .caches
                .entry(target)
                .or_insert_with(|| MeasurementCache::new(capacity));
            if cache.is_full() && self.settings.exit_on_cache_full {
                Debug::CacheFull(&target, capacity).log();
                return Err(ExitReason::CacheFull { target });
            }

            Debug::ProbeRecorded(&target, &result).log();
            cache.push(result);
        }

        Ok(())
    }

    // Reclassifies every optimizer-enabled peer and publishes the outcome.
    //
    // Transitions are announced only after the snapshot that contains them
    // is published.
    fn decide(&mut self) {
        let now = Utc::now();
        let settings = &self.settings;
        let mut alerts = vec![];

        for (peer, targets) in &self.feed.peers {
            let aggregate = Aggregate::compute(
                targets
                    .iter()
                    .filter_map(|target| self.caches.get(target))
                    .flat_map(|cache| cache.iter()),
            );
            Debug::PeerEvaluated(peer, &aggregate).log();

            let degraded = aggregate.loss > settings.packet_loss_threshold
                || aggregate
                    .latency
                    .is_some_and(|latency| latency > settings.latency_threshold);
            let (health, local_pref_delta) = if degraded {
                (Health::Depreferred, -i64::from(settings.modifier))
            } else {
                (Health::Normal, 0)
            };

            let previous = self
                .states
                .get(peer)
                .map(|state| state.health)
                .unwrap_or(Health::Normal);
            self.states.insert(
                peer.clone(),
                PreferenceState {
                    health,
                    local_pref_delta,
                    loss: aggregate.loss,
                    latency: aggregate.latency,
                    updated: now,
                },
            );

            if previous != health {
                Debug::PreferenceTransition(peer, previous, health).log();
                alerts.push(Alert {
                    peer: peer.clone(),
                    previous,
                    new: health,
                    timestamp: now,
                });
            }
        }

        self.preferences.publish(self.states.clone());

        for alert in alerts {
            self.notifier.notify(&alert);
            // Nobody may be listening, e.g. in one-shot runs.
            let _ = self.events.send(alert);
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            Debug::PhaseTransition(self.phase, phase).log();
            self.phase = phase;
        }
    }
}
