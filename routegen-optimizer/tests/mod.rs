//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

mod cache;
mod packet;
mod probe;
mod target;

use std::collections::{BTreeMap, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use routegen_optimizer::Optimizer;
use routegen_optimizer::alert::{Alert, AlertNotifier};
use routegen_optimizer::probe::{ProbeResult, Prober};
use routegen_optimizer::target::TargetKey;
use routegen_policy::Policy;
use routegen_utils::UnboundedReceiver;
use tokio::sync::mpsc;

//
// Test doubles.
//

// Scripted outcome of one probe.
#[derive(Clone, Copy, Debug)]
pub struct Outcome {
    received: u32,
    rtt: Duration,
}

// Prober replaying a script of outcomes per destination.
//
// The last outcome of a script repeats once the script is exhausted.
// Destinations without a script are unreachable.
#[derive(Debug, Default)]
pub struct ScriptedProber {
    scripts: Mutex<BTreeMap<IpAddr, VecDeque<Outcome>>>,
    delays: BTreeMap<IpAddr, Duration>,
    calls: AtomicUsize,
}

// Notifier recording every alert.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<Alert>>,
}

// ===== impl Outcome =====

pub fn answered(rtt_ms: u64) -> Outcome {
    Outcome {
        received: u32::MAX,
        rtt: Duration::from_millis(rtt_ms),
    }
}

pub fn unanswered() -> Outcome {
    Outcome {
        received: 0,
        rtt: Duration::ZERO,
    }
}

// ===== impl ScriptedProber =====

impl ScriptedProber {
    pub fn script(
        self,
        destination: &str,
        outcomes: impl IntoIterator<Item = Outcome>,
    ) -> ScriptedProber {
        self.scripts
            .lock()
            .unwrap()
            .insert(destination.parse().unwrap(), outcomes.into_iter().collect());
        self
    }

    pub fn delay(mut self, destination: &str, delay: Duration) -> ScriptedProber {
        self.delays.insert(destination.parse().unwrap(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(
        &self,
        target: &TargetKey,
        count: u32,
        _timeout: Duration,
    ) -> ProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&target.destination) {
            tokio::time::sleep(*delay).await;
        }

        let outcome = {
            let mut scripts = self.scripts.lock().unwrap();
            match scripts.get_mut(&target.destination) {
                Some(script) if script.len() > 1 => script.pop_front(),
                Some(script) => script.front().copied(),
                None => None,
            }
        };
        let outcome = outcome.unwrap_or_else(unanswered);
        let received = outcome.received.min(count) as usize;
        ProbeResult::from_samples(count, &vec![outcome.rtt; received])
    }
}

// ===== impl RecordingNotifier =====

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

impl AlertNotifier for RecordingNotifier {
    fn notify(&self, alert: &Alert) {
        self.alerts.lock().unwrap().push(alert.clone());
    }
}

//
// Helper functions.
//

// Loads a policy with a single optimizer-enabled peer probing from
// 192.0.2.10 and 2001:db8::10.
pub fn policy(optimizer: &str) -> Policy {
    routegen_policy::load(&format!(
        r#"
asn: 65530
router-id: 192.0.2.1
hostname: edge1
prefixes: ["192.0.2.0/24"]
optimizer:
{optimizer}
peers:
  upstream:
    asn: 64500
    local-pref: 100
    optimize-inbound: true
    neighbors: ["203.0.113.1"]
    probe-sources: ["192.0.2.10", "2001:db8::10"]
"#
    ))
    .unwrap()
}

pub fn optimizer(
    policy: &Policy,
    prober: Arc<ScriptedProber>,
) -> (Optimizer, Arc<RecordingNotifier>, UnboundedReceiver<Alert>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let optimizer =
        Optimizer::new(policy, prober, notifier.clone(), events_tx);
    (optimizer, notifier, events_rx)
}

pub fn key(source: &str, destination: &str) -> TargetKey {
    TargetKey::new(source.parse().unwrap(), destination.parse().unwrap())
}
