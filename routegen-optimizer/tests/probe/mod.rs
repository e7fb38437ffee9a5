//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::{Duration, Instant};

use routegen_optimizer::probe::{IcmpProber, ProbeResult, Prober};

use crate::key;

// Probes from a source address that isn't configured on any interface. The
// socket can't be bound (or, without privileges, created), so every attempt
// is lost and the probe returns right away.
async fn probe_unbindable(udp: bool, source: &str, destination: &str) {
    let prober = IcmpProber::new(udp);
    let count = 3;
    let timeout = Duration::from_secs(1);

    let start = Instant::now();
    let result = prober.probe(&key(source, destination), count, timeout).await;
    let elapsed = start.elapsed();

    let lost = ProbeResult::lost(count);
    assert_eq!(result.sent, lost.sent);
    assert_eq!(result.received, lost.received);
    assert_eq!(result.loss, 1.0);
    assert_eq!(result.rtt, None);
    assert!(!result.is_answered());
    assert!(elapsed <= timeout * count, "{elapsed:?}");
}

#[tokio::test]
async fn test_icmp_unbindable_source_raw() {
    probe_unbindable(false, "192.0.2.123", "198.51.100.1").await;
    probe_unbindable(false, "2001:db8::123", "2001:db8:1::1").await;
}

#[tokio::test]
async fn test_icmp_unbindable_source_udp() {
    probe_unbindable(true, "192.0.2.123", "198.51.100.1").await;
    probe_unbindable(true, "2001:db8::123", "2001:db8:1::1").await;
}
