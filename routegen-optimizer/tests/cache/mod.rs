//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::Duration;

use routegen_optimizer::cache::MeasurementCache;
use routegen_optimizer::probe::ProbeResult;

fn result(rtt_ms: u64) -> ProbeResult {
    ProbeResult::from_samples(1, &[Duration::from_millis(rtt_ms)])
}

#[test]
fn test_cache_capacity() {
    let mut cache = MeasurementCache::new(3);
    assert!(cache.is_empty());

    for (i, rtt) in (1..=10).enumerate() {
        let evicted = cache.push(result(rtt));
        assert!(cache.len() <= cache.capacity());
        assert_eq!(evicted.is_some(), i >= 3);
    }
    assert!(cache.is_full());
    assert_eq!(cache.len(), 3);
}

#[test]
fn test_cache_fifo() {
    let mut cache = MeasurementCache::new(2);
    cache.push(result(1));
    cache.push(result(2));

    // The oldest result goes first.
    let evicted = cache.push(result(3)).unwrap();
    assert_eq!(evicted.rtt.unwrap().avg, Duration::from_millis(1));

    let rtts = cache
        .iter()
        .map(|result| result.rtt.unwrap().avg.as_millis())
        .collect::<Vec<_>>();
    assert_eq!(rtts, vec![2, 3]);
    assert_eq!(
        cache.latest().unwrap().rtt.unwrap().avg,
        Duration::from_millis(3)
    );
}

#[test]
fn test_probe_result() {
    let samples = [10, 20, 60].map(Duration::from_millis);
    let result = ProbeResult::from_samples(4, &samples);
    assert_eq!(result.sent, 4);
    assert_eq!(result.received, 3);
    assert_eq!(result.loss, 0.25);
    let rtt = result.rtt.unwrap();
    assert_eq!(rtt.min, Duration::from_millis(10));
    assert_eq!(rtt.avg, Duration::from_millis(30));
    assert_eq!(rtt.max, Duration::from_millis(60));

    let result = ProbeResult::lost(5);
    assert_eq!(result.received, 0);
    assert_eq!(result.loss, 1.0);
    assert_eq!(result.rtt, None);
    assert!(!result.is_answered());
}
