//
// Copyright (c) The Routegen Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::VecDeque;

use crate::probe::ProbeResult;

// Bounded history of the probe results of a single target.
//
// Results are kept in insertion order. Once the capacity is reached, every
// insertion evicts the oldest result.
#[derive(Clone, Debug)]
pub struct MeasurementCache {
    capacity: usize,
    results: VecDeque<ProbeResult>,
}

// ===== impl MeasurementCache =====

impl MeasurementCache {
    pub fn new(capacity: usize) -> MeasurementCache {
        let capacity = capacity.max(1);
        MeasurementCache {
            capacity,
            results: VecDeque::with_capacity(capacity),
        }
    }

    // Appends a result, returning the evicted one if the cache was full.
    pub fn push(&mut self, result: ProbeResult) -> Option<ProbeResult> {
        let evicted = if self.is_full() {
            self.results.pop_front()
        } else {
            None
        };
        self.results.push_back(result);
        evicted
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.results.len() >= self.capacity
    }

    // Returns the newest result.
    pub fn latest(&self) -> Option<&ProbeResult> {
        self.results.back()
    }

    // Iterates over the results, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ProbeResult> {
        self.results.iter()
    }
}
