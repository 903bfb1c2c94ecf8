//! Transition keys, counts and timing statistics.

use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// One directed edge in one stage-transition layer.
///
/// Ordering is (stage, source, target), which fixes iteration order for
/// every map keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransitionKey {
    /// Index of the earlier stage; the edge runs from `stage` to `stage + 1`.
    pub stage: usize,
    pub source: String,
    pub target: String,
}

impl TransitionKey {
    pub fn new(stage: usize, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            stage,
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Number of patients making each transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionCount {
    counts: BTreeMap<TransitionKey, u64>,
}

impl TransitionCount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `n` more patients on `key`.
    pub fn add(&mut self, key: TransitionKey, n: u64) {
        *self.counts.entry(key).or_insert(0) += n;
    }

    pub fn increment(&mut self, key: TransitionKey) {
        self.add(key, 1);
    }

    /// Count for a single transition, zero if never observed.
    pub fn get(&self, stage: usize, source: &str, target: &str) -> u64 {
        self.counts
            .get(&TransitionKey::new(stage, source, target))
            .copied()
            .unwrap_or(0)
    }

    /// Fold another partial count into this one by key-wise summation.
    pub fn merge(&mut self, other: TransitionCount) {
        for (key, n) in other.counts {
            self.add(key, n);
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, TransitionKey, u64> {
        self.counts.iter()
    }

    /// Stage indices that have at least one transition, ascending.
    pub fn stages(&self) -> Vec<usize> {
        self.counts
            .keys()
            .map(|k| k.stage)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sum of all counts leaving `stage`.
    pub fn total_at_stage(&self, stage: usize) -> u64 {
        self.counts
            .iter()
            .filter(|(k, _)| k.stage == stage)
            .map(|(_, n)| n)
            .sum()
    }

    /// Sum of counts leaving `label` at `stage`; equals the number of
    /// patients holding `label` at that stage.
    pub fn outgoing(&self, stage: usize, label: &str) -> u64 {
        self.counts
            .iter()
            .filter(|(k, _)| k.stage == stage && k.source == label)
            .map(|(_, n)| n)
            .sum()
    }

    /// Flatten to `(stage, source, target, count)` tuples in key order.
    pub fn to_tuples(&self) -> Vec<(usize, String, String, u64)> {
        self.counts
            .iter()
            .map(|(k, n)| (k.stage, k.source.clone(), k.target.clone(), *n))
            .collect()
    }
}

impl<'a> IntoIterator for &'a TransitionCount {
    type Item = (&'a TransitionKey, &'a u64);
    type IntoIter = btree_map::Iter<'a, TransitionKey, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.iter()
    }
}

impl FromIterator<(TransitionKey, u64)> for TransitionCount {
    fn from_iter<T: IntoIterator<Item = (TransitionKey, u64)>>(iter: T) -> Self {
        let mut counts = TransitionCount::new();
        for (key, n) in iter {
            counts.add(key, n);
        }
        counts
    }
}

/// Elapsed-time statistics for one transition, in whole days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingStats {
    /// Number of timed transitions observed.
    pub samples: u64,
    pub total_days: i64,
}

impl TimingStats {
    pub fn record(&mut self, days: i64) {
        self.samples += 1;
        self.total_days += days;
    }

    pub fn merge(&mut self, other: TimingStats) {
        self.samples += other.samples;
        self.total_days += other.total_days;
    }

    pub fn average_days(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.total_days as f64 / self.samples as f64
        }
    }
}

/// Time spent between consecutive observations, per transition.
///
/// Only transitions where both observations carry a timestamp are recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionTiming {
    stats: BTreeMap<TransitionKey, TimingStats>,
}

impl TransitionTiming {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: TransitionKey, days: i64) {
        self.stats.entry(key).or_default().record(days);
    }

    pub fn get(&self, key: &TransitionKey) -> Option<&TimingStats> {
        self.stats.get(key)
    }

    pub fn merge(&mut self, other: TransitionTiming) {
        for (key, stats) in other.stats {
            self.stats.entry(key).or_default().merge(stats);
        }
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, TransitionKey, TimingStats> {
        self.stats.iter()
    }
}
