//! Time-indexed schedules of state transitions.
//!
//! A [`TimeSchedule`] maps epoch-millisecond timestamps to the value that
//! takes effect at that instant. Entries are kept in ascending key order by
//! the underlying `BTreeMap`, which is what [`TimeSchedule::prune`] relies on.
//!
//! After `prune(now)` the schedule holds at most one entry strictly before
//! `now` (the value currently in effect) followed by every pending entry.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

/// Epoch milliseconds.
pub type Timestamp = u64;

/// Ordered mapping from timestamp to the state that becomes active then.
///
/// Serializes as a JSON object keyed by decimal timestamp strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeSchedule<V> {
    entries: BTreeMap<Timestamp, V>,
}

impl<V> Default for TimeSchedule<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> TimeSchedule<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `value` at `at`, returning whatever was scheduled there before.
    pub fn insert(&mut self, at: Timestamp, value: V) -> Option<V> {
        self.entries.insert(at, value)
    }

    pub fn get(&self, at: Timestamp) -> Option<&V> {
        self.entries.get(&at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending timestamp order.
    pub fn iter(&self) -> btree_map::Iter<'_, Timestamp, V> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = Timestamp> + '_ {
        self.entries.keys().copied()
    }

    /// The entry in effect at `now`: the latest one scheduled at or before it.
    pub fn current(&self, now: Timestamp) -> Option<(Timestamp, &V)> {
        self.entries
            .range(..=now)
            .next_back()
            .map(|(at, value)| (*at, value))
    }

    /// Entries scheduled strictly after `now`.
    pub fn pending(&self, now: Timestamp) -> impl Iterator<Item = (Timestamp, &V)> + '_ {
        self.entries
            .range(now.saturating_add(1)..)
            .map(|(at, value)| (*at, value))
    }

    /// Fold `incoming` into this schedule. Incoming entries overwrite entries
    /// at the same timestamp; entries only present here are preserved.
    pub fn merge(&mut self, incoming: TimeSchedule<V>) {
        self.entries.extend(incoming.entries);
    }

    /// Collapse every entry before `now` down to the most recent one.
    ///
    /// Entries at or after `now` are untouched. Returns true if anything was
    /// removed. Idempotent for a fixed `now`.
    pub fn prune(&mut self, now: Timestamp) -> bool {
        let pending = self.entries.split_off(&now);
        let latest_past = self.entries.pop_last();
        let changed = !self.entries.is_empty();

        self.entries = pending;
        if let Some((at, value)) = latest_past {
            self.entries.insert(at, value);
        }
        changed
    }
}

impl<V> FromIterator<(Timestamp, V)> for TimeSchedule<V> {
    fn from_iter<I: IntoIterator<Item = (Timestamp, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<V, const N: usize> From<[(Timestamp, V); N]> for TimeSchedule<V> {
    fn from(entries: [(Timestamp, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<'a, V> IntoIterator for &'a TimeSchedule<V> {
    type Item = (&'a Timestamp, &'a V);
    type IntoIter = btree_map::Iter<'a, Timestamp, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
