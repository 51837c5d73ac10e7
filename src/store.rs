use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;

/// Shared category --> count tally. Clones share the same underlying map.
///
/// Counts only ever grow. Categories keep the position in which they were first seen,
/// which is the order snapshots (and therefore charts) list them in.
#[derive(Clone, Default)]
pub struct AggregateStore {
    counts: Arc<RwLock<IndexMap<String, u64>>>,
}

impl AggregateStore {
    pub fn new() -> AggregateStore { AggregateStore::default() }

    /// Count one more message for `label`, returning the new count.
    pub fn increment(&self, label: &str) -> u64 {
        // a writer that panicked cannot have left a half-applied increment behind
        let mut counts = self.counts.write().unwrap_or_else(PoisonError::into_inner);
        match counts.get_mut(label) {
            Some(count) => {
                *count += 1;
                *count
            }
            None => {
                counts.insert(label.to_string(), 1);
                1
            }
        }
    }

    /// Point-in-time copy of every (label, count) pair, in first-seen order.
    pub fn snapshot(&self) -> Snapshot {
        let counts = self.counts.read().unwrap_or_else(PoisonError::into_inner);
        Snapshot {
            entries: counts.iter().map(|(label, &count)| (label.clone(), count)).collect(),
        }
    }
}

/// Immutable view of the store taken under a single lock acquisition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<(String, u64)>,
}

impl Snapshot {
    pub fn get(&self, label: &str) -> Option<u64> {
        self.entries.iter().find(|(l, _)| l == label).map(|&(_, count)| count)
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Number of messages counted across all categories.
    pub fn total(&self) -> u64 { self.entries.iter().map(|&(_, count)| count).sum() }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(label, count)| (label.as_str(), *count))
    }

    pub fn into_entries(self) -> Vec<(String, u64)> { self.entries }
}
