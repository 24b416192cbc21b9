//! Immutable id-keyed snapshots and generation diffing.
//!
//! A snapshot is one generation of "what exists right now". Checks never
//! mutate a published generation; they build a new map and replace the
//! whole value, so concurrent readers always see a consistent set.

use std::collections::HashMap;
use std::sync::Arc;

/// One immutable generation of an id → item mapping.
#[derive(Debug)]
pub struct Snapshot<T> {
    items: Arc<HashMap<String, T>>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Snapshot {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Snapshot {
            items: Arc::new(HashMap::new()),
        }
    }
}

impl<T> Snapshot<T> {
    pub fn new(items: HashMap<String, T>) -> Self {
        Snapshot {
            items: Arc::new(items),
        }
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Id-set difference between two snapshot generations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SnapshotDiff {
    /// Present in current, absent in previous.
    pub added: Vec<String>,
    /// Present in previous, absent in current.
    pub removed: Vec<String>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compute added/removed ids between generations. Output is sorted so
/// notification order is stable.
pub fn diff<T>(prev: &Snapshot<T>, curr: &Snapshot<T>) -> SnapshotDiff {
    let mut added: Vec<String> = curr
        .ids()
        .filter(|id| !prev.contains(id))
        .map(str::to_string)
        .collect();
    let mut removed: Vec<String> = prev
        .ids()
        .filter(|id| !curr.contains(id))
        .map(str::to_string)
        .collect();
    added.sort();
    removed.sort();
    SnapshotDiff { added, removed }
}
