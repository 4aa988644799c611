// ── Tracked routing graph ──
//
// The reconciler's best-known view of the daemon's connections. Only
// reachable through the reconciler's mutex guard.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{Connection, ConnectionKey};

/// Additions and removals applied by a synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncDelta {
    pub added: Vec<ConnectionKey>,
    pub removed: Vec<ConnectionKey>,
}

impl SyncDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrackedGraph {
    entries: BTreeMap<ConnectionKey, Connection>,
}

impl TrackedGraph {
    /// Track a connection. Returns `false` (and keeps the existing entry
    /// and its timestamp) if the pair was already tracked.
    pub fn insert(&mut self, connection: Connection) -> bool {
        let key = connection.key();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, connection);
        true
    }

    pub fn remove(&mut self, key: &ConnectionKey) -> Option<Connection> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &ConnectionKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ConnectionKey> {
        self.entries.keys()
    }

    /// All tracked connections, ordered by key.
    pub fn connections(&self) -> Vec<Connection> {
        self.entries.values().cloned().collect()
    }

    /// Make the graph set-equal to `observed`. Pairs already tracked keep
    /// their original timestamp; new ones are stamped now.
    pub fn sync(&mut self, observed: impl IntoIterator<Item = ConnectionKey>) -> SyncDelta {
        let observed: BTreeSet<ConnectionKey> = observed.into_iter().collect();
        let mut delta = SyncDelta::default();

        self.entries.retain(|key, _| {
            let keep = observed.contains(key);
            if !keep {
                delta.removed.push(key.clone());
            }
            keep
        });

        for key in observed {
            if !self.entries.contains_key(&key) {
                delta.added.push(key.clone());
                self.entries.insert(key.clone(), Connection::from(key));
            }
        }

        delta
    }
}
